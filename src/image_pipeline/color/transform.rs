//! Per-pixel application of the calibrated correction matrix.

use rayon::prelude::*;
use tracing::instrument;

use crate::image_pipeline::color::calibration::CorrectionMatrix;
use crate::image_pipeline::debayer::types::{RGB_CHANNELS, RgbImage};

const MAX_VALUE: f32 = u16::MAX as f32;

/// Applies a 3x3 matrix to every pixel, rounding half up and clamping to 16 bits.
#[derive(Debug, Clone, Copy)]
pub struct PixelTransformer {
    rows: [[f32; 3]; 3],
    gamma: f32,
}

impl PixelTransformer {
    pub fn new(matrix: &CorrectionMatrix) -> Self {
        Self {
            rows: matrix.rows,
            gamma: 1.0,
        }
    }

    /// Gamma applied to the corrected linear values before rounding.
    /// Values above 1 lift shadows and compress highlights.
    pub fn with_gamma(mut self, gamma: f32) -> Self {
        self.gamma = gamma;
        self
    }

    #[instrument(skip_all, fields(width = image.width, height = image.height))]
    pub fn apply(&self, image: &RgbImage) -> RgbImage {
        let data = image
            .data
            .par_chunks(image.row_len().max(RGB_CHANNELS))
            .flat_map_iter(|row| {
                row.chunks_exact(RGB_CHANNELS)
                    .flat_map(|p| self.transform_pixel([p[0], p[1], p[2]]))
            })
            .collect();
        RgbImage {
            width: image.width,
            height: image.height,
            data,
        }
    }

    #[inline]
    pub fn transform_pixel(&self, [r, g, b]: [u16; 3]) -> [u16; 3] {
        let (r, g, b) = (r as f32, g as f32, b as f32);
        self.rows.map(|c| {
            let v = r * c[0] + g * c[1] + b * c[2];
            if self.gamma == 1.0 {
                (v + 0.5).clamp(0.0, MAX_VALUE) as u16
            } else {
                let v = v.clamp(0.0, MAX_VALUE);
                let v = MAX_VALUE * (v / MAX_VALUE).powf(1.0 / self.gamma);
                (v + 0.5).clamp(0.0, MAX_VALUE) as u16
            }
        })
    }
}
