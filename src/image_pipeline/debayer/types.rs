//! Full-color image type shared by the merge, transform and output stages

use crate::image_pipeline::common::error::{ProcessError, Result};

/// Number of color channels of every processed image.
pub const RGB_CHANNELS: usize = 3;

/// RGB image data after demosaicing or pixel-shift merging
#[derive(Debug, Clone, PartialEq)]
pub struct RgbImage {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// RGB pixel data interleaved [R, G, B, R, G, B, ...]
    pub data: Vec<u16>,
}

impl RgbImage {
    pub fn new(width: usize, height: usize, data: Vec<u16>) -> Result<Self> {
        if data.len() != width * height * RGB_CHANNELS {
            return Err(ProcessError::InvalidDimensions(width, height));
        }
        Ok(Self { width, height, data })
    }

    pub fn zeroed(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * RGB_CHANNELS],
        }
    }

    pub fn row_len(&self) -> usize {
        self.width * RGB_CHANNELS
    }

    pub fn pixel(&self, row: usize, col: usize) -> [u16; 3] {
        let i = (row * self.width + col) * RGB_CHANNELS;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Copy of the rectangle `width` x `height` starting at `top`, `left`.
    pub fn crop(&self, top: usize, left: usize, width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 || top + height > self.height || left + width > self.width {
            return Err(ProcessError::InvalidDimensions(width, height));
        }
        let mut data = Vec::with_capacity(width * height * RGB_CHANNELS);
        for row in top..top + height {
            let start = (row * self.width + left) * RGB_CHANNELS;
            data.extend_from_slice(&self.data[start..start + width * RGB_CHANNELS]);
        }
        Ok(Self { width, height, data })
    }
}
