use std::io::Cursor;

use bayer::{BayerDepth, Demosaic, RasterDepth, RasterMut};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::image_pipeline::common::error::{ProcessError, Result};
use crate::image_pipeline::debayer::types::{RGB_CHANNELS, RgbImage};
use crate::image_pipeline::raw::cfa::{CfaPattern, Channel};
use crate::image_pipeline::raw::types::{DebayerQuality, FrameSamples, SensorFrame};

/// Demosaics single captures on the CPU.
pub struct CpuDebayer {
    quality: DebayerQuality,
}

impl CpuDebayer {
    pub fn new(quality: DebayerQuality) -> Self {
        Self { quality }
    }

    /// Scales the mosaic to the full 16-bit range and converts it to RGB.
    ///
    /// With `half_size` every 2x2 cell becomes one pixel and no interpolation
    /// takes place.
    pub fn process(&self, frame: &SensorFrame, half_size: bool) -> Result<RgbImage> {
        let FrameSamples::Mosaic(samples) = &frame.samples else {
            return Err(ProcessError::DecodeError("capture is already demosaiced".to_string()));
        };
        let width = frame.width;
        let height = frame.height;
        info!(
            "Starting CPU debayering for image {}x{} ({}, half size: {})",
            width, height, frame.cfa, half_size
        );

        let scaled = scale_to_full_range(samples, frame.white_level);

        if half_size {
            return half_size_bin(&scaled, width, height, frame.cfa);
        }

        let Some(cfa) = frame.cfa.to_demosaic_cfa() else {
            // Monochrome: every channel carries the same sample.
            let data = scaled.iter().flat_map(|&v| [v, v, v]).collect();
            return RgbImage::new(width, height, data);
        };

        let algorithm = match self.quality {
            DebayerQuality::Nearest => Demosaic::NearestNeighbour,
            DebayerQuality::Linear => Demosaic::Linear,
            DebayerQuality::Cubic => Demosaic::Cubic,
        };

        let bayer_bytes: Vec<u8> = scaled.iter().flat_map(|&val| val.to_le_bytes()).collect();
        let output_buf_size = width * height * RGB_CHANNELS * 2;
        let mut output_buf = vec![0u8; output_buf_size];
        let mut cursor = Cursor::new(&bayer_bytes[..]);

        debug!(
            "Running demosaic with algo={:?}, input bytes: {}, output buffer: {}",
            self.quality,
            bayer_bytes.len(),
            output_buf_size
        );

        {
            let mut output_raster = RasterMut::new(width, height, RasterDepth::Depth16, &mut output_buf);
            bayer::run_demosaic(&mut cursor, BayerDepth::Depth16LE, cfa, algorithm, &mut output_raster)
                .map_err(|e| ProcessError::DecodeError(format!("Demosaic failed: {:?}", e)))?;
        }

        // The raster holds u16 samples in native byte order.
        let data = output_buf
            .chunks_exact(2)
            .map(|b| u16::from_ne_bytes([b[0], b[1]]))
            .collect();
        RgbImage::new(width, height, data)
    }
}

/// Stretches `[0, white_level]` onto `[0, 65535]`.
fn scale_to_full_range(samples: &[u16], white_level: u16) -> Vec<u16> {
    if white_level == 0 || white_level == u16::MAX {
        return samples.to_vec();
    }
    let white = white_level as u32;
    samples
        .par_iter()
        .map(|&v| ((v as u32 * u16::MAX as u32) / white).min(u16::MAX as u32) as u16)
        .collect()
}

/// Bins every 2x2 cell into one RGB pixel: red and blue are taken directly,
/// the two greens are averaged. Monochrome cells average all four samples.
fn half_size_bin(samples: &[u16], width: usize, height: usize, cfa: CfaPattern) -> Result<RgbImage> {
    let out_width = width / 2;
    let out_height = height / 2;
    if out_width == 0 || out_height == 0 {
        return Err(ProcessError::InvalidDimensions(width, height));
    }
    let mut data = vec![0u16; out_width * out_height * RGB_CHANNELS];
    data.par_chunks_mut(out_width * RGB_CHANNELS)
        .enumerate()
        .for_each(|(out_row, row)| {
            for out_col in 0..out_width {
                let pixel = &mut row[out_col * RGB_CHANNELS..(out_col + 1) * RGB_CHANNELS];
                let mut sums = [0u32; 3];
                let mut counts = [0u32; 3];
                for (dr, dc) in [(0, 0), (0, 1), (1, 0), (1, 1)] {
                    let r = out_row * 2 + dr;
                    let c = out_col * 2 + dc;
                    let v = samples[r * width + c] as u32;
                    let channel = match cfa {
                        CfaPattern::Monochrome => Channel::Green,
                        _ => cfa.channel_at(r, c),
                    };
                    sums[channel.index()] += v;
                    counts[channel.index()] += 1;
                }
                if cfa == CfaPattern::Monochrome {
                    let gray = (sums[1] / 4) as u16;
                    pixel.copy_from_slice(&[gray, gray, gray]);
                } else {
                    for ch in 0..3 {
                        pixel[ch] = (sums[ch] / counts[ch].max(1)) as u16;
                    }
                }
            }
        });
    RgbImage::new(out_width, out_height, data)
}
