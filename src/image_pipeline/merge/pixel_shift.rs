//! Pixel-shift merge of four mosaiced captures into one full-color image.
//!
//! Each capture was taken with the sensor displaced by a whole pixel, so
//! across the four shots every output site has been seen through a red, a
//! blue and two green filters. Samples are moved to their displaced position
//! in the output; red and blue are copied, the two greens averaged.

use rayon::prelude::*;
use tracing::{debug, info, instrument};

use crate::image_pipeline::common::error::{ProcessError, Result};
use crate::image_pipeline::debayer::types::{RGB_CHANNELS, RgbImage};
use crate::image_pipeline::raw::cfa::Channel;
use crate::image_pipeline::raw::types::{FrameSamples, SensorFrame};

/// Sensor displacement of one capture relative to the first, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Movement {
    pub dx: isize,
    pub dy: isize,
}

impl Movement {
    pub const fn new(dx: isize, dy: isize) -> Self {
        Self { dx, dy }
    }
}

/// Four-shot sequence of Sony pixel-shift cameras.
pub const SONY_FOUR_SHOT: [Movement; 4] = [
    Movement::new(0, 0),
    Movement::new(0, 1),
    Movement::new(-1, 1),
    Movement::new(-1, 0),
];

/// Merges four mosaiced captures.
///
/// The CFA of the first capture is the canonical pattern. Source samples are
/// read from rows `0..height - 1` and columns `1..width` of every capture and
/// written at `(row + dy, col + dx)`. Captures 0 and 1 write green; captures 2
/// and 3 average their green with the value already present. Output sites no
/// capture reaches stay zero.
///
/// Captures are consumed in order and each buffer is released as soon as it
/// has contributed.
#[instrument(skip_all)]
pub fn merge_pixel_shift(frames: [SensorFrame; 4], movements: &[Movement; 4]) -> Result<RgbImage> {
    let width = frames[0].width;
    let height = frames[0].height;
    let cfa = frames[0].cfa;

    if !cfa.is_bayer() {
        return Err(ProcessError::UnsupportedCfa(format!(
            "pixel-shift merge needs a Bayer mosaic, got {}",
            cfa
        )));
    }
    if width < 2 || height < 2 {
        return Err(ProcessError::InvalidDimensions(width, height));
    }
    for (i, frame) in frames.iter().enumerate() {
        if frame.width != width || frame.height != height {
            return Err(ProcessError::CaptureMismatch(format!(
                "capture {} is {}x{}, expected {}x{}",
                i, frame.width, frame.height, width, height
            )));
        }
        if frame.cfa != cfa {
            return Err(ProcessError::CaptureMismatch(format!(
                "capture {} has pattern {}, expected {}",
                i, frame.cfa, cfa
            )));
        }
        match &frame.samples {
            FrameSamples::Mosaic(samples) if samples.len() != width * height => {
                return Err(ProcessError::CaptureMismatch(format!(
                    "capture {} holds {} samples, expected {}",
                    i,
                    samples.len(),
                    width * height
                )));
            }
            FrameSamples::Mosaic(_) => {}
            FrameSamples::Rgb(_) => {
                return Err(ProcessError::CaptureMismatch(format!("capture {} is not mosaiced", i)));
            }
        }
    }

    info!("Merging 4 captures of {}x{} ({})", width, height, cfa);

    let mut merged = RgbImage::zeroed(width, height);
    let row_len = merged.row_len();

    for (index, (frame, movement)) in frames.into_iter().zip(movements).enumerate() {
        let samples = match frame.samples {
            FrameSamples::Mosaic(samples) => samples,
            FrameSamples::Rgb(_) => {
                return Err(ProcessError::CaptureMismatch(format!("capture {} is not mosaiced", index)));
            }
        };
        let average_green = index >= 2;
        let Movement { dx, dy } = *movement;

        merged
            .data
            .par_chunks_mut(row_len)
            .enumerate()
            .for_each(|(row, out)| {
                let src_row = row as isize - dy;
                if src_row < 0 || src_row >= height as isize - 1 {
                    return;
                }
                let src_row = src_row as usize;
                for col in 0..width {
                    let src_col = col as isize - dx;
                    if src_col < 1 || src_col >= width as isize {
                        continue;
                    }
                    let src_col = src_col as usize;
                    let value = samples[src_row * width + src_col];
                    let channel = cfa.channel_at(src_row, src_col);
                    let slot = &mut out[col * RGB_CHANNELS + channel.index()];
                    *slot = if channel == Channel::Green && average_green {
                        ((*slot as u32 + value as u32) / 2) as u16
                    } else {
                        value
                    };
                }
            });

        debug!("Capture {} merged with movement ({}, {})", index, dx, dy);
        // `samples` is dropped here, before the next capture is read.
    }

    Ok(merged)
}
