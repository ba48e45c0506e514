//! RAW capture reader implementation using the rawloader library.
//!
//! Supports every format rawloader decodes (ARW, CR2, NEF, DNG, ...) as long as
//! the sensor is monochrome or carries a 2x2 Bayer mosaic. The mosaic is black
//! subtracted and either returned as is, for pixel-shift merging, or handed to
//! [`CpuDebayer`] for the single-capture path.

use std::io::Cursor;

use rawloader::RawImageData as RawloaderImageData;
use tracing::{debug, instrument};

use crate::image_pipeline::common::error::{ProcessError, Result};
use crate::image_pipeline::debayer::CpuDebayer;
use crate::image_pipeline::raw::cfa::{CfaPattern, Channel};
use crate::image_pipeline::raw::reader::RawFrameSource;
use crate::image_pipeline::raw::types::{
    CaptureMetadata, DecodeOptions, DecodedCapture, FrameSamples, SensorFrame,
};

/// RAW reader backed by rawloader.
pub struct RawLoaderReader;

impl RawFrameSource for RawLoaderReader {
    #[instrument(skip(self, data), fields(input_size = data.len()))]
    fn read_capture(&self, data: &[u8], options: &DecodeOptions) -> Result<DecodedCapture> {
        let decoded = rawloader::decode(&mut Cursor::new(data))
            .map_err(|e| ProcessError::DecodeError(e.to_string()))?;

        let width = decoded.width;
        let height = decoded.height;
        debug!("Decoded image: {}x{}, {} component(s) per pixel", width, height, decoded.cpp);

        if decoded.cpp != 1 {
            return Err(ProcessError::UnsupportedCfa(format!(
                "{} components per pixel",
                decoded.cpp
            )));
        }
        if width == 0 || height == 0 {
            return Err(ProcessError::InvalidDimensions(width, height));
        }

        let cfa = cfa_pattern(&decoded.cfa)?;
        debug!("CFA pattern: {}", cfa);

        // Black levels are indexed by rawloader's color numbering; resolve
        // them once per 2x2 cell position.
        let mut cell_black = [0u16; 4];
        for (i, black) in cell_black.iter_mut().enumerate() {
            *black = if cfa.is_bayer() {
                decoded.blacklevels[decoded.cfa.color_at(i >> 1, i & 1) & 3]
            } else {
                decoded.blacklevels[0]
            };
        }
        let max_black = cell_black.iter().copied().max().unwrap_or(0);
        let max_white = decoded.whitelevels.iter().copied().max().unwrap_or(u16::MAX);
        let white_level = max_white.saturating_sub(max_black);

        // Integer data is cast directly, float data (normalized 0.0-1.0) is scaled to u16 range
        let samples: Vec<u16> = match decoded.data {
            RawloaderImageData::Integer(values) => values.iter().map(|&v| v as u16).collect(),
            RawloaderImageData::Float(values) => {
                values.iter().map(|&v| (v * u16::MAX as f32) as u16).collect()
            }
        };
        if samples.len() != width * height {
            return Err(ProcessError::InvalidDimensions(width, height));
        }
        let samples = subtract_black(samples, width, &cell_black);

        debug!("White level after black subtraction: {} (black {:?})", white_level, cell_black);

        let frame = SensorFrame {
            width,
            height,
            cfa,
            white_level,
            samples: FrameSamples::Mosaic(samples),
        };

        let metadata = CaptureMetadata {
            make: decoded.clean_make.clone(),
            model: decoded.clean_model.clone(),
            ..CaptureMetadata::default()
        };

        if !options.demosaic {
            return Ok(DecodedCapture { frame, metadata });
        }

        let mut rgb = CpuDebayer::new(options.quality).process(&frame, options.half_size)?;
        if options.crop {
            let [top, right, bottom, left] = decoded.crops;
            if top != 0 || right != 0 || bottom != 0 || left != 0 {
                let scale = if options.half_size { 2 } else { 1 };
                let (top, left) = (top / scale, left / scale);
                let crop_width = rgb.width.saturating_sub(left + right / scale);
                let crop_height = rgb.height.saturating_sub(top + bottom / scale);
                debug!("Cropping to {}x{} at ({}, {})", crop_width, crop_height, left, top);
                rgb = rgb.crop(top, left, crop_width, crop_height)?;
            }
        }

        Ok(DecodedCapture {
            frame: SensorFrame {
                width: rgb.width,
                height: rgb.height,
                cfa,
                white_level: u16::MAX,
                samples: FrameSamples::Rgb(rgb.data),
            },
            metadata,
        })
    }
}

fn cfa_pattern(cfa: &rawloader::CFA) -> Result<CfaPattern> {
    if cfa.width == 0 || cfa.height == 0 {
        return Ok(CfaPattern::Monochrome);
    }
    if cfa.width != 2 || cfa.height != 2 {
        return Err(ProcessError::UnsupportedCfa(cfa.name.clone()));
    }
    let mut cell = [Channel::Green; 4];
    for (i, channel) in cell.iter_mut().enumerate() {
        *channel = match cfa.color_at(i >> 1, i & 1) {
            0 => Channel::Red,
            1 => Channel::Green,
            2 => Channel::Blue,
            _ => return Err(ProcessError::UnsupportedCfa(cfa.name.clone())),
        };
    }
    CfaPattern::from_cell(cell)
}

/// Subtracts the black level of each 2x2 cell position, saturating at zero.
pub(crate) fn subtract_black(mut samples: Vec<u16>, width: usize, cell_black: &[u16; 4]) -> Vec<u16> {
    for (i, v) in samples.iter_mut().enumerate() {
        let (row, col) = (i / width, i % width);
        *v = v.saturating_sub(cell_black[((row & 1) << 1) | (col & 1)]);
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subtract_black_per_cell_position() {
        let samples = vec![100, 200, 300, 400, 10, 600, 700, 800];
        let out = subtract_black(samples, 4, &[50, 60, 70, 80]);
        assert_eq!(out, vec![50, 140, 250, 340, 0, 520, 630, 720]);
    }

    #[test]
    fn test_rejects_garbage_input() {
        let result = RawLoaderReader.read_capture(b"not a raw file", &DecodeOptions::default());
        assert!(matches!(result, Err(ProcessError::DecodeError(_))));
    }
}
