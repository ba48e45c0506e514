//! RAW capture data types

use crate::image_pipeline::common::error::{ProcessError, Result};
use crate::image_pipeline::debayer::types::RgbImage;
use crate::image_pipeline::raw::cfa::CfaPattern;

/// Sample storage of a decoded capture.
#[derive(Debug, Clone, PartialEq)]
pub enum FrameSamples {
    /// One sample per pixel, still mosaiced. Color is given by the frame's CFA.
    Mosaic(Vec<u16>),
    /// Demosaiced samples interleaved [R, G, B, R, G, B, ...], full 16-bit range.
    Rgb(Vec<u16>),
}

/// One decoded capture
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFrame {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Filter layout of the sensor
    pub cfa: CfaPattern,
    /// Largest sample value after black subtraction
    pub white_level: u16,
    pub samples: FrameSamples,
}

impl SensorFrame {
    /// Number of significant bits of the white level (e.g. 14 for a 14-bit sensor).
    pub fn bits_per_sample(&self) -> u32 {
        if self.white_level == 0 {
            return 16;
        }
        u16::BITS - self.white_level.leading_zeros()
    }

    pub fn is_mosaic(&self) -> bool {
        matches!(self.samples, FrameSamples::Mosaic(_))
    }

    /// Consumes a demosaiced frame into an RGB image.
    pub fn into_rgb(self) -> Result<RgbImage> {
        match self.samples {
            FrameSamples::Rgb(data) => RgbImage::new(self.width, self.height, data),
            FrameSamples::Mosaic(_) => Err(ProcessError::DecodeError(
                "capture is still mosaiced; decode it with demosaicing enabled".to_string(),
            )),
        }
    }
}

/// Demosaic algorithm used by the single-capture path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebayerQuality {
    Nearest,
    #[default]
    Linear,
    Cubic,
}

/// Per-call decoder settings. Never shared or mutated between calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Demosaic to RGB (single capture) or keep the mosaic (pixel-shift merge)
    pub demosaic: bool,
    /// Bin each 2x2 cell into one pixel instead of interpolating
    pub half_size: bool,
    /// Apply the crop box reported by the decoder
    pub crop: bool,
    pub quality: DebayerQuality,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            demosaic: true,
            half_size: false,
            crop: true,
            quality: DebayerQuality::Linear,
        }
    }
}

impl DecodeOptions {
    /// Settings for a pixel-shift capture: raw mosaic, no crop.
    pub fn pixel_shift() -> Self {
        Self {
            demosaic: false,
            half_size: false,
            crop: false,
            quality: DebayerQuality::Linear,
        }
    }
}

/// GPS block as a word array.
///
/// Words 0-5 latitude (3 rationals), 6-11 longitude, 12-17 time stamp,
/// 18-19 altitude, 20-22 map datum and 23-25 date stamp (ASCII packed
/// big-endian, four characters per word), 29/30 latitude/longitude
/// reference characters, 31 altitude reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsData {
    pub words: [u32; 32],
}

impl Default for GpsData {
    fn default() -> Self {
        Self { words: [0; 32] }
    }
}

impl GpsData {
    pub const LATITUDE: usize = 0;
    pub const LONGITUDE: usize = 6;
    pub const TIME_STAMP: usize = 12;
    pub const ALTITUDE: usize = 18;
    pub const MAP_DATUM: usize = 20;
    pub const DATE_STAMP: usize = 23;
    pub const LATITUDE_REF: usize = 29;
    pub const LONGITUDE_REF: usize = 30;
    pub const ALTITUDE_REF: usize = 31;

    /// A reading exists when the latitude degrees denominator is set.
    pub fn has_position(&self) -> bool {
        self.words[1] != 0
    }

    pub fn set_latitude(&mut self, reference: u8, dms: [(u32, u32); 3]) {
        self.set_rationals(Self::LATITUDE, &dms);
        self.words[Self::LATITUDE_REF] = reference as u32;
    }

    pub fn set_longitude(&mut self, reference: u8, dms: [(u32, u32); 3]) {
        self.set_rationals(Self::LONGITUDE, &dms);
        self.words[Self::LONGITUDE_REF] = reference as u32;
    }

    pub fn set_altitude(&mut self, below_sea_level: bool, meters: (u32, u32)) {
        self.set_rationals(Self::ALTITUDE, &[meters]);
        self.words[Self::ALTITUDE_REF] = below_sea_level as u32;
    }

    pub fn set_time_stamp(&mut self, hms: [(u32, u32); 3]) {
        self.set_rationals(Self::TIME_STAMP, &hms);
    }

    /// Stores at most 11 characters so the text stays NUL terminated.
    pub fn set_date_stamp(&mut self, date: &str) {
        self.set_text(Self::DATE_STAMP, date);
    }

    pub fn set_map_datum(&mut self, datum: &str) {
        self.set_text(Self::MAP_DATUM, datum);
    }

    /// Big-endian byte image of the word array.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_be_bytes()).collect()
    }

    fn set_rationals(&mut self, start: usize, values: &[(u32, u32)]) {
        for (i, (num, den)) in values.iter().enumerate() {
            self.words[start + 2 * i] = *num;
            self.words[start + 2 * i + 1] = *den;
        }
    }

    fn set_text(&mut self, start: usize, text: &str) {
        let mut bytes = [0u8; 12];
        for (dst, src) in bytes.iter_mut().zip(text.bytes().take(11)) {
            *dst = src;
        }
        for (i, chunk) in bytes.chunks_exact(4).enumerate() {
            self.words[start + i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        }
    }
}

/// Scalar capture metadata reported by the decoder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureMetadata {
    pub iso_speed: f32,
    /// Exposure time in seconds
    pub shutter: f32,
    pub aperture: f32,
    /// Focal length in millimetres
    pub focal_length: f32,
    pub make: String,
    pub model: String,
    pub artist: String,
    pub description: String,
    /// Capture time, seconds since the Unix epoch
    pub timestamp: i64,
    pub gps: Option<GpsData>,
}

/// A decoded capture together with its metadata.
#[derive(Debug, Clone)]
pub struct DecodedCapture {
    pub frame: SensorFrame,
    pub metadata: CaptureMetadata,
}
