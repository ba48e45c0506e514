use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to read input file: {0}")]
    InputReadError(String),

    #[error("Failed to write output file: {0}")]
    OutputWriteError(String),

    #[error("Failed to decode RAW image: {0}")]
    DecodeError(String),

    #[error("Unsupported color filter array: {0}. Only monochrome and 2x2 Bayer mosaics are supported")]
    UnsupportedCfa(String),

    #[error("Invalid image dimensions: width={0}, height={1}")]
    InvalidDimensions(usize, usize),

    #[error("Pixel-shift captures do not match: {0}")]
    CaptureMismatch(String),

    #[error("Failed to read ICC profile {path}: {reason}")]
    ProfileReadError { path: PathBuf, reason: String },

    #[error("Color transform failed: {0}")]
    ProfileTransformError(String),

    #[error("Invalid film base calibration: {0}")]
    InvalidCalibration(String),

    #[error("Tag {tag} appended after tag {previous}; directory tags must be strictly increasing")]
    TagOrder { previous: u16, tag: u16 },

    #[error("Cannot encode TIFF header: {0}")]
    HeaderError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
