//! RAW capture reading module
//!
//! Format-agnostic decoding of camera RAW files into sensor frames plus
//! capture metadata.

pub mod cfa;
mod rawloader_reader;
mod reader;
pub mod types;

pub use cfa::{CfaPattern, Channel};
pub use rawloader_reader::RawLoaderReader;
pub use reader::RawFrameSource;
pub use types::{
    CaptureMetadata, DebayerQuality, DecodeOptions, DecodedCapture, FrameSamples, GpsData,
    SensorFrame,
};
