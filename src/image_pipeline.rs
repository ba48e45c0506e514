//! Image processing pipeline module
//!
//! Turns RAW captures of photographic negatives into calibrated positive
//! TIFF files, with separate modules for RAW reading, demosaicing,
//! pixel-shift merging, color correction, TIFF writing and orchestration.

pub mod color;
pub mod common;
pub mod conversions;
pub mod debayer;
pub mod merge;
pub mod raw;
pub mod tiff;

pub use common::{ProcessError, Result};

pub use raw::{
    CaptureMetadata, CfaPattern, DebayerQuality, DecodeOptions, DecodedCapture, GpsData,
    RawFrameSource, RawLoaderReader, SensorFrame,
};

pub use debayer::{CpuDebayer, RgbImage};

pub use merge::{Movement, SONY_FOUR_SHOT, merge_pixel_shift};

pub use color::{
    CoefficientRows, ColorManager, CorrectionMatrix, IccProfile, LcmsColorManager,
    PixelTransformer, ProfileAttacher, ProfileTarget, RenderingIntent, calibrate,
};

pub use tiff::{StandardTiffWriter, TiffHeader, TiffHeaderBuilder, TiffWriter};

pub use conversions::{
    NegativeToTiffPipeline, PipelineTimings, ProcessConfig, ProcessConfigBuilder,
};
