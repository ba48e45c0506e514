//! Pipeline conversions module
//!
//! Orchestrates decode, merge, calibration, transform, profile and TIFF
//! output for one run.

pub mod config;
mod neg_to_tiff;
mod timing;


pub use config::{ProcessConfig, ProcessConfigBuilder};
pub use neg_to_tiff::{NegativeToTiffPipeline, PIXEL_SHIFT_CAPTURES, ProcessedImage};
pub use timing::{PipelineTimings, Step, StepTiming, Timer};
