//! Color correction: matrix calibration, per-pixel transform and ICC profiles

pub mod calibration;
mod lcms_manager;
pub mod profile;
pub mod transform;

pub use calibration::{CoefficientRows, CorrectionMatrix, calibrate};
pub use lcms_manager::LcmsColorManager;
pub use profile::{
    ColorManager, IccProfile, OutputProfile, ProfileAttacher, ProfileTarget, ProfiledImage,
    RenderingIntent,
};
pub use transform::PixelTransformer;
