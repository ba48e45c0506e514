//! Demosaicing of single captures into RGB images

pub mod cpu_debayer;
pub mod types;

pub use cpu_debayer::CpuDebayer;
pub use types::{RGB_CHANNELS, RgbImage};
