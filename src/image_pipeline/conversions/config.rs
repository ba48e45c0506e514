//! Per-run processing configuration

use std::path::PathBuf;

use crate::image_pipeline::color::calibration::CoefficientRows;
use crate::image_pipeline::color::profile::{ProfileTarget, RenderingIntent};
use crate::image_pipeline::merge::{Movement, SONY_FOUR_SHOT};
use crate::image_pipeline::raw::types::DecodeOptions;

/// Configuration for negative to TIFF processing
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessConfig {
    /// Decoder settings for the single-capture path
    pub decode: DecodeOptions,
    /// Base color-correction rows before film-base calibration
    pub coefficients: CoefficientRows,
    /// Global brightness scale applied to every row
    pub exposure_comp: f32,
    /// Film-base reading of the current negative
    pub film_base: Option<[f32; 3]>,
    /// Film-base reading the target profile was built from
    pub profile_film_base: Option<[f32; 3]>,
    /// Gamma applied after the matrix; 1.0 disables it
    pub post_correction_gamma: f32,
    /// ICC profile describing the corrected pixels
    pub input_profile: Option<PathBuf>,
    /// Color space to convert into
    pub output_profile: Option<ProfileTarget>,
    pub intent: RenderingIntent,
    /// Width and height recorded in the header instead of the image's own
    pub output_size: Option<(u32, u32)>,
    /// Sensor displacement of each pixel-shift capture
    pub movements: [Movement; 4],
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            decode: DecodeOptions::default(),
            coefficients: CoefficientRows::IDENTITY,
            exposure_comp: 1.0,
            film_base: None,
            profile_film_base: None,
            post_correction_gamma: 1.0,
            input_profile: None,
            output_profile: None,
            intent: RenderingIntent::default(),
            output_size: None,
            movements: SONY_FOUR_SHOT,
        }
    }
}

impl ProcessConfig {
    pub fn builder() -> ProcessConfigBuilder {
        ProcessConfigBuilder::default()
    }
}

/// Builder for ProcessConfig
#[derive(Default)]
pub struct ProcessConfigBuilder {
    decode: Option<DecodeOptions>,
    coefficients: Option<CoefficientRows>,
    exposure_comp: Option<f32>,
    film_base: Option<[f32; 3]>,
    profile_film_base: Option<[f32; 3]>,
    post_correction_gamma: Option<f32>,
    input_profile: Option<PathBuf>,
    output_profile: Option<ProfileTarget>,
    intent: Option<RenderingIntent>,
    output_size: Option<(u32, u32)>,
    movements: Option<[Movement; 4]>,
}

impl ProcessConfigBuilder {
    pub fn decode(mut self, decode: DecodeOptions) -> Self {
        self.decode = Some(decode);
        self
    }

    pub fn coefficients(mut self, coefficients: CoefficientRows) -> Self {
        self.coefficients = Some(coefficients);
        self
    }

    pub fn exposure_comp(mut self, scale: f32) -> Self {
        self.exposure_comp = Some(scale);
        self
    }

    pub fn film_base(mut self, rgb: Option<[f32; 3]>) -> Self {
        self.film_base = rgb;
        self
    }

    pub fn profile_film_base(mut self, rgb: Option<[f32; 3]>) -> Self {
        self.profile_film_base = rgb;
        self
    }

    pub fn post_correction_gamma(mut self, gamma: f32) -> Self {
        self.post_correction_gamma = Some(gamma);
        self
    }

    pub fn input_profile(mut self, path: Option<PathBuf>) -> Self {
        self.input_profile = path;
        self
    }

    pub fn output_profile(mut self, target: Option<ProfileTarget>) -> Self {
        self.output_profile = target;
        self
    }

    pub fn intent(mut self, intent: RenderingIntent) -> Self {
        self.intent = Some(intent);
        self
    }

    pub fn output_size(mut self, size: Option<(u32, u32)>) -> Self {
        self.output_size = size;
        self
    }

    pub fn movements(mut self, movements: [Movement; 4]) -> Self {
        self.movements = Some(movements);
        self
    }

    pub fn build(self) -> ProcessConfig {
        let default = ProcessConfig::default();
        ProcessConfig {
            decode: self.decode.unwrap_or(default.decode),
            coefficients: self.coefficients.unwrap_or(default.coefficients),
            exposure_comp: self.exposure_comp.unwrap_or(default.exposure_comp),
            film_base: self.film_base,
            profile_film_base: self.profile_film_base,
            post_correction_gamma: self
                .post_correction_gamma
                .unwrap_or(default.post_correction_gamma),
            input_profile: self.input_profile,
            output_profile: self.output_profile,
            intent: self.intent.unwrap_or(default.intent),
            output_size: self.output_size,
            movements: self.movements.unwrap_or(default.movements),
        }
    }
}
