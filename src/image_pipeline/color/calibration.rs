//! Color-correction matrix calibration against film-base readings.
//!
//! The user supplies one coefficient row per output channel. Before those
//! rows are applied the green and blue rows are rescaled so that the film
//! base of the current negative, run through the matrix, has the same
//! green/red and blue/red ratios as the film base the target profile was
//! built from. Red is the pivot and only takes the global scale.

use tracing::{info, warn};

use crate::image_pipeline::common::error::{ProcessError, Result};

/// Output channels as linear combinations of input R, G, B.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoefficientRows {
    pub r: [f32; 3],
    pub g: [f32; 3],
    pub b: [f32; 3],
}

impl CoefficientRows {
    pub const IDENTITY: CoefficientRows = CoefficientRows {
        r: [1.0, 0.0, 0.0],
        g: [0.0, 1.0, 0.0],
        b: [0.0, 0.0, 1.0],
    };

    pub fn rows(&self) -> [[f32; 3]; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for CoefficientRows {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Calibrated coefficient rows and the per-row scale factors that went into them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionMatrix {
    pub rows: [[f32; 3]; 3],
    pub g_scale: f32,
    pub b_scale: f32,
}

impl CorrectionMatrix {
    pub fn identity() -> Self {
        Self {
            rows: CoefficientRows::IDENTITY.rows(),
            g_scale: 1.0,
            b_scale: 1.0,
        }
    }

    /// Multiplies every coefficient by `factor`, e.g. to expand 14-bit
    /// sensor values to 16 bits during the transform.
    pub fn scaled(mut self, factor: f32) -> Self {
        for row in self.rows.iter_mut() {
            for c in row.iter_mut() {
                *c *= factor;
            }
        }
        self
    }
}

fn dot(a: &[f32; 3], b: &[f32; 3]) -> f64 {
    a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum()
}

/// Derives the final correction matrix.
///
/// `film_base` is the raw film-base reading of the current negative and
/// `profile_film_base` the reading the target profile assumes. Unless both
/// are given no compensation takes place: the green and blue scales are
/// exactly 1 and any coefficients are accepted.
pub fn calibrate(
    coefficients: &CoefficientRows,
    global_scale: f32,
    film_base: Option<[f32; 3]>,
    profile_film_base: Option<[f32; 3]>,
) -> Result<CorrectionMatrix> {
    let (g_scale, b_scale) = match (film_base, profile_film_base) {
        (Some(film), Some(profile)) => film_base_scales(coefficients, &film, &profile)?,
        (None, None) => (1.0, 1.0),
        (film, _) => {
            warn!(
                "Only the {} film base was supplied; film base compensation disabled",
                if film.is_some() { "capture" } else { "profile" }
            );
            (1.0, 1.0)
        }
    };

    let scale = global_scale as f64;
    let rows = [
        coefficients.r.map(|c| (c as f64 * scale) as f32),
        coefficients.g.map(|c| (c as f64 * g_scale * scale) as f32),
        coefficients.b.map(|c| (c as f64 * b_scale * scale) as f32),
    ];

    info!("Film base compensation: g_scale={:.5} b_scale={:.5}", g_scale, b_scale);

    Ok(CorrectionMatrix {
        rows,
        g_scale: g_scale as f32,
        b_scale: b_scale as f32,
    })
}

/// Green and blue row scales that carry the capture's corrected film-base
/// ratios over to the profile's, with red as pivot.
fn film_base_scales(
    coefficients: &CoefficientRows,
    film_base: &[f32; 3],
    profile_film_base: &[f32; 3],
) -> Result<(f64, f64)> {
    let avg = coefficients.rows().map(|row| dot(&row, film_base));
    let profile = coefficients.rows().map(|row| dot(&row, profile_film_base));

    if let Some(bad) = avg.iter().chain(profile.iter()).find(|v| **v == 0.0 || !v.is_finite()) {
        return Err(ProcessError::InvalidCalibration(format!(
            "corrected film base signal is {} (capture {:?}, profile {:?})",
            bad, avg, profile
        )));
    }

    let g_scale = (profile[1] / profile[0]) / (avg[1] / avg[0]);
    let b_scale = (profile[2] / profile[0]) / (avg[2] / avg[0]);
    Ok((g_scale, b_scale))
}
