use lcms2::{Intent, PixelFormat, Profile, Transform};
use tracing::debug;

use crate::image_pipeline::color::profile::{ColorManager, IccProfile, OutputProfile, RenderingIntent};
use crate::image_pipeline::common::error::{ProcessError, Result};

/// Little CMS backed color manager.
pub struct LcmsColorManager;

impl From<RenderingIntent> for Intent {
    fn from(intent: RenderingIntent) -> Self {
        match intent {
            RenderingIntent::Perceptual => Intent::Perceptual,
            RenderingIntent::RelativeColorimetric => Intent::RelativeColorimetric,
            RenderingIntent::Saturation => Intent::Saturation,
            RenderingIntent::AbsoluteColorimetric => Intent::AbsoluteColorimetric,
        }
    }
}

impl ColorManager for LcmsColorManager {
    fn transform(
        &self,
        pixels: &mut [u16],
        input: &IccProfile,
        output: &OutputProfile,
        intent: RenderingIntent,
    ) -> Result<()> {
        let in_profile = Profile::new_icc(input.as_bytes())
            .map_err(|e| ProcessError::ProfileTransformError(format!("input profile: {}", e)))?;
        let out_profile = match output {
            OutputProfile::Srgb => Profile::new_srgb(),
            OutputProfile::Icc(profile) => Profile::new_icc(profile.as_bytes())
                .map_err(|e| ProcessError::ProfileTransformError(format!("output profile: {}", e)))?,
        };

        let transform: Transform<[u16; 3], [u16; 3]> = Transform::new(
            &in_profile,
            PixelFormat::RGB_16,
            &out_profile,
            PixelFormat::RGB_16,
            intent.into(),
        )
        .map_err(|e| ProcessError::ProfileTransformError(e.to_string()))?;

        let pixels: &mut [[u16; 3]] = bytemuck::try_cast_slice_mut(pixels)
            .map_err(|e| ProcessError::ProfileTransformError(format!("pixel buffer: {}", e)))?;
        debug!("Transforming {} pixels with {:?} intent", pixels.len(), intent);
        transform.transform_in_place(pixels);
        Ok(())
    }
}
