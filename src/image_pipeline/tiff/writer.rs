use std::io::Write;

use crate::image_pipeline::color::profile::IccProfile;
use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::debayer::types::RgbImage;
use crate::image_pipeline::tiff::header::TiffHeader;

pub trait TiffWriter {
    /// Writes `header`, the optional embedded profile and the pixel strip.
    fn write_tiff(
        &self,
        header: &TiffHeader,
        image: &RgbImage,
        profile: Option<&IccProfile>,
        output: &mut dyn Write,
    ) -> Result<()>;
}
