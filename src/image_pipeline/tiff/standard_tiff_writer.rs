use std::io::Write;

use rayon::prelude::*;
use tracing::debug;

use crate::image_pipeline::color::profile::IccProfile;
use crate::image_pipeline::common::error::{ProcessError, Result};
use crate::image_pipeline::debayer::types::{RGB_CHANNELS, RgbImage};
use crate::image_pipeline::tiff::header::TiffHeader;
use crate::image_pipeline::tiff::writer::TiffWriter;

/// Uncompressed big-endian writer: header, ICC profile, then 16-bit samples.
///
/// The strip always covers the canvas declared by the header. The image is
/// placed at its top-left corner; canvas area outside the image is black and
/// image area outside the canvas is dropped.
pub struct StandardTiffWriter;

/// Big-endian RGB samples of the `width` x `height` canvas.
fn canvas_bytes(image: &RgbImage, width: usize, height: usize) -> Vec<u8> {
    let row_bytes = width * RGB_CHANNELS * 2;
    let copied = width.min(image.width) * RGB_CHANNELS;
    let mut pixels = vec![0u8; row_bytes * height];
    if row_bytes == 0 {
        return pixels;
    }
    pixels
        .par_chunks_mut(row_bytes)
        .take(image.height)
        .enumerate()
        .for_each(|(row, out)| {
            let start = row * image.row_len();
            let source = &image.data[start..start + copied];
            for (dst, v) in out.chunks_exact_mut(2).zip(source) {
                dst.copy_from_slice(&v.to_be_bytes());
            }
        });
    pixels
}

impl TiffWriter for StandardTiffWriter {
    fn write_tiff(
        &self,
        header: &TiffHeader,
        image: &RgbImage,
        profile: Option<&IccProfile>,
        output: &mut dyn Write,
    ) -> Result<()> {
        let profile_len = profile.map_or(0, IccProfile::len);
        if header.pixel_offset() as usize != header.len() + profile_len {
            return Err(ProcessError::HeaderError(format!(
                "header expects pixels at {} but {} header and {} profile bytes precede them",
                header.pixel_offset(),
                header.len(),
                profile_len
            )));
        }

        let (width, height) = header.dimensions();
        let (width, height) = (width as usize, height as usize);
        if width * height * RGB_CHANNELS * 2 != header.strip_byte_count() as usize {
            return Err(ProcessError::HeaderError(format!(
                "{}x{} RGB canvas does not match a strip of {} bytes",
                width,
                height,
                header.strip_byte_count()
            )));
        }
        if (width, height) != (image.width, image.height) {
            debug!(
                "Placing {}x{} image on a {}x{} canvas",
                image.width, image.height, width, height
            );
        }
        debug!("Encoding TIFF image: {}x{}", width, height);

        let pixels = canvas_bytes(image, width, height);

        output.write_all(header.as_bytes())?;
        if let Some(profile) = profile {
            output.write_all(profile.as_bytes())?;
        }
        output.write_all(&pixels)?;
        output.flush()?;

        debug!("TIFF encoding complete: {} pixel bytes", pixels.len());
        Ok(())
    }
}
