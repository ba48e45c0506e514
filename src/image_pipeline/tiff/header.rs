use chrono::{DateTime, Local};
use tracing::debug;

use crate::image_pipeline::common::error::{ProcessError, Result};
use crate::image_pipeline::debayer::types::{RGB_CHANNELS, RgbImage};
use crate::image_pipeline::raw::types::{CaptureMetadata, GpsData};
use crate::image_pipeline::tiff::directory::{
    Anchor, AssembledHeader, Directory, HeaderDirectories, TagSource, assemble,
};
use crate::image_pipeline::tiff::tags::{self, FieldType};

pub const SOFTWARE_NAME: &str = "negproc";

const RATIONAL_DENOMINATOR: u32 = 1_000_000;
const RESOLUTION_DPI: u32 = 300;
const DATE_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Serialized TIFF header, ready to be followed by the ICC profile and pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TiffHeader {
    bytes: Vec<u8>,
    profile_offset: u32,
    pixel_offset: u32,
    width: u32,
    height: u32,
    strip_byte_count: u32,
}

impl TiffHeader {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// File offset of the embedded ICC profile.
    pub fn profile_offset(&self) -> u32 {
        self.profile_offset
    }

    /// File offset of the first pixel byte.
    pub fn pixel_offset(&self) -> u32 {
        self.pixel_offset
    }

    /// Canvas recorded in ImageWidth and ImageLength.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Pixel bytes that must follow the profile.
    pub fn strip_byte_count(&self) -> u32 {
        self.strip_byte_count
    }
}

/// Builds the header of an uncompressed, single-strip, big-endian TIFF.
pub struct TiffHeaderBuilder<'a> {
    metadata: &'a CaptureMetadata,
    width: u32,
    height: u32,
    colors: u16,
    bits_per_sample: u16,
    profile_len: usize,
}

impl<'a> TiffHeaderBuilder<'a> {
    pub fn new(image: &RgbImage, metadata: &'a CaptureMetadata) -> Self {
        Self {
            metadata,
            width: image.width as u32,
            height: image.height as u32,
            colors: RGB_CHANNELS as u16,
            bits_per_sample: 16,
            profile_len: 0,
        }
    }

    /// Replaces the recorded geometry. Zero leaves that dimension unchanged.
    pub fn output_size(mut self, width: u32, height: u32) -> Self {
        if width > 0 {
            self.width = width;
        }
        if height > 0 {
            self.height = height;
        }
        self
    }

    /// Size of the ICC profile that will follow the header. Zero omits the tag.
    pub fn profile_len(mut self, len: usize) -> Self {
        self.profile_len = len;
        self
    }

    pub fn build(&self) -> Result<TiffHeader> {
        let gps = self.metadata.gps.filter(GpsData::has_position);
        let directories = HeaderDirectories {
            primary: self.primary_directory(gps.is_some())?,
            exif: Some(self.exif_directory()?),
            gps: gps.as_ref().map(gps_directory).transpose()?,
        };
        let AssembledHeader {
            bytes,
            profile_offset,
            pixel_offset,
        } = assemble(&directories, self.profile_len)?;
        let header = TiffHeader {
            bytes,
            profile_offset,
            pixel_offset,
            width: self.width,
            height: self.height,
            strip_byte_count: self.strip_byte_count()?,
        };
        debug!(
            "TIFF header: {} bytes, pixels at {}",
            header.len(),
            header.pixel_offset()
        );
        Ok(header)
    }

    fn strip_byte_count(&self) -> Result<u32> {
        let bytes = self.width as u64
            * self.height as u64
            * self.colors as u64
            * self.bits_per_sample as u64
            / 8;
        u32::try_from(bytes).map_err(|_| {
            ProcessError::HeaderError(format!("{} pixel bytes do not fit a single strip", bytes))
        })
    }

    fn primary_directory(&self, with_gps: bool) -> Result<Directory> {
        let meta = self.metadata;
        let mut dir = Directory::new();

        dir.append_long(tags::NEW_SUBFILE_TYPE, 0)?;
        dir.append_long(tags::IMAGE_WIDTH, self.width)?;
        dir.append_long(tags::IMAGE_LENGTH, self.height)?;
        if self.colors > 2 {
            dir.append_shorts(
                tags::BITS_PER_SAMPLE,
                &vec![self.bits_per_sample; self.colors as usize],
            )?;
        } else {
            dir.append(
                tags::BITS_PER_SAMPLE,
                FieldType::Short,
                self.colors as u32,
                TagSource::Value(self.bits_per_sample as u32),
            )?;
        }
        dir.append_short(tags::COMPRESSION, 1)?;
        dir.append_short(tags::PHOTOMETRIC_INTERPRETATION, 1 + (self.colors > 1) as u16)?;
        dir.append_ascii(tags::IMAGE_DESCRIPTION, &meta.description, 512)?;
        dir.append_ascii(tags::MAKE, &meta.make, 64)?;
        dir.append_ascii(tags::MODEL, &meta.model, 64)?;
        dir.append_anchor(tags::STRIP_OFFSETS, FieldType::Long, 1, Anchor::PixelData)?;
        dir.append_short(tags::SAMPLES_PER_PIXEL, self.colors)?;
        dir.append_long(tags::ROWS_PER_STRIP, self.height)?;
        dir.append_long(tags::STRIP_BYTE_COUNTS, self.strip_byte_count()?)?;
        dir.append_rationals(tags::X_RESOLUTION, &[(RESOLUTION_DPI, 1)])?;
        dir.append_rationals(tags::Y_RESOLUTION, &[(RESOLUTION_DPI, 1)])?;
        dir.append_short(tags::PLANAR_CONFIGURATION, 1)?;
        dir.append_short(tags::RESOLUTION_UNIT, 2)?;
        dir.append_ascii(tags::SOFTWARE, SOFTWARE_NAME, 32)?;
        dir.append_ascii(tags::DATE_TIME, &format_timestamp(meta.timestamp), 20)?;
        dir.append_ascii(tags::ARTIST, &meta.artist, 64)?;
        dir.append_anchor(tags::EXIF_IFD, FieldType::Long, 1, Anchor::ExifIfd)?;
        if self.profile_len > 0 {
            let len = u32::try_from(self.profile_len).map_err(|_| {
                ProcessError::HeaderError(format!("ICC profile of {} bytes", self.profile_len))
            })?;
            dir.append_anchor(tags::ICC_PROFILE, FieldType::Undefined, len, Anchor::HeaderEnd)?;
        }
        if with_gps {
            dir.append_anchor(tags::GPS_IFD, FieldType::Long, 1, Anchor::GpsIfd)?;
        }
        Ok(dir)
    }

    fn exif_directory(&self) -> Result<Directory> {
        let meta = self.metadata;
        let mut dir = Directory::new();
        dir.append_rationals(tags::EXPOSURE_TIME, &[micro_rational(meta.shutter)])?;
        dir.append_rationals(tags::F_NUMBER, &[micro_rational(meta.aperture)])?;
        dir.append_short(tags::ISO_SPEED_RATINGS, meta.iso_speed as u16)?;
        dir.append_rationals(tags::FOCAL_LENGTH, &[micro_rational(meta.focal_length)])?;
        Ok(dir)
    }
}

/// Rational with a fixed 1e6 denominator; the numerator is truncated.
fn micro_rational(value: f32) -> (u32, u32) {
    ((value as f64 * RATIONAL_DENOMINATOR as f64) as u32, RATIONAL_DENOMINATOR)
}

/// Local-time "YYYY:MM:DD HH:MM:SS".
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.with_timezone(&Local).format(DATE_TIME_FORMAT).to_string())
        .unwrap_or_else(|| "0000:00:00 00:00:00".to_string())
}

fn gps_directory(gps: &GpsData) -> Result<Directory> {
    let mut dir = Directory::new();
    let base = dir.stash(&gps.to_be_bytes());
    let word = |index: usize| base + 4 * index as u32;

    let lat_ref = dir.stash(&[gps.words[GpsData::LATITUDE_REF] as u8, 0]);
    let lon_ref = dir.stash(&[gps.words[GpsData::LONGITUDE_REF] as u8, 0]);

    dir.append(tags::GPS_VERSION_ID, FieldType::Byte, 4, TagSource::Value(0x202))?;
    dir.append(tags::GPS_LATITUDE_REF, FieldType::Ascii, 2, TagSource::Extra(lat_ref))?;
    dir.append(
        tags::GPS_LATITUDE,
        FieldType::Rational,
        3,
        TagSource::Extra(word(GpsData::LATITUDE)),
    )?;
    dir.append(tags::GPS_LONGITUDE_REF, FieldType::Ascii, 2, TagSource::Extra(lon_ref))?;
    dir.append(
        tags::GPS_LONGITUDE,
        FieldType::Rational,
        3,
        TagSource::Extra(word(GpsData::LONGITUDE)),
    )?;
    dir.append(
        tags::GPS_ALTITUDE_REF,
        FieldType::Byte,
        1,
        TagSource::Value(gps.words[GpsData::ALTITUDE_REF] & 0xff),
    )?;
    dir.append(
        tags::GPS_ALTITUDE,
        FieldType::Rational,
        1,
        TagSource::Extra(word(GpsData::ALTITUDE)),
    )?;
    dir.append(
        tags::GPS_TIME_STAMP,
        FieldType::Rational,
        3,
        TagSource::Extra(word(GpsData::TIME_STAMP)),
    )?;
    dir.append(
        tags::GPS_MAP_DATUM,
        FieldType::Ascii,
        12,
        TagSource::Extra(word(GpsData::MAP_DATUM)),
    )?;
    dir.append(
        tags::GPS_DATE_STAMP,
        FieldType::Ascii,
        12,
        TagSource::Extra(word(GpsData::DATE_STAMP)),
    )?;
    Ok(dir)
}
