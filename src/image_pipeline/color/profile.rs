//! ICC profile loading, conversion and attach policy.

use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::{info, instrument};

use crate::image_pipeline::common::error::{ProcessError, Result};
use crate::image_pipeline::debayer::types::RgbImage;

/// Size of the fixed ICC profile header.
const ICC_HEADER_LEN: usize = 128;

/// Raw ICC profile bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IccProfile {
    bytes: Vec<u8>,
}

impl IccProfile {
    /// Wraps profile bytes. The first four bytes must hold the profile size
    /// (big-endian); bytes past that size are dropped.
    pub fn from_bytes(mut bytes: Vec<u8>) -> std::result::Result<Self, String> {
        if bytes.len() < 4 {
            return Err(format!("truncated: {} bytes", bytes.len()));
        }
        let declared = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        if declared < ICC_HEADER_LEN {
            return Err(format!("declared size {} is smaller than the profile header", declared));
        }
        if bytes.len() < declared {
            return Err(format!("truncated: {} of {} bytes", bytes.len(), declared));
        }
        bytes.truncate(declared);
        Ok(Self { bytes })
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|e| ProcessError::ProfileReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(bytes).map_err(|reason| ProcessError::ProfileReadError {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Requested output color space: the engine's built-in sRGB or a profile file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileTarget {
    Srgb,
    File(PathBuf),
}

impl FromStr for ProfileTarget {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(if s.eq_ignore_ascii_case("srgb") {
            ProfileTarget::Srgb
        } else {
            ProfileTarget::File(PathBuf::from(s))
        })
    }
}

/// A loaded output profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputProfile {
    Srgb,
    Icc(IccProfile),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderingIntent {
    #[default]
    Perceptual,
    RelativeColorimetric,
    Saturation,
    AbsoluteColorimetric,
}

/// Color-management engine converting 16-bit RGB pixels between profiles.
pub trait ColorManager {
    /// Converts interleaved RGB samples in place.
    fn transform(
        &self,
        pixels: &mut [u16],
        input: &IccProfile,
        output: &OutputProfile,
        intent: RenderingIntent,
    ) -> Result<()>;
}

/// Image after the profile step, with the profile to embed, if any.
#[derive(Debug, Clone)]
pub struct ProfiledImage {
    pub image: RgbImage,
    pub profile: Option<IccProfile>,
}

/// Decides between attaching and converting.
///
/// With only an input profile it is attached and pixels are untouched. With
/// an input and an output profile the pixels are converted and the output
/// profile is attached, except for sRGB which is left implicit. An output
/// profile alone is ignored.
pub struct ProfileAttacher<'a, C: ColorManager> {
    color_manager: &'a C,
    intent: RenderingIntent,
}

impl<'a, C: ColorManager> ProfileAttacher<'a, C> {
    pub fn new(color_manager: &'a C, intent: RenderingIntent) -> Self {
        Self { color_manager, intent }
    }

    #[instrument(skip(self, image))]
    pub fn attach(
        &self,
        image: RgbImage,
        input: Option<&Path>,
        output: Option<&ProfileTarget>,
    ) -> Result<ProfiledImage> {
        let Some(input) = input else {
            return Ok(ProfiledImage { image, profile: None });
        };

        info!("Reading input ICC profile: {}", input.display());
        let input_profile = IccProfile::read(input)?;

        let Some(output) = output else {
            info!("Attaching profile: {}", input.display());
            return Ok(ProfiledImage {
                image,
                profile: Some(input_profile),
            });
        };

        let output_profile = match output {
            ProfileTarget::Srgb => {
                info!("Converting to built-in sRGB profile");
                OutputProfile::Srgb
            }
            ProfileTarget::File(path) => {
                info!("Reading output ICC profile: {}", path.display());
                OutputProfile::Icc(IccProfile::read(path)?)
            }
        };

        let mut image = image;
        self.color_manager
            .transform(&mut image.data, &input_profile, &output_profile, self.intent)?;

        let profile = match output_profile {
            OutputProfile::Srgb => None,
            OutputProfile::Icc(profile) => Some(profile),
        };
        Ok(ProfiledImage { image, profile })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::io::Write;

    use super::*;

    fn fake_profile(len: usize, fill: u8) -> Vec<u8> {
        let mut bytes = vec![fill; len];
        bytes[..4].copy_from_slice(&(len as u32).to_be_bytes());
        bytes
    }

    fn profile_file(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[derive(Default)]
    struct RecordingManager {
        calls: RefCell<Vec<(usize, OutputProfile)>>,
    }

    impl ColorManager for RecordingManager {
        fn transform(
            &self,
            pixels: &mut [u16],
            input: &IccProfile,
            output: &OutputProfile,
            _intent: RenderingIntent,
        ) -> Result<()> {
            self.calls.borrow_mut().push((input.len(), output.clone()));
            pixels.iter_mut().for_each(|p| *p = p.saturating_add(1));
            Ok(())
        }
    }

    fn image() -> RgbImage {
        RgbImage::new(1, 1, vec![1, 2, 3]).unwrap()
    }

    #[test]
    fn test_read_drops_trailing_bytes() {
        let mut bytes = fake_profile(200, 7);
        bytes.extend_from_slice(&[0xff; 10]);
        let file = profile_file(&bytes);
        let profile = IccProfile::read(file.path()).unwrap();
        assert_eq!(profile.len(), 200);
    }

    #[test]
    fn test_read_rejects_truncated_profile() {
        let bytes = fake_profile(200, 7);
        let file = profile_file(&bytes[..150]);
        assert!(matches!(
            IccProfile::read(file.path()),
            Err(ProcessError::ProfileReadError { .. })
        ));
        let file = profile_file(&[0, 0]);
        assert!(IccProfile::read(file.path()).is_err());
    }

    #[test]
    fn test_read_missing_file() {
        assert!(matches!(
            IccProfile::read("/nonexistent/profile.icc"),
            Err(ProcessError::ProfileReadError { .. })
        ));
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!("srgb".parse::<ProfileTarget>().unwrap(), ProfileTarget::Srgb);
        assert_eq!("sRGB".parse::<ProfileTarget>().unwrap(), ProfileTarget::Srgb);
        assert_eq!(
            "out.icc".parse::<ProfileTarget>().unwrap(),
            ProfileTarget::File(PathBuf::from("out.icc"))
        );
    }

    #[test]
    fn test_no_profiles_passes_through() {
        let manager = RecordingManager::default();
        let out = ProfileAttacher::new(&manager, RenderingIntent::Perceptual)
            .attach(image(), None, Some(&ProfileTarget::Srgb))
            .unwrap();
        assert!(out.profile.is_none());
        assert_eq!(out.image.data, vec![1, 2, 3]);
        assert!(manager.calls.borrow().is_empty());
    }

    #[test]
    fn test_input_only_attaches_without_conversion() {
        let file = profile_file(&fake_profile(128, 1));
        let manager = RecordingManager::default();
        let out = ProfileAttacher::new(&manager, RenderingIntent::Perceptual)
            .attach(image(), Some(file.path()), None)
            .unwrap();
        assert_eq!(out.profile.unwrap().len(), 128);
        assert_eq!(out.image.data, vec![1, 2, 3]);
        assert!(manager.calls.borrow().is_empty());
    }

    #[test]
    fn test_conversion_to_srgb_attaches_nothing() {
        let file = profile_file(&fake_profile(128, 1));
        let manager = RecordingManager::default();
        let out = ProfileAttacher::new(&manager, RenderingIntent::Perceptual)
            .attach(image(), Some(file.path()), Some(&ProfileTarget::Srgb))
            .unwrap();
        assert!(out.profile.is_none());
        assert_eq!(out.image.data, vec![2, 3, 4]);
        assert_eq!(manager.calls.borrow()[0], (128, OutputProfile::Srgb));
    }

    #[test]
    fn test_conversion_to_file_attaches_output() {
        let input = profile_file(&fake_profile(128, 1));
        let output = profile_file(&fake_profile(256, 2));
        let manager = RecordingManager::default();
        let target = ProfileTarget::File(output.path().to_path_buf());
        let out = ProfileAttacher::new(&manager, RenderingIntent::Saturation)
            .attach(image(), Some(input.path()), Some(&target))
            .unwrap();
        assert_eq!(out.profile.unwrap().as_bytes(), fake_profile(256, 2).as_slice());
    }

    #[test]
    fn test_missing_output_profile_aborts() {
        let input = profile_file(&fake_profile(128, 1));
        let manager = RecordingManager::default();
        let target = ProfileTarget::File(PathBuf::from("/nonexistent/out.icc"));
        let result = ProfileAttacher::new(&manager, RenderingIntent::Perceptual).attach(
            image(),
            Some(input.path()),
            Some(&target),
        );
        assert!(matches!(result, Err(ProcessError::ProfileReadError { .. })));
    }
}
