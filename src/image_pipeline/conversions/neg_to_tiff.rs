use std::io::Write;
use std::path::Path;

use rayon::prelude::*;
use tracing::{info, instrument, warn};

use crate::image_pipeline::{
    color::{
        ColorManager, IccProfile, LcmsColorManager, PixelTransformer, ProfileAttacher, calibrate,
    },
    common::error::{ProcessError, Result},
    conversions::{
        config::ProcessConfig,
        timing::{PipelineTimings, Step, Timer},
    },
    debayer::RgbImage,
    merge::merge_pixel_shift,
    raw::{
        CaptureMetadata, DecodeOptions, DecodedCapture, RawFrameSource, RawLoaderReader,
        SensorFrame,
    },
    tiff::{StandardTiffWriter, TiffHeader, TiffHeaderBuilder, TiffWriter},
};

/// Number of captures that selects the pixel-shift merge.
pub const PIXEL_SHIFT_CAPTURES: usize = 4;

/// Fully processed output, ready to be written.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub image: RgbImage,
    pub profile: Option<IccProfile>,
    pub header: TiffHeader,
    pub metadata: CaptureMetadata,
}

/// Pipeline from one or four RAW negatives to a calibrated positive TIFF.
pub struct NegativeToTiffPipeline<R: RawFrameSource, C: ColorManager, W: TiffWriter> {
    reader: R,
    color_manager: C,
    writer: W,
    config: ProcessConfig,
}

impl NegativeToTiffPipeline<RawLoaderReader, LcmsColorManager, StandardTiffWriter> {
    pub fn new(config: ProcessConfig) -> Self {
        Self {
            reader: RawLoaderReader,
            color_manager: LcmsColorManager,
            writer: StandardTiffWriter,
            config,
        }
    }
}

impl<R: RawFrameSource, C: ColorManager, W: TiffWriter> NegativeToTiffPipeline<R, C, W> {
    pub fn with_custom(reader: R, color_manager: C, writer: W, config: ProcessConfig) -> Self {
        Self {
            reader,
            color_manager,
            writer,
            config,
        }
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    fn validate_dimensions(width: usize, height: usize) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(ProcessError::InvalidDimensions(width, height));
        }
        Ok(())
    }

    /// Decodes four captures in parallel and merges them. Returns the merged
    /// image, the metadata of the first capture and the factor that expands
    /// the sensor's bit depth to 16 bits.
    fn merge_captures<D: AsRef<[u8]> + Sync>(
        &self,
        inputs: &[D],
        timings: &mut PipelineTimings,
    ) -> Result<(RgbImage, CaptureMetadata, f32)> {
        let options = DecodeOptions {
            quality: self.config.decode.quality,
            ..DecodeOptions::pixel_shift()
        };

        let reader = &self.reader;
        let timer = Timer::start(Step::Decode);
        let captures = {
            let _span = tracing::info_span!("decode_raw", captures = inputs.len()).entered();
            inputs
                .par_iter()
                .map(|data| reader.read_capture(data.as_ref(), &options))
                .collect::<Result<Vec<DecodedCapture>>>()?
        };
        timings.record(timer);

        let metadata = captures
            .first()
            .map(|c| c.metadata.clone())
            .unwrap_or_default();
        let frames: Vec<SensorFrame> = captures.into_iter().map(|c| c.frame).collect();
        let frames: [SensorFrame; PIXEL_SHIFT_CAPTURES] =
            frames.try_into().map_err(|v: Vec<SensorFrame>| {
                ProcessError::CaptureMismatch(format!("expected 4 captures, got {}", v.len()))
            })?;

        let bits = frames[0].bits_per_sample().clamp(1, 16);
        let expansion = (1u32 << (16 - bits)) as f32;
        info!("Pixel-shift merge of {}-bit captures", bits);

        let timer = Timer::start(Step::Merge);
        let merged = merge_pixel_shift(frames, &self.config.movements)?;
        timings.record(timer);

        Ok((merged, metadata, expansion))
    }

    fn decode_single(
        &self,
        data: &[u8],
        timings: &mut PipelineTimings,
    ) -> Result<(RgbImage, CaptureMetadata)> {
        let options = DecodeOptions {
            demosaic: true,
            ..self.config.decode
        };

        let timer = Timer::start(Step::Decode);
        let capture = {
            let _span = tracing::info_span!("decode_raw", input_size = data.len()).entered();
            self.reader.read_capture(data, &options)?
        };
        timings.record(timer);

        let image = capture.frame.into_rgb()?;
        Ok((image, capture.metadata))
    }

    /// Runs every step up to and including the header, without writing.
    #[instrument(skip_all, fields(captures = inputs.len()))]
    pub fn process<D: AsRef<[u8]> + Sync>(
        &self,
        inputs: &[D],
        timings: &mut PipelineTimings,
    ) -> Result<ProcessedImage> {
        let config = &self.config;

        let (image, metadata, expansion) = match inputs.len() {
            0 => return Err(ProcessError::InputReadError("no input captures".to_string())),
            PIXEL_SHIFT_CAPTURES => self.merge_captures(inputs, timings)?,
            n if n < PIXEL_SHIFT_CAPTURES => {
                if n > 1 {
                    warn!(
                        "{} captures given, pixel-shift needs {}; processing the first only",
                        n, PIXEL_SHIFT_CAPTURES
                    );
                }
                let (image, metadata) = self.decode_single(inputs[0].as_ref(), timings)?;
                (image, metadata, 1.0)
            }
            n => {
                return Err(ProcessError::InputReadError(format!(
                    "{} captures given, at most {} are supported",
                    n, PIXEL_SHIFT_CAPTURES
                )));
            }
        };

        Self::validate_dimensions(image.width, image.height)?;
        info!(
            iso = metadata.iso_speed,
            shutter = metadata.shutter,
            aperture = metadata.aperture,
            "{} {} {}x{}",
            metadata.make,
            metadata.model,
            image.width,
            image.height
        );

        let timer = Timer::start(Step::Calibrate);
        let matrix = {
            let _span = tracing::info_span!("calibrate").entered();
            calibrate(
                &config.coefficients,
                config.exposure_comp,
                config.film_base,
                config.profile_film_base,
            )?
            .scaled(expansion)
        };
        timings.record(timer);
        for (name, row) in ["r", "g", "b"].iter().zip(matrix.rows.iter()) {
            info!("{}: {:.5} {:.5} {:.5}", name, row[0], row[1], row[2]);
        }

        let timer = Timer::start(Step::Transform);
        let corrected = PixelTransformer::new(&matrix)
            .with_gamma(config.post_correction_gamma)
            .apply(&image);
        drop(image);
        timings.record(timer);

        let timer = Timer::start(Step::Profile);
        let profiled = ProfileAttacher::new(&self.color_manager, config.intent).attach(
            corrected,
            config.input_profile.as_deref(),
            config.output_profile.as_ref(),
        )?;
        timings.record(timer);

        let timer = Timer::start(Step::Header);
        let header = {
            let _span = tracing::info_span!("build_header").entered();
            let (width, height) = config.output_size.unwrap_or((0, 0));
            TiffHeaderBuilder::new(&profiled.image, &metadata)
                .output_size(width, height)
                .profile_len(profiled.profile.as_ref().map_or(0, IccProfile::len))
                .build()?
        };
        timings.record(timer);

        Ok(ProcessedImage {
            image: profiled.image,
            profile: profiled.profile,
            header,
            metadata,
        })
    }

    fn write(
        &self,
        processed: &ProcessedImage,
        output: &mut dyn Write,
        timings: &mut PipelineTimings,
    ) -> Result<()> {
        let timer = Timer::start(Step::Write);
        {
            let _span = tracing::info_span!("encode_tiff").entered();
            self.writer.write_tiff(
                &processed.header,
                &processed.image,
                processed.profile.as_ref(),
                output,
            )?;
        }
        timings.record(timer);
        Ok(())
    }

    pub fn convert<D: AsRef<[u8]> + Sync>(&self, inputs: &[D], output: &mut dyn Write) -> Result<()> {
        self.convert_with_timings(inputs, output).map(|_| ())
    }

    pub fn convert_with_timings<D: AsRef<[u8]> + Sync>(
        &self,
        inputs: &[D],
        output: &mut dyn Write,
    ) -> Result<PipelineTimings> {
        let mut timings = PipelineTimings::new();
        info!("Starting negative to TIFF conversion");

        let processed = self.process(inputs, &mut timings)?;
        self.write(&processed, output, &mut timings)?;

        info!(
            "Conversion complete: {}x{} in {:.3}ms",
            processed.image.width,
            processed.image.height,
            timings.total_duration().as_secs_f64() * 1000.0
        );
        timings.log_summary();
        Ok(timings)
    }

    /// Reads the captures, processes them and only then creates `output_path`.
    #[instrument(skip(self, input_paths, output_path))]
    pub fn convert_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input_paths: &[P],
        output_path: Q,
    ) -> Result<PipelineTimings> {
        let output_path = output_path.as_ref();
        let mut timings = PipelineTimings::new();

        let timer = Timer::start(Step::ReadInput);
        let inputs = input_paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                info!(input = %path.display(), "Reading capture");
                std::fs::read(path).map_err(|e| {
                    ProcessError::InputReadError(format!("{}: {}", path.display(), e))
                })
            })
            .collect::<Result<Vec<Vec<u8>>>>()?;
        timings.record(timer);

        let processed = self.process(&inputs, &mut timings)?;
        drop(inputs);

        let output_file = {
            let _span = tracing::info_span!("create_output_file").entered();
            std::fs::File::create(output_path).map_err(|e| {
                ProcessError::OutputWriteError(format!("{}: {}", output_path.display(), e))
            })?
        };
        let mut output = std::io::BufWriter::new(output_file);
        self.write(&processed, &mut output, &mut timings)?;

        info!(
            output = %output_path.display(),
            "Wrote {}x{} in {:.3}ms",
            processed.image.width,
            processed.image.height,
            timings.total_duration().as_secs_f64() * 1000.0
        );
        timings.log_summary();
        Ok(timings)
    }
}
