use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use negproc_rs::image_pipeline::{
    CoefficientRows, DebayerQuality, DecodeOptions, NegativeToTiffPipeline, ProcessConfig,
    ProfileTarget, RenderingIntent,
};
use negproc_rs::logger;
use tracing::info;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Quality {
    Nearest,
    Linear,
    Cubic,
}

impl From<Quality> for DebayerQuality {
    fn from(quality: Quality) -> Self {
        match quality {
            Quality::Nearest => DebayerQuality::Nearest,
            Quality::Linear => DebayerQuality::Linear,
            Quality::Cubic => DebayerQuality::Cubic,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Intent {
    Perceptual,
    Relative,
    Saturation,
    Absolute,
}

impl From<Intent> for RenderingIntent {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Perceptual => RenderingIntent::Perceptual,
            Intent::Relative => RenderingIntent::RelativeColorimetric,
            Intent::Saturation => RenderingIntent::Saturation,
            Intent::Absolute => RenderingIntent::AbsoluteColorimetric,
        }
    }
}

/// Process RAW captures of film negatives into calibrated TIFF files.
///
/// Four captures are combined assuming a Sony 4-shot pixel-shift sequence.
#[derive(Parser, Debug)]
#[command(name = "negproc")]
#[command(version, about, long_about = None)]
struct Cli {
    /// RAW files; exactly four selects the pixel-shift merge
    #[arg(value_name = "RAW", required = true, num_args = 1..=4)]
    inputs: Vec<PathBuf>,

    /// Output TIFF file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Half-size decode (bin each 2x2 cell)
    #[arg(short = 'H', long)]
    half_size: bool,

    /// Keep the full sensor area instead of the decoder's crop box
    #[arg(short = 'C', long)]
    no_crop: bool,

    /// Demosaic quality
    #[arg(short, long, value_enum, default_value = "linear")]
    quality: Quality,

    /// Corrected R as dot product of this vector and linear RAW R G B
    #[arg(short, num_args = 3, value_names = ["R", "G", "B"], allow_negative_numbers = true)]
    r: Option<Vec<f32>>,

    /// Corrected G as dot product of this vector and linear RAW R G B
    #[arg(short, num_args = 3, value_names = ["R", "G", "B"], allow_negative_numbers = true)]
    g: Option<Vec<f32>>,

    /// Corrected B as dot product of this vector and linear RAW R G B
    #[arg(short, num_args = 3, value_names = ["R", "G", "B"], allow_negative_numbers = true)]
    b: Option<Vec<f32>>,

    /// Raw film-base reading of this negative
    #[arg(long, num_args = 3, value_names = ["R", "G", "B"])]
    film_base_rgb: Option<Vec<f32>>,

    /// Raw film-base reading the ICC profile was built from
    #[arg(long, num_args = 3, value_names = ["R", "G", "B"])]
    profile_film_base_rgb: Option<Vec<f32>>,

    /// Global brightness scale
    #[arg(short = 'E', long, value_name = "FLOAT", default_value_t = 1.0)]
    exposure_comp: f32,

    /// Gamma applied after color correction
    #[arg(short = 'G', long, value_name = "FLOAT", default_value_t = 1.0)]
    post_correction_gamma: f32,

    /// ICC profile of the corrected RGB values
    #[arg(short = 'p', long, value_name = "FILE")]
    profile: Option<PathBuf>,

    /// Convert to `srgb` or to the given ICC profile
    #[arg(short = 'P', long, value_name = "srgb|FILE")]
    colorspace: Option<ProfileTarget>,

    /// Rendering intent of the profile conversion
    #[arg(long, value_enum, default_value = "perceptual")]
    intent: Intent,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn triple(values: Option<Vec<f32>>, default: [f32; 3]) -> [f32; 3] {
    match values.as_deref() {
        Some(&[a, b, c]) => [a, b, c],
        _ => default,
    }
}

fn rgb(values: Option<Vec<f32>>) -> Option<[f32; 3]> {
    match values.as_deref() {
        Some(&[a, b, c]) => Some([a, b, c]),
        _ => None,
    }
}

impl Cli {
    fn config(self) -> ProcessConfig {
        let identity = CoefficientRows::IDENTITY;
        let coefficients = CoefficientRows {
            r: triple(self.r, identity.r),
            g: triple(self.g, identity.g),
            b: triple(self.b, identity.b),
        };
        ProcessConfig::builder()
            .decode(DecodeOptions {
                half_size: self.half_size,
                crop: !self.no_crop,
                quality: self.quality.into(),
                ..DecodeOptions::default()
            })
            .coefficients(coefficients)
            .exposure_comp(self.exposure_comp)
            .film_base(rgb(self.film_base_rgb))
            .profile_film_base(rgb(self.profile_film_base_rgb))
            .post_correction_gamma(self.post_correction_gamma)
            .input_profile(self.profile)
            .output_profile(self.colorspace)
            .intent(self.intent.into())
            .build()
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let inputs = cli.inputs.clone();
    let output = cli.output.clone();

    info!("Starting negproc...");
    let pipeline = NegativeToTiffPipeline::new(cli.config());

    let config = pipeline.config();
    info!("Decode: {:?}", config.decode);
    info!("Coefficients: {:?}", config.coefficients);

    pipeline
        .convert_files(&inputs, &output)
        .with_context(|| format!("failed to convert into {}", output.display()))?;

    info!("Conversion successful!");
    Ok(())
}
