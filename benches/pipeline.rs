use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use negproc_rs::image_pipeline::raw::{CfaPattern, FrameSamples};
use negproc_rs::image_pipeline::{
    CaptureMetadata, CoefficientRows, PixelTransformer, RgbImage, SONY_FOUR_SHOT, SensorFrame,
    TiffHeaderBuilder, calibrate, merge_pixel_shift,
};

fn mock_mosaic(width: usize, height: usize, seed: usize) -> SensorFrame {
    let samples = (0..width * height)
        .map(|i| ((i * 7 + seed * 131) % 16384) as u16)
        .collect();
    SensorFrame {
        width,
        height,
        cfa: CfaPattern::RGGB,
        white_level: 16383,
        samples: FrameSamples::Mosaic(samples),
    }
}

fn mock_rgb(width: usize, height: usize) -> RgbImage {
    let data = (0..width * height * 3).map(|i| (i % 65536) as u16).collect();
    RgbImage { width, height, data }
}

fn benchmark_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("pixel_shift_merge");

    for (width, height, label) in [(256, 256, "256x256"), (1024, 1024, "1024x1024")] {
        let frames: Vec<SensorFrame> = (0..4).map(|i| mock_mosaic(width, height, i)).collect();
        group.bench_with_input(BenchmarkId::from_parameter(label), &frames, |b, frames| {
            b.iter(|| {
                let frames = [
                    frames[0].clone(),
                    frames[1].clone(),
                    frames[2].clone(),
                    frames[3].clone(),
                ];
                let _ = merge_pixel_shift(black_box(frames), &SONY_FOUR_SHOT);
            });
        });
    }

    group.finish();
}

fn benchmark_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("pixel_transform");
    let coefficients = CoefficientRows {
        r: [1.1, -0.05, -0.02],
        g: [-0.1, 1.2, -0.1],
        b: [0.0, -0.3, 1.4],
    };
    let matrix = calibrate(
        &coefficients,
        1.0,
        Some([8000.0, 16000.0, 12000.0]),
        Some([9000.0, 17000.0, 15000.0]),
    )
    .unwrap_or_else(|_| negproc_rs::image_pipeline::CorrectionMatrix::identity());

    for (gamma, label) in [(1.0, "linear"), (2.2, "gamma")] {
        let image = mock_rgb(1024, 1024);
        let transformer = PixelTransformer::new(&matrix).with_gamma(gamma);
        group.bench_with_input(BenchmarkId::from_parameter(label), &image, |b, image| {
            b.iter(|| transformer.apply(black_box(image)));
        });
    }

    group.finish();
}

fn benchmark_header(c: &mut Criterion) {
    let image = mock_rgb(16, 16);
    let metadata = CaptureMetadata {
        make: "Sony".to_string(),
        model: "ILCE-7RM4".to_string(),
        ..Default::default()
    };
    c.bench_function("tiff_header", |b| {
        b.iter(|| TiffHeaderBuilder::new(black_box(&image), &metadata).profile_len(3144).build());
    });
}

criterion_group!(benches, benchmark_merge, benchmark_transform, benchmark_header);
criterion_main!(benches);
