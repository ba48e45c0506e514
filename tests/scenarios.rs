mod common;

use std::io::Cursor;

use common::{FixtureReader, ascii, be16, be32, find, parse_ifd, rationals};
use negproc_rs::image_pipeline::raw::{CfaPattern, FrameSamples};
use negproc_rs::image_pipeline::tiff::directory::{HeaderDirectories, TagSource, assemble};
use negproc_rs::image_pipeline::tiff::tags::{self, FieldType};
use negproc_rs::image_pipeline::tiff::Directory;
use negproc_rs::image_pipeline::{
    CaptureMetadata, CoefficientRows, GpsData, LcmsColorManager, NegativeToTiffPipeline,
    ProcessConfig, RgbImage, SensorFrame, StandardTiffWriter, TiffHeaderBuilder, calibrate,
};

fn rgb_frame(width: usize, height: usize) -> SensorFrame {
    let data = (0..width * height * 3).map(|i| (i * 1000) as u16).collect();
    SensorFrame {
        width,
        height,
        cfa: CfaPattern::RGGB,
        white_level: u16::MAX,
        samples: FrameSamples::Rgb(data),
    }
}

const BASES: [u16; 4] = [100, 2000, 30000, 7000];

/// Capture `i` holds `BASES[i] + filter index` at every site.
fn marker_frame(index: usize, width: usize, height: usize) -> SensorFrame {
    let cfa = CfaPattern::RGGB;
    let samples = (0..height)
        .flat_map(|row| (0..width).map(move |col| BASES[index] + cfa.color_at(row, col) as u16))
        .collect();
    SensorFrame {
        width,
        height,
        cfa,
        white_level: u16::MAX,
        samples: FrameSamples::Mosaic(samples),
    }
}

fn run(reader: FixtureReader, inputs: &[Vec<u8>], config: ProcessConfig) -> Vec<u8> {
    let pipeline =
        NegativeToTiffPipeline::with_custom(reader, LcmsColorManager, StandardTiffWriter, config);
    let mut out = Cursor::new(Vec::new());
    pipeline.convert(inputs, &mut out).unwrap();
    out.into_inner()
}

#[test]
fn scenario_single_capture_identity() {
    let frame = rgb_frame(4, 3);
    let FrameSamples::Rgb(source) = frame.samples.clone() else {
        unreachable!()
    };
    let bytes = run(FixtureReader::new(vec![frame]), &[vec![0]], ProcessConfig::default());

    let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes.clone())).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (4, 3));
    assert_eq!(decoder.colortype().unwrap(), tiff::ColorType::RGB(16));
    assert_eq!(
        decoder.get_tag_u32(tiff::tags::Tag::StripByteCounts).unwrap(),
        4 * 3 * 3 * 2
    );
    match decoder.read_image().unwrap() {
        tiff::decoder::DecodingResult::U16(pixels) => assert_eq!(pixels, source),
        other => panic!("unexpected sample format: {:?}", std::mem::discriminant(&other)),
    }

    let ifd0 = parse_ifd(&bytes, be32(&bytes, 4) as usize);
    assert!(find(&ifd0, tags::ICC_PROFILE).is_none());
    assert!(find(&ifd0, tags::GPS_IFD).is_none());
    assert_eq!(ascii(&bytes, &find(&ifd0, tags::SOFTWARE).unwrap()), "negproc");
}

#[test]
fn output_size_override_decodes_as_padded_canvas() {
    let frame = rgb_frame(2, 2);
    let FrameSamples::Rgb(source) = frame.samples.clone() else {
        unreachable!()
    };
    let config = ProcessConfig::builder().output_size(Some((4, 3))).build();
    let bytes = run(FixtureReader::new(vec![frame]), &[vec![0]], config);

    let mut decoder = tiff::decoder::Decoder::new(Cursor::new(bytes)).unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (4, 3));
    let tiff::decoder::DecodingResult::U16(pixels) = decoder.read_image().unwrap() else {
        panic!("expected 16-bit samples");
    };
    assert_eq!(pixels.len(), 4 * 3 * 3);
    let row_len = 4 * 3;
    assert_eq!(&pixels[..6], &source[..6]);
    assert_eq!(&pixels[row_len..row_len + 6], &source[6..12]);
    assert!(pixels[6..row_len].iter().all(|&v| v == 0));
    assert!(pixels[2 * row_len..].iter().all(|&v| v == 0));
}

#[test]
fn scenario_four_capture_merge() {
    let (width, height) = (6, 6);
    let frames = (0..4).map(|i| marker_frame(i, width, height)).collect();
    let reader = FixtureReader::new(frames);
    let inputs: Vec<Vec<u8>> = (0..4u8).map(|i| vec![i]).collect();
    let bytes = run(reader, &inputs, ProcessConfig::default());

    let ifd0 = parse_ifd(&bytes, 8);
    let samples_per_pixel = find(&ifd0, tags::SAMPLES_PER_PIXEL).unwrap();
    assert_eq!(be16(&samples_per_pixel.value, 0), 3);
    let pixels_at = find(&ifd0, tags::STRIP_OFFSETS).unwrap().offset();

    let pixel = |row: usize, col: usize| -> [u16; 3] {
        let at = pixels_at + (row * width + col) * 3 * 2;
        [be16(&bytes, at), be16(&bytes, at + 2), be16(&bytes, at + 4)]
    };
    // red from capture 0, green averaged over captures 1 and 3, blue from capture 2
    assert_eq!(pixel(2, 2), [100, (2003 + 7001) / 2, 30002]);
    assert_eq!(pixel(2, 3), [7000, (101 + 30003) / 2, 2002]);
    // first column and last row of the sources never reach the corner
    assert_eq!(pixel(0, 0)[0], 0);
    assert_eq!(pixel(0, 0)[2], 0);
}

#[test]
fn scenario_calibration_ratio() {
    let matrix = calibrate(
        &CoefficientRows::IDENTITY,
        1.0,
        Some([8000.0, 16000.0, 16000.0]),
        Some([10000.0, 20000.0, 20000.0]),
    )
    .unwrap();
    assert_eq!(matrix.g_scale, (20000.0 / 10000.0) / (16000.0 / 8000.0));
    assert_eq!(matrix.g_scale, 1.0);
    assert_eq!(matrix.b_scale, 1.0);
}

#[test]
fn inline_and_offset_tags_round_trip() {
    let mut dir = Directory::new();
    dir.append(1, FieldType::Byte, 3, TagSource::Value(0x030201)).unwrap();
    dir.append_ascii(2, "abc", 16).unwrap();
    dir.append_shorts(3, &[7, 9]).unwrap();
    let longs = dir.stash(&[0, 0, 0, 5, 0, 1, 0, 0]);
    dir.append(4, FieldType::Long, 2, TagSource::Extra(longs)).unwrap();
    dir.append_rationals(5, &[(1, 3), (22, 7)]).unwrap();

    let header = assemble(
        &HeaderDirectories {
            primary: dir,
            ..Default::default()
        },
        0,
    )
    .unwrap();
    let bytes = header.bytes;
    let entries = parse_ifd(&bytes, 8);

    let ids: Vec<(u16, Option<FieldType>, u32)> = entries
        .iter()
        .map(|e| (e.tag, e.field_type(), e.count))
        .collect();
    assert_eq!(
        ids,
        vec![
            (1, Some(FieldType::Byte), 3),
            (2, Some(FieldType::Ascii), 4),
            (3, Some(FieldType::Short), 2),
            (4, Some(FieldType::Long), 2),
            (5, Some(FieldType::Rational), 2),
        ]
    );

    assert_eq!(entries[0].value, [1, 2, 3, 0]);
    assert_eq!(entries[1].value, *b"abc\0");
    assert_eq!(entries[2].value, [0, 7, 0, 9]);

    let longs_at = entries[3].offset();
    assert_eq!(longs_at % 2, 0);
    assert_eq!(be32(&bytes, longs_at), 5);
    assert_eq!(be32(&bytes, longs_at + 4), 65536);

    assert_eq!(rationals(&bytes, &entries[4]), vec![(1, 3), (22, 7)]);
}

#[test]
fn icc_profile_tag_points_past_header() {
    let image = RgbImage::zeroed(2, 2);
    let meta = CaptureMetadata::default();
    let header = TiffHeaderBuilder::new(&image, &meta).profile_len(200).build().unwrap();
    let bytes = header.as_bytes();

    let ifd0 = parse_ifd(bytes, 8);
    let icc = find(&ifd0, tags::ICC_PROFILE).unwrap();
    assert_eq!(icc.field_type(), Some(FieldType::Undefined));
    assert_eq!(icc.count, 200);
    assert_eq!(icc.offset(), bytes.len());
    assert_eq!(find(&ifd0, tags::STRIP_OFFSETS).unwrap().offset(), bytes.len() + 200);
}

#[test]
fn exif_and_gps_directories() {
    let mut gps = GpsData::default();
    gps.set_latitude(b'N', [(48, 1), (51, 1), (2400, 100)]);
    gps.set_longitude(b'W', [(2, 1), (21, 1), (0, 1)]);
    gps.set_date_stamp("2024:06:01");
    let meta = CaptureMetadata {
        iso_speed: 200.0,
        shutter: 0.5,
        aperture: 8.0,
        focal_length: 50.0,
        model: "A long camera model name".to_string(),
        gps: Some(gps),
        ..Default::default()
    };
    let image = RgbImage::zeroed(4, 4);
    let header = TiffHeaderBuilder::new(&image, &meta).build().unwrap();
    let bytes = header.as_bytes();
    let ifd0 = parse_ifd(bytes, 8);

    assert_eq!(
        ascii(bytes, &find(&ifd0, tags::MODEL).unwrap()),
        "A long camera model name"
    );
    let exif = parse_ifd(bytes, find(&ifd0, tags::EXIF_IFD).unwrap().offset());
    assert_eq!(
        rationals(bytes, &find(&exif, tags::EXPOSURE_TIME).unwrap()),
        vec![(500_000, 1_000_000)]
    );
    assert_eq!(
        rationals(bytes, &find(&exif, tags::F_NUMBER).unwrap()),
        vec![(8_000_000, 1_000_000)]
    );
    assert_eq!(be16(&find(&exif, tags::ISO_SPEED_RATINGS).unwrap().value, 0), 200);

    let gps_ifd = parse_ifd(bytes, find(&ifd0, tags::GPS_IFD).unwrap().offset());
    assert_eq!(find(&gps_ifd, tags::GPS_VERSION_ID).unwrap().value, [2, 2, 0, 0]);
    assert_eq!(ascii(bytes, &find(&gps_ifd, tags::GPS_LATITUDE_REF).unwrap()), "N");
    assert_eq!(ascii(bytes, &find(&gps_ifd, tags::GPS_LONGITUDE_REF).unwrap()), "W");
    assert_eq!(
        rationals(bytes, &find(&gps_ifd, tags::GPS_LATITUDE).unwrap()),
        vec![(48, 1), (51, 1), (2400, 100)]
    );
    assert_eq!(
        ascii(bytes, &find(&gps_ifd, tags::GPS_DATE_STAMP).unwrap()),
        "2024:06:01"
    );
}
