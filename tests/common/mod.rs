#![allow(dead_code)]

use std::sync::Mutex;

use negproc_rs::image_pipeline::tiff::tags::FieldType;
use negproc_rs::image_pipeline::{
    CaptureMetadata, DecodeOptions, DecodedCapture, RawFrameSource, Result, SensorFrame,
};

/// One decoded IFD entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u32,
    pub value: [u8; 4],
}

impl Entry {
    /// Declared field type, `None` for codes the header builder never writes.
    pub fn field_type(&self) -> Option<FieldType> {
        FieldType::from_u16(self.field_type)
    }

    pub fn offset(&self) -> usize {
        u32::from_be_bytes(self.value) as usize
    }
}

pub fn be16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

pub fn be32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Reads the big-endian IFD starting at `offset`.
pub fn parse_ifd(bytes: &[u8], offset: usize) -> Vec<Entry> {
    let count = be16(bytes, offset) as usize;
    (0..count)
        .map(|i| {
            let at = offset + 2 + 12 * i;
            Entry {
                tag: be16(bytes, at),
                field_type: be16(bytes, at + 2),
                count: be32(bytes, at + 4),
                value: [bytes[at + 8], bytes[at + 9], bytes[at + 10], bytes[at + 11]],
            }
        })
        .collect()
}

pub fn find(entries: &[Entry], tag: u16) -> Option<Entry> {
    entries.iter().copied().find(|e| e.tag == tag)
}

pub fn rationals(bytes: &[u8], entry: &Entry) -> Vec<(u32, u32)> {
    let at = entry.offset();
    (0..entry.count as usize)
        .map(|i| (be32(bytes, at + 8 * i), be32(bytes, at + 8 * i + 4)))
        .collect()
}

pub fn ascii(bytes: &[u8], entry: &Entry) -> String {
    let len = entry.count as usize - 1;
    let raw = if entry.count <= 4 {
        entry.value[..len].to_vec()
    } else {
        bytes[entry.offset()..entry.offset() + len].to_vec()
    };
    String::from_utf8(raw).unwrap()
}

/// Reader handing out prepared captures; the first input byte picks one.
pub struct FixtureReader {
    pub captures: Vec<SensorFrame>,
    pub metadata: CaptureMetadata,
    pub options: Mutex<Vec<DecodeOptions>>,
}

impl FixtureReader {
    pub fn new(captures: Vec<SensorFrame>) -> Self {
        Self {
            captures,
            metadata: CaptureMetadata::default(),
            options: Mutex::new(Vec::new()),
        }
    }
}

impl RawFrameSource for FixtureReader {
    fn read_capture(&self, data: &[u8], options: &DecodeOptions) -> Result<DecodedCapture> {
        self.options.lock().unwrap().push(*options);
        let index = data.first().copied().unwrap_or(0) as usize;
        Ok(DecodedCapture {
            frame: self.captures[index].clone(),
            metadata: self.metadata.clone(),
        })
    }
}
