//! Two-phase TIFF directory construction.
//!
//! Tags are first recorded into a [`Directory`] together with an arena of
//! out-of-line data whose final position is not yet known. Pointers between
//! directories and to the ICC profile or pixel data are kept symbolic as
//! [`Anchor`]s. [`assemble`] then lays every directory and arena out after
//! the 8-byte big-endian file header and resolves all offsets.

use crate::image_pipeline::common::error::{ProcessError, Result};
use crate::image_pipeline::tiff::tags::FieldType;

/// Bytes in the "MM" byte-order mark, magic number and first-IFD offset.
pub const FILE_HEADER_LEN: usize = 8;

const ENTRY_LEN: usize = 12;

/// A location that is only known once the whole header is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    ExifIfd,
    GpsIfd,
    /// First byte after the header, where the ICC profile goes.
    HeaderEnd,
    /// First byte of the pixel strip.
    PixelData,
}

/// What the caller hands to [`Directory::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    /// An immediate value, packed per the field type.
    Value(u32),
    /// Offset of previously stashed bytes in this directory's arena.
    Extra(u32),
    Anchor(Anchor),
}

/// The 4-byte value slot of an entry before offsets are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagValue {
    Inline([u8; 4]),
    Extra(u32),
    Anchor(Anchor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagRecord {
    pub tag: u16,
    pub field_type: FieldType,
    pub count: u32,
    pub value: TagValue,
}

/// One image file directory and its out-of-line data.
#[derive(Debug, Clone, Default)]
pub struct Directory {
    records: Vec<TagRecord>,
    extra: Vec<u8>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[TagRecord] {
        &self.records
    }

    pub fn extra(&self) -> &[u8] {
        &self.extra
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Encoded size of the IFD itself: entry count, entries, next-IFD offset.
    pub fn encoded_len(&self) -> usize {
        2 + ENTRY_LEN * self.records.len() + 4
    }

    /// Copies `bytes` into the arena on an even offset and returns that offset.
    pub fn stash(&mut self, bytes: &[u8]) -> u32 {
        if self.extra.len() % 2 == 1 {
            self.extra.push(0);
        }
        let offset = self.extra.len() as u32;
        self.extra.extend_from_slice(bytes);
        offset
    }

    /// Records one entry. Tag ids must be strictly increasing.
    ///
    /// Immediate values are packed into the 4-byte slot: BYTE values one
    /// byte per element starting from the low byte, SHORT values as one or
    /// two big-endian shorts starting from the low half. ASCII values must be
    /// stashed first; `count` is the maximum length including the
    /// terminator and the recorded count is the actual length plus one.
    pub fn append(
        &mut self,
        tag: u16,
        field_type: FieldType,
        count: u32,
        source: TagSource,
    ) -> Result<()> {
        if let Some(previous) = self.records.last() {
            if tag <= previous.tag {
                return Err(ProcessError::TagOrder {
                    previous: previous.tag,
                    tag,
                });
            }
        }

        let (count, value) = match (field_type, source) {
            (FieldType::Ascii, TagSource::Extra(offset)) => self.ascii_value(tag, count, offset)?,
            (FieldType::Ascii, _) => {
                return Err(ProcessError::HeaderError(format!(
                    "ASCII tag {} must reference stashed text",
                    tag
                )));
            }
            (_, TagSource::Value(v)) => {
                if count as usize * field_type.size() > 4 {
                    return Err(ProcessError::HeaderError(format!(
                        "tag {}: {} x {:?} does not fit inline",
                        tag, count, field_type
                    )));
                }
                (count, TagValue::Inline(pack_inline(field_type, v)))
            }
            (_, TagSource::Extra(offset)) => {
                let end = offset as usize + count as usize * field_type.size();
                if end > self.extra.len() {
                    return Err(ProcessError::HeaderError(format!(
                        "tag {} references {} bytes past the arena",
                        tag,
                        end - self.extra.len()
                    )));
                }
                (count, TagValue::Extra(offset))
            }
            (_, TagSource::Anchor(anchor)) => (count, TagValue::Anchor(anchor)),
        };

        self.records.push(TagRecord {
            tag,
            field_type,
            count,
            value,
        });
        Ok(())
    }

    fn ascii_value(&self, tag: u16, limit: u32, offset: u32) -> Result<(u32, TagValue)> {
        if limit == 0 {
            return Err(ProcessError::HeaderError(format!("ASCII tag {} has zero length", tag)));
        }
        let start = (offset as usize).min(self.extra.len());
        let text = &self.extra[start..];
        let bound = text.len().min(limit as usize - 1);
        let len = text[..bound].iter().position(|&b| b == 0).unwrap_or(bound);
        let count = len as u32 + 1;

        if count <= 4 {
            let mut inline = [0u8; 4];
            inline[..len].copy_from_slice(&text[..len]);
            Ok((count, TagValue::Inline(inline)))
        } else {
            Ok((count, TagValue::Extra(offset)))
        }
    }

    pub fn append_short(&mut self, tag: u16, value: u16) -> Result<()> {
        self.append(tag, FieldType::Short, 1, TagSource::Value(value as u32))
    }

    pub fn append_long(&mut self, tag: u16, value: u32) -> Result<()> {
        self.append(tag, FieldType::Long, 1, TagSource::Value(value))
    }

    /// SHORT array, inline when it fits.
    pub fn append_shorts(&mut self, tag: u16, values: &[u16]) -> Result<()> {
        let count = values.len() as u32;
        if values.len() <= 2 {
            let packed = values
                .iter()
                .enumerate()
                .fold(0u32, |acc, (i, &v)| acc | (v as u32) << (16 * i));
            return self.append(tag, FieldType::Short, count, TagSource::Value(packed));
        }
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        let offset = self.stash(&bytes);
        self.append(tag, FieldType::Short, count, TagSource::Extra(offset))
    }

    /// ASCII string truncated to `limit - 1` characters plus terminator.
    pub fn append_ascii(&mut self, tag: u16, text: &str, limit: u32) -> Result<()> {
        let keep = text.len().min(limit.saturating_sub(1) as usize);
        let mut bytes = text.as_bytes()[..keep].to_vec();
        bytes.push(0);
        let offset = self.stash(&bytes);
        self.append(tag, FieldType::Ascii, limit, TagSource::Extra(offset))
    }

    pub fn append_rationals(&mut self, tag: u16, values: &[(u32, u32)]) -> Result<()> {
        let bytes: Vec<u8> = values
            .iter()
            .flat_map(|(n, d)| n.to_be_bytes().into_iter().chain(d.to_be_bytes()))
            .collect();
        let offset = self.stash(&bytes);
        self.append(tag, FieldType::Rational, values.len() as u32, TagSource::Extra(offset))
    }

    pub fn append_anchor(&mut self, tag: u16, field_type: FieldType, count: u32, anchor: Anchor) -> Result<()> {
        self.append(tag, field_type, count, TagSource::Anchor(anchor))
    }
}

fn pack_inline(field_type: FieldType, value: u32) -> [u8; 4] {
    match field_type {
        FieldType::Byte | FieldType::Ascii | FieldType::Undefined => value.to_le_bytes(),
        FieldType::Short => {
            let [a, b] = (value as u16).to_be_bytes();
            let [c, d] = ((value >> 16) as u16).to_be_bytes();
            [a, b, c, d]
        }
        FieldType::Long | FieldType::Rational => value.to_be_bytes(),
    }
}

fn align_even(pos: usize) -> usize {
    pos + (pos & 1)
}

fn to_offset(pos: usize) -> Result<u32> {
    u32::try_from(pos).map_err(|_| ProcessError::HeaderError(format!("offset {} exceeds 4 GiB", pos)))
}

/// Directories making up one header. IFD0 comes first and links to the
/// others through [`Anchor::ExifIfd`] and [`Anchor::GpsIfd`] entries.
#[derive(Debug, Clone, Default)]
pub struct HeaderDirectories {
    pub primary: Directory,
    pub exif: Option<Directory>,
    pub gps: Option<Directory>,
}

/// A serialized header plus the resolved positions of its trailing sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledHeader {
    pub bytes: Vec<u8>,
    pub profile_offset: u32,
    pub pixel_offset: u32,
}

/// Lays out and serializes the directories. The ICC profile of
/// `profile_len` bytes follows the header directly and pixel data follows
/// the profile.
pub fn assemble(directories: &HeaderDirectories, profile_len: usize) -> Result<AssembledHeader> {
    let ordered: Vec<&Directory> = std::iter::once(&directories.primary)
        .chain(directories.exif.as_ref())
        .chain(directories.gps.as_ref())
        .collect();

    let mut pos = FILE_HEADER_LEN;
    let mut ifd_offsets = Vec::with_capacity(ordered.len());
    for dir in &ordered {
        ifd_offsets.push(pos);
        pos += dir.encoded_len();
    }
    let mut arena_offsets = Vec::with_capacity(ordered.len());
    for dir in &ordered {
        pos = align_even(pos);
        arena_offsets.push(pos);
        pos += dir.extra.len();
    }
    let header_len = align_even(pos);

    let exif_pos = directories.exif.as_ref().map(|_| ifd_offsets[1]);
    let gps_pos = directories
        .gps
        .as_ref()
        .map(|_| ifd_offsets[ordered.len() - 1]);
    let resolve = |anchor: Anchor| -> Result<u32> {
        let pos = match anchor {
            Anchor::ExifIfd => exif_pos,
            Anchor::GpsIfd => gps_pos,
            Anchor::HeaderEnd => Some(header_len),
            Anchor::PixelData => Some(header_len + profile_len),
        };
        pos.ok_or_else(|| ProcessError::HeaderError(format!("{:?} points at a missing directory", anchor)))
            .and_then(to_offset)
    };

    let mut bytes = Vec::with_capacity(header_len);
    bytes.extend_from_slice(b"MM");
    bytes.extend_from_slice(&42u16.to_be_bytes());
    bytes.extend_from_slice(&(FILE_HEADER_LEN as u32).to_be_bytes());

    for (dir, arena) in ordered.iter().zip(&arena_offsets) {
        bytes.extend_from_slice(&(dir.records.len() as u16).to_be_bytes());
        for record in &dir.records {
            bytes.extend_from_slice(&record.tag.to_be_bytes());
            bytes.extend_from_slice(&(record.field_type as u16).to_be_bytes());
            bytes.extend_from_slice(&record.count.to_be_bytes());
            let value = match record.value {
                TagValue::Inline(raw) => raw,
                TagValue::Extra(offset) => to_offset(arena + offset as usize)?.to_be_bytes(),
                TagValue::Anchor(anchor) => resolve(anchor)?.to_be_bytes(),
            };
            bytes.extend_from_slice(&value);
        }
        bytes.extend_from_slice(&0u32.to_be_bytes());
    }
    for (dir, arena) in ordered.iter().zip(&arena_offsets) {
        bytes.resize(*arena, 0);
        bytes.extend_from_slice(&dir.extra);
    }
    bytes.resize(header_len, 0);

    Ok(AssembledHeader {
        bytes,
        profile_offset: resolve(Anchor::HeaderEnd)?,
        pixel_offset: resolve(Anchor::PixelData)?,
    })
}
