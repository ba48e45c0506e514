//! TIFF writing module
//!
//! Builds the big-endian header (IFD0, EXIF and GPS directories) in two
//! phases and writes it followed by the ICC profile and uncompressed pixels.

pub mod directory;
pub mod header;
mod standard_tiff_writer;
pub mod tags;
mod writer;

pub use directory::{Anchor, Directory, HeaderDirectories, TagSource, assemble};
pub use header::{TiffHeader, TiffHeaderBuilder};
pub use standard_tiff_writer::StandardTiffWriter;
pub use writer::TiffWriter;
