use crate::image_pipeline::common::error::Result;
use crate::image_pipeline::raw::types::{DecodeOptions, DecodedCapture};

/// Source of decoded captures. Implementations must be callable from several
/// threads at once: pixel-shift captures are decoded in parallel.
pub trait RawFrameSource: Sync {
    fn read_capture(&self, data: &[u8], options: &DecodeOptions) -> Result<DecodedCapture>;
}
