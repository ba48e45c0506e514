//! Merging of pixel-shift capture sequences

mod pixel_shift;

pub use pixel_shift::{Movement, SONY_FOUR_SHOT, merge_pixel_shift};
