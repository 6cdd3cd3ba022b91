//! Mirror transforms used to build orientation variants.
//!
//! Flips are exact pixel permutations, so a flipped template correlates
//! perfectly with an instance placed with the same orientation.

use crate::image::{ImageView, OwnedImage};
use crate::util::ChipMatchResult;

/// Mirrors the image around its vertical axis (left becomes right).
pub fn flip_left_right(src: ImageView<'_, u8>) -> ChipMatchResult<OwnedImage> {
    let width = src.width();
    OwnedImage::from_fn(width, src.height(), |x, y| {
        src.get(width - 1 - x, y).copied().unwrap_or(0)
    })
}

/// Mirrors the image around its horizontal axis (top becomes bottom).
pub fn flip_up_down(src: ImageView<'_, u8>) -> ChipMatchResult<OwnedImage> {
    let height = src.height();
    OwnedImage::from_fn(src.width(), height, |x, y| {
        src.get(x, height - 1 - y).copied().unwrap_or(0)
    })
}

/// Mirrors the image around both axes (a 180 degree turn).
pub fn flip_both(src: ImageView<'_, u8>) -> ChipMatchResult<OwnedImage> {
    let width = src.width();
    let height = src.height();
    OwnedImage::from_fn(width, height, |x, y| {
        src.get(width - 1 - x, height - 1 - y).copied().unwrap_or(0)
    })
}
