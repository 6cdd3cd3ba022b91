//! Layer image loading via the `image` crate.
//!
//! Available when the `image-io` feature is enabled. Decode failures surface
//! as resource errors and abort the run that needed the image.

use crate::image::{ImageView, OwnedImage};
use crate::util::{ChipMatchError, ChipMatchResult};
use std::path::Path;

/// Creates a borrowed view from a grayscale image buffer.
pub fn view_from_gray_image(img: &image::GrayImage) -> ChipMatchResult<ImageView<'_, u8>> {
    ImageView::from_slice(img.as_raw(), img.width() as usize, img.height() as usize)
}

/// Creates an owned grayscale image from a dynamic image.
pub fn owned_from_dynamic_image(img: &image::DynamicImage) -> ChipMatchResult<OwnedImage> {
    let gray = img.to_luma8();
    let width = gray.width() as usize;
    let height = gray.height() as usize;
    OwnedImage::new(gray.into_raw(), width, height)
}

/// Loads a layer image from disk and converts it to grayscale.
pub fn load_gray_image<P: AsRef<Path>>(path: P) -> ChipMatchResult<OwnedImage> {
    let img = image::open(path.as_ref()).map_err(|err| ChipMatchError::ImageIo {
        reason: format!("{}: {err}", path.as_ref().display()),
    })?;
    owned_from_dynamic_image(&img)
}
