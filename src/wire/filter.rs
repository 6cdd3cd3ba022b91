//! Denoising and gradient filters for wire tracing, built on `imageproc`.
//!
//! The working image is handed to `imageproc` as a [`GrayImage`]; only the
//! Sobel responses come back as `f32` planes. `imageproc` replicates border
//! pixels, so every output has the input's size.

use crate::image::OwnedImage;
use crate::util::{ChipMatchError, ChipMatchResult};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};

/// Owned single-channel `f32` plane.
#[derive(Clone, Debug, PartialEq)]
pub struct FloatImage {
    data: Vec<f32>,
    width: usize,
    height: usize,
}

impl FloatImage {
    fn from_i16(src: &ImageBuffer<Luma<i16>, Vec<i16>>) -> Self {
        Self {
            data: src.as_raw().iter().map(|&v| f32::from(v)).collect(),
            width: src.width() as usize,
            height: src.height() as usize,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }
}

/// Sobel responses: `gx` grows left to right, `gy` top to bottom.
#[derive(Clone, Debug)]
pub struct GradientField {
    pub gx: FloatImage,
    pub gy: FloatImage,
    pub magnitude: FloatImage,
}

/// Copies an owned layer image into an `image` buffer.
pub fn to_gray_image(src: &OwnedImage) -> ChipMatchResult<GrayImage> {
    let dims = ChipMatchError::InvalidDimensions {
        width: src.width(),
        height: src.height(),
    };
    let width = u32::try_from(src.width()).map_err(|_| dims.clone())?;
    let height = u32::try_from(src.height()).map_err(|_| dims.clone())?;
    GrayImage::from_raw(width, height, src.data().to_vec()).ok_or(dims)
}

/// Square median filter of odd `width`; 0 and 1 leave the image unchanged.
pub fn median_filter(src: GrayImage, width: usize) -> ChipMatchResult<GrayImage> {
    if width <= 1 {
        return Ok(src);
    }
    if width % 2 == 0 {
        return Err(ChipMatchError::InvalidConfig {
            reason: "median width must be odd",
        });
    }
    let radius = u32::try_from(width / 2).map_err(|_| ChipMatchError::InvalidConfig {
        reason: "median width is too large",
    })?;
    Ok(imageproc::filter::median_filter(&src, radius, radius))
}

/// Gaussian blur; `sigma == 0` leaves the image unchanged.
pub fn gaussian_blur(src: GrayImage, sigma: f32) -> ChipMatchResult<GrayImage> {
    if !sigma.is_finite() || sigma < 0.0 {
        return Err(ChipMatchError::InvalidConfig {
            reason: "gaussian sigma must be finite and non-negative",
        });
    }
    if sigma == 0.0 {
        return Ok(src);
    }
    Ok(imageproc::filter::gaussian_blur_f32(&src, sigma))
}

/// 3x3 Sobel gradients and their Euclidean magnitude.
pub fn sobel(src: &GrayImage) -> GradientField {
    let gx = FloatImage::from_i16(&horizontal_sobel(src));
    let gy = FloatImage::from_i16(&vertical_sobel(src));
    let magnitude = FloatImage {
        data: gx
            .data
            .iter()
            .zip(&gy.data)
            .map(|(&x, &y)| x.hypot(y))
            .collect(),
        width: gx.width,
        height: gx.height,
    };
    GradientField { gx, gy, magnitude }
}

#[cfg(test)]
mod tests {
    use super::{gaussian_blur, median_filter, sobel, to_gray_image};
    use crate::image::OwnedImage;
    use image::GrayImage;

    fn gray(img: &OwnedImage) -> GrayImage {
        to_gray_image(img).unwrap()
    }

    #[test]
    fn median_removes_salt_noise() {
        let img = OwnedImage::from_fn(7, 7, |x, y| if (x, y) == (3, 3) { 255 } else { 40 }).unwrap();
        let out = median_filter(gray(&img), 3).unwrap();
        assert_eq!(out.get_pixel(3, 3)[0], 40);
        assert!(median_filter(gray(&img), 4).is_err());
        assert_eq!(median_filter(gray(&img), 0).unwrap(), gray(&img));
    }

    #[test]
    fn blur_preserves_constant_image() {
        let img = OwnedImage::from_fn(9, 5, |_, _| 77).unwrap();
        let out = gaussian_blur(gray(&img), 1.5).unwrap();
        assert!(out.as_raw().iter().all(|&v| v.abs_diff(77) <= 1));
        assert!(gaussian_blur(gray(&img), -1.0).is_err());
        assert_eq!(gaussian_blur(gray(&img), 0.0).unwrap(), gray(&img));
    }

    #[test]
    fn sobel_signs_follow_edges() {
        // Bright band on rows 3..6: rising edge above, falling edge below.
        let img = OwnedImage::from_fn(6, 10, |_, y| if (3..6).contains(&y) { 200 } else { 0 }).unwrap();
        let g = sobel(&gray(&img));
        assert!(g.gy.get(2, 2) > 0.0);
        assert!(g.gy.get(2, 6) < 0.0);
        assert_eq!(g.gx.get(2, 4), 0.0);
        assert_eq!(g.magnitude.get(2, 0), 0.0);
        assert_eq!(g.gy.get(2, 3), 800.0);
    }
}
