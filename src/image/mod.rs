//! Image views and the scale-space builder.
//!
//! `ImageView` is a borrowed 2D view into a 1D buffer with an explicit stride.
//! The stride counts elements between the starts of consecutive rows, so a
//! stride larger than the width represents padded rows. Region views are
//! zero-copy slices of the same backing buffer and keep the original stride.

use crate::geometry::Rect;
use crate::util::{ChipMatchError, ChipMatchResult};

#[cfg(feature = "image-io")]
pub mod io;
pub mod pyramid;

pub use pyramid::{downscale_area, OwnedImage, ScaleMap, WorkingImage};

/// Borrowed 2D image view with an explicit stride.
#[derive(Copy, Clone, Debug)]
pub struct ImageView<'a, T> {
    data: &'a [T],
    width: usize,
    height: usize,
    stride: usize,
}

impl<'a, T> ImageView<'a, T> {
    /// Creates a contiguous view with `stride == width`.
    pub fn from_slice(data: &'a [T], width: usize, height: usize) -> ChipMatchResult<Self> {
        Self::new(data, width, height, width)
    }

    /// Creates a view with an explicit stride.
    pub fn new(data: &'a [T], width: usize, height: usize, stride: usize) -> ChipMatchResult<Self> {
        let needed = required_len(width, height, stride)?;
        if data.len() < needed {
            return Err(ChipMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the stride in elements between row starts.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the full bounds of the view as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::full(self.width, self.height)
    }

    /// Returns the backing slice including any row padding.
    pub fn as_slice(&self) -> &'a [T] {
        self.data
    }

    /// Returns the element at `(x, y)` if it is within bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<&'a T> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y.checked_mul(self.stride)?.checked_add(x)?;
        self.data.get(idx)
    }

    /// Returns a contiguous slice for row `y` with length `width`.
    pub fn row(&self, y: usize) -> Option<&'a [T]> {
        if y >= self.height {
            return None;
        }
        let start = y.checked_mul(self.stride)?;
        let end = start.checked_add(self.width)?;
        self.data.get(start..end)
    }

    /// Returns a zero-copy view of `region`.
    ///
    /// Fails with `InvalidRegion` if the region is empty or not fully inside
    /// the view.
    pub fn region(&self, region: Rect) -> ChipMatchResult<ImageView<'a, T>> {
        let invalid = ChipMatchError::InvalidRegion {
            x: region.x,
            y: region.y,
            width: region.width,
            height: region.height,
            img_width: self.width,
            img_height: self.height,
        };
        if region.is_empty() {
            return Err(invalid);
        }
        let end_x = region.x.checked_add(region.width);
        let end_y = region.y.checked_add(region.height);
        match (end_x, end_y) {
            (Some(end_x), Some(end_y)) if end_x <= self.width && end_y <= self.height => {}
            _ => return Err(invalid),
        }

        let start = region
            .y
            .checked_mul(self.stride)
            .and_then(|v| v.checked_add(region.x))
            .ok_or(ChipMatchError::InvalidDimensions {
                width: self.width,
                height: self.height,
            })?;
        let data = self
            .data
            .get(start..)
            .ok_or(ChipMatchError::BufferTooSmall {
                needed: start.saturating_add(1),
                got: self.data.len(),
            })?;

        ImageView::new(data, region.width, region.height, self.stride)
    }
}

fn required_len(width: usize, height: usize, stride: usize) -> ChipMatchResult<usize> {
    if width == 0 || height == 0 {
        return Err(ChipMatchError::InvalidDimensions { width, height });
    }
    if stride < width {
        return Err(ChipMatchError::InvalidStride { width, stride });
    }
    let needed = (height - 1)
        .checked_mul(stride)
        .and_then(|v| v.checked_add(width))
        .ok_or(ChipMatchError::InvalidDimensions { width, height })?;
    Ok(needed)
}
