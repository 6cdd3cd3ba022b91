//! Scale-space construction for grayscale `u8` layer images.
//!
//! Downscaling uses area averaging: every destination pixel is the mean of
//! the source area it covers, with fractional coverage weights at the cell
//! borders. Integer factors reduce to plain box averages (a 2x2 block for a
//! factor of two, rounded half up), fractional factors blend neighbouring
//! source pixels instead of skipping them.

use crate::geometry::Rect;
use crate::image::ImageView;
use crate::util::math::round_u8;
use crate::util::{ChipMatchError, ChipMatchResult};

/// Owned contiguous grayscale image buffer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedImage {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl OwnedImage {
    /// Wraps a contiguous row-major buffer of exactly `width * height` bytes.
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> ChipMatchResult<Self> {
        if width == 0 || height == 0 {
            return Err(ChipMatchError::InvalidDimensions { width, height });
        }
        let needed = width
            .checked_mul(height)
            .ok_or(ChipMatchError::InvalidDimensions { width, height })?;
        if data.len() < needed {
            return Err(ChipMatchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        if data.len() > needed {
            return Err(ChipMatchError::InvalidDimensions { width, height });
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Builds an image by evaluating `f(x, y)` for every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> ChipMatchResult<Self>
    where
        F: FnMut(usize, usize) -> u8,
    {
        let len = width
            .checked_mul(height)
            .ok_or(ChipMatchError::InvalidDimensions { width, height })?;
        let mut data = Vec::with_capacity(len);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self::new(data, width, height)
    }

    /// Copies a (possibly strided) view into a contiguous buffer.
    pub fn from_view(view: ImageView<'_, u8>) -> ChipMatchResult<Self> {
        let width = view.width();
        let height = view.height();
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            let row = view.row(y).ok_or(ChipMatchError::BufferTooSmall {
                needed: (y + 1).saturating_mul(view.stride()),
                got: view.as_slice().len(),
            })?;
            data.extend_from_slice(row);
        }
        Self::new(data, width, height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the row-major pixel buffer.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Returns a borrowed view of the image.
    pub fn view(&self) -> ImageView<'_, u8> {
        ImageView {
            data: &self.data,
            width: self.width,
            height: self.height,
            stride: self.width,
        }
    }
}

/// Affine mapping between a working image and its source layer.
///
/// Corner coordinates address pixel edges (a template's top-left anchor),
/// center coordinates address pixel centers (a wire centerline sample).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleMap {
    origin_x: f32,
    origin_y: f32,
    factor: f32,
}

impl ScaleMap {
    pub fn new(origin_x: f32, origin_y: f32, factor: f32) -> Self {
        Self {
            origin_x,
            origin_y,
            factor,
        }
    }

    /// Scale-down factor (source pixels per working pixel).
    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn corner_to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.origin_x + x * self.factor,
            self.origin_y + y * self.factor,
        )
    }

    pub fn corner_to_scaled(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.origin_x) / self.factor,
            (y - self.origin_y) / self.factor,
        )
    }

    pub fn center_to_source(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.origin_x + (x + 0.5) * self.factor - 0.5,
            self.origin_y + (y + 0.5) * self.factor - 0.5,
        )
    }

    pub fn length_to_scaled(&self, len: f32) -> f32 {
        len / self.factor
    }

    pub fn length_to_source(&self, len: f32) -> f32 {
        len * self.factor
    }
}

/// Reduced-resolution copy of a layer region plus its mapping to the layer.
#[derive(Clone, Debug)]
pub struct WorkingImage {
    image: OwnedImage,
    map: ScaleMap,
    region: Rect,
}

impl WorkingImage {
    /// Crops `region` out of `layer` and downscales it by `factor`.
    pub fn build(layer: ImageView<'_, u8>, region: Rect, factor: f32) -> ChipMatchResult<Self> {
        let view = layer.region(region)?;
        let image = downscale_area(view, factor)?;
        Ok(Self {
            image,
            map: ScaleMap::new(region.x as f32, region.y as f32, factor),
            region,
        })
    }

    pub fn view(&self) -> ImageView<'_, u8> {
        self.image.view()
    }

    pub fn image(&self) -> &OwnedImage {
        &self.image
    }

    pub fn map(&self) -> &ScaleMap {
        &self.map
    }

    /// Source region this working image was built from.
    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }
}

pub(crate) fn validate_factor(factor: f32) -> ChipMatchResult<()> {
    if !factor.is_finite() || factor < 1.0 {
        return Err(ChipMatchError::InvalidConfig {
            reason: "scale-down factor must be finite and >= 1",
        });
    }
    Ok(())
}

/// Downscales `src` by `factor` using area averaging.
///
/// The output has `max(1, floor(len / factor))` pixels per axis. A factor of
/// exactly 1 copies the input.
pub fn downscale_area(src: ImageView<'_, u8>, factor: f32) -> ChipMatchResult<OwnedImage> {
    validate_factor(factor)?;
    if factor == 1.0 {
        return OwnedImage::from_view(src);
    }

    let src_width = src.width();
    let src_height = src.height();
    let dst_width = scaled_len(src_width, factor);
    let dst_height = scaled_len(src_height, factor);
    let cols = axis_weights(src_width, dst_width, factor);
    let rows = axis_weights(src_height, dst_height, factor);

    // Horizontal pass: one averaged row per source row.
    let mut tmp = vec![0.0f32; src_height * dst_width];
    for y in 0..src_height {
        let row = src.row(y).ok_or(ChipMatchError::BufferTooSmall {
            needed: (y + 1).saturating_mul(src.stride()),
            got: src.as_slice().len(),
        })?;
        let out = &mut tmp[y * dst_width..(y + 1) * dst_width];
        for (ox, weights) in cols.iter().enumerate() {
            out[ox] = weighted_mean(weights, |i| f32::from(row[i]));
        }
    }

    // Vertical pass over the horizontally reduced rows.
    let mut dst = vec![0u8; dst_width * dst_height];
    for (oy, weights) in rows.iter().enumerate() {
        for ox in 0..dst_width {
            let value = weighted_mean(weights, |i| tmp[i * dst_width + ox]);
            dst[oy * dst_width + ox] = round_u8(value);
        }
    }

    OwnedImage::new(dst, dst_width, dst_height)
}

fn scaled_len(len: usize, factor: f32) -> usize {
    ((len as f64 / f64::from(factor)).floor() as usize).max(1)
}

/// Coverage weights of source pixels for every destination index.
fn axis_weights(src_len: usize, dst_len: usize, factor: f32) -> Vec<Vec<(usize, f32)>> {
    let factor = f64::from(factor);
    let limit = src_len as f64;
    (0..dst_len)
        .map(|o| {
            let start = o as f64 * factor;
            let end = ((o + 1) as f64 * factor).min(limit);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);
            (first..last)
                .filter_map(|i| {
                    let lo = (i as f64).max(start);
                    let hi = ((i + 1) as f64).min(end);
                    let w = hi - lo;
                    (w > 1e-9).then_some((i, w as f32))
                })
                .collect()
        })
        .collect()
}

fn weighted_mean<F>(weights: &[(usize, f32)], sample: F) -> f32
where
    F: Fn(usize) -> f32,
{
    let mut sum = 0.0f32;
    let mut total = 0.0f32;
    for &(i, w) in weights {
        sum += w * sample(i);
        total += w;
    }
    if total > 0.0 {
        sum / total
    } else {
        0.0
    }
}
