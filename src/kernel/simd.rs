//! SIMD-accelerated ZNCC kernel using the `wide` crate.
//!
//! Each template row is consumed 8 pixels at a time with `f32x8`; the row
//! remainder is accumulated in scalar. Mirrored columns load their template
//! lanes from the far end of the row in reverse.

use crate::bank::Orientation;
use crate::kernel::scalar::{finish, fits};
use crate::kernel::{source_row, Kernel};
use crate::template::TemplatePlan;
use crate::ImageView;
use wide::f32x8;

const LANES: usize = 8;

#[inline]
fn pixels(slice: &[u8]) -> f32x8 {
    let mut lanes = [0.0f32; LANES];
    for (lane, &pixel) in lanes.iter_mut().zip(slice) {
        *lane = f32::from(pixel);
    }
    f32x8::from(lanes)
}

/// Template lanes `tx..tx + 8` of the placed row.
#[inline]
fn weights(row: &[f32], tx: usize, mirrored: bool) -> f32x8 {
    let mut lanes = [0.0f32; LANES];
    if mirrored {
        let end = row.len() - tx;
        for (lane, &t) in lanes.iter_mut().zip(row[end - LANES..end].iter().rev()) {
            *lane = t;
        }
    } else {
        lanes.copy_from_slice(&row[tx..tx + LANES]);
    }
    f32x8::from(lanes)
}

#[inline]
fn hsum(v: f32x8) -> f32 {
    v.to_array().iter().sum()
}

/// SIMD ZNCC kernel.
pub struct ZnccSimd;

impl Kernel for ZnccSimd {
    type Plan = TemplatePlan;

    fn score_at(
        image: ImageView<'_, u8>,
        tpl: &Self::Plan,
        orientation: Orientation,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32 {
        let var_t = tpl.var_t();
        if !fits(image, tpl, x, y) || var_t <= 1e-8 {
            return f32::NEG_INFINITY;
        }
        let (width, height) = (tpl.width(), tpl.height());
        let mirrored = orientation.mirrors_columns();
        let simd_end = width / LANES * LANES;

        let (mut dot_v, mut sum_v, mut sq_v) = (f32x8::ZERO, f32x8::ZERO, f32x8::ZERO);
        let (mut dot, mut sum_i, mut sum_i2) = (0.0f32, 0.0f32, 0.0f32);

        for ty in 0..height {
            let Some(row) = image.row(y + ty) else {
                return f32::NEG_INFINITY;
            };
            let window = &row[x..x + width];
            let src = source_row(orientation, ty, height) * width;
            let tpl_row = &tpl.t_prime()[src..src + width];

            for tx in (0..simd_end).step_by(LANES) {
                let values = pixels(&window[tx..tx + LANES]);
                dot_v += weights(tpl_row, tx, mirrored) * values;
                sum_v += values;
                sq_v += values * values;
            }
            for (tx, &pixel) in window.iter().enumerate().skip(simd_end) {
                let t = if mirrored { tpl_row[width - 1 - tx] } else { tpl_row[tx] };
                let value = f32::from(pixel);
                dot += t * value;
                sum_i += value;
                sum_i2 += value * value;
            }
        }

        let n = (width * height) as f32;
        finish(
            hsum(dot_v) + dot,
            hsum(sum_v) + sum_i,
            hsum(sq_v) + sum_i2,
            n,
            var_t,
            min_var_i,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::ZnccSimd;
    use crate::bank::Orientation;
    use crate::kernel::scalar::ZnccScalar;
    use crate::kernel::Kernel;
    use crate::template::TemplatePlan;
    use crate::ImageView;

    #[test]
    fn simd_agrees_with_scalar() {
        let width = 40;
        let height = 20;
        let image: Vec<u8> = (0..width * height)
            .map(|i| ((i * 31 + (i / width) * 7) & 0xFF) as u8)
            .collect();
        let view = ImageView::from_slice(&image, width, height).unwrap();
        let tpl = view.region(crate::geometry::Rect::new(5, 3, 19, 7)).unwrap();
        let plan = TemplatePlan::from_view(tpl).unwrap();
        for orientation in [
            Orientation::Normal,
            Orientation::FlipLeftRight,
            Orientation::FlipUpDown,
            Orientation::FlipBoth,
        ] {
            for y in 0..=(height - 7) {
                for x in 0..=(width - 19) {
                    let a = <ZnccScalar as Kernel>::score_at(view, &plan, orientation, x, y, 1e-3);
                    let b = <ZnccSimd as Kernel>::score_at(view, &plan, orientation, x, y, 1e-3);
                    if a.is_finite() || b.is_finite() {
                        assert!((a - b).abs() < 1e-3, "{orientation:?} at ({x}, {y}): {a} vs {b}");
                    }
                }
            }
        }
    }
}
