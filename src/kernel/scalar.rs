//! Scalar reference kernel for ZNCC evaluation.

use crate::bank::Orientation;
use crate::kernel::{source_row, Kernel};
use crate::template::TemplatePlan;
use crate::ImageView;

/// Scalar ZNCC kernel.
pub struct ZnccScalar;

/// Running sums over one window.
#[derive(Default)]
struct Sums {
    dot: f32,
    sum_i: f32,
    sum_i2: f32,
}

impl Sums {
    #[inline]
    fn add(&mut self, t: f32, pixel: u8) {
        let value = f32::from(pixel);
        self.dot += t * value;
        self.sum_i += value;
        self.sum_i2 += value * value;
    }
}

/// Window variance test and normalization shared by every kernel.
#[inline]
pub(crate) fn finish(
    dot: f32,
    sum_i: f32,
    sum_i2: f32,
    n: f32,
    var_t: f32,
    min_var_i: f32,
) -> f32 {
    let var_i = sum_i2 - (sum_i * sum_i) / n;
    if var_i <= min_var_i {
        return f32::NEG_INFINITY;
    }
    let score = dot / (var_t * var_i).sqrt();
    if score.is_finite() {
        score
    } else {
        f32::NEG_INFINITY
    }
}

/// Whether a `tpl`-sized window at `(x, y)` lies inside `image`.
#[inline]
pub(crate) fn fits(image: ImageView<'_, u8>, tpl: &TemplatePlan, x: usize, y: usize) -> bool {
    let room_x = image.width().checked_sub(tpl.width());
    let room_y = image.height().checked_sub(tpl.height());
    matches!((room_x, room_y), (Some(rx), Some(ry)) if x <= rx && y <= ry)
}

impl Kernel for ZnccScalar {
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
        let mut sums = Sums::default();

        for ty in 0..height {
            let Some(row) = image.row(y + ty) else {
                return f32::NEG_INFINITY;
            };
            let window = &row[x..x + width];
            let src = source_row(orientation, ty, height) * width;
            let tpl_row = &tpl.t_prime()[src..src + width];
            if orientation.mirrors_columns() {
                for (&t, &pixel) in tpl_row.iter().rev().zip(window) {
                    sums.add(t, pixel);
                }
            } else {
                for (&t, &pixel) in tpl_row.iter().zip(window) {
                    sums.add(t, pixel);
                }
            }
        }

        let n = (width * height) as f32;
        finish(sums.dot, sums.sum_i, sums.sum_i2, n, var_t, min_var_i)
    }
}

#[cfg(test)]
mod tests {
    use super::{Kernel, ZnccScalar};
    use crate::bank::Orientation;
    use crate::template::TemplatePlan;
    use crate::ImageView;

    #[test]
    fn zncc_matches_bruteforce() {
        let img_width = 6;
        let img_height = 5;
        let mut image = Vec::with_capacity(img_width * img_height);
        for y in 0..img_height {
            for x in 0..img_width {
                image.push(((x * 17 + y * 9 + x * y) & 0xFF) as u8);
            }
        }
        let tpl_width = 3;
        let tpl_height = 2;
        let mut tpl = Vec::with_capacity(tpl_width * tpl_height);
        for y in 0..tpl_height {
            for x in 0..tpl_width {
                tpl.push(((x * 5 + y * 11 + x * y) & 0xFF) as u8);
            }
        }

        let image_view = ImageView::from_slice(&image, img_width, img_height).unwrap();
        let tpl_view = ImageView::from_slice(&tpl, tpl_width, tpl_height).unwrap();
        let plan = TemplatePlan::from_view(tpl_view).unwrap();

        let t_prime = plan.t_prime();
        let var_t = plan.var_t() as f64;
        let n = (tpl_width * tpl_height) as f64;
        for y in 0..=(img_height - tpl_height) {
            for x in 0..=(img_width - tpl_width) {
                let mut dot = 0.0f64;
                let mut sum_i = 0.0f64;
                let mut sum_i2 = 0.0f64;
                for ty in 0..tpl_height {
                    let row = image_view.row(y + ty).unwrap();
                    for tx in 0..tpl_width {
                        let value = row[x + tx] as f64;
                        dot += t_prime[ty * tpl_width + tx] as f64 * value;
                        sum_i += value;
                        sum_i2 += value * value;
                    }
                }
                let var_i = sum_i2 - (sum_i * sum_i) / n;
                let got = <ZnccScalar as Kernel>::score_at(image_view, &plan, Orientation::Normal, x, y, 1e-8);
                if var_i <= 1e-8 {
                    assert_eq!(got, f32::NEG_INFINITY);
                    continue;
                }
                let expected = dot / (var_t * var_i).sqrt();
                assert!((got as f64 - expected).abs() < 1e-4, "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn exact_copy_scores_one_and_out_of_range_is_rejected() {
        let data: Vec<u8> = (0..16u8).map(|v| v.wrapping_mul(37)).collect();
        let view = ImageView::from_slice(&data, 4, 4).unwrap();
        let tpl = view.region(crate::geometry::Rect::new(1, 1, 2, 2)).unwrap();
        let plan = TemplatePlan::from_view(tpl).unwrap();
        let score = <ZnccScalar as Kernel>::score_at(view, &plan, Orientation::Normal, 1, 1, 1e-8);
        assert!((score - 1.0).abs() < 1e-5);
        let outside = <ZnccScalar as Kernel>::score_at(view, &plan, Orientation::Normal, 3, 0, 1e-8);
        assert_eq!(outside, f32::NEG_INFINITY);
    }

    #[test]
    fn mirrored_reads_match_flipped_bitmaps() {
        let scene: Vec<u8> = (0..14 * 9).map(|i: usize| (i * 53 % 251) as u8).collect();
        let scene = ImageView::from_slice(&scene, 14, 9).unwrap();
        let tpl: Vec<u8> = (0..5 * 3).map(|i: usize| (i * i * 7 % 97) as u8).collect();
        let tpl = ImageView::from_slice(&tpl, 5, 3).unwrap();
        let plan = TemplatePlan::from_view(tpl).unwrap();
        for orientation in [
            Orientation::FlipLeftRight,
            Orientation::FlipUpDown,
            Orientation::FlipBoth,
        ] {
            let flipped = orientation.apply(tpl).unwrap();
            let flipped_plan = TemplatePlan::from_view(flipped.view()).unwrap();
            for (x, y) in [(0, 0), (4, 2), (9, 6)] {
                let mirrored = <ZnccScalar as Kernel>::score_at(scene, &plan, orientation, x, y, 1e-8);
                let direct =
                    <ZnccScalar as Kernel>::score_at(scene, &flipped_plan, Orientation::Normal, x, y, 1e-8);
                assert!((mirrored - direct).abs() < 1e-5, "{orientation:?} at ({x}, {y})");
            }
            // A flipped copy pasted into the scene scores one only with its tag.
            let pasted = crate::image::OwnedImage::from_fn(14, 9, |x, y| {
                if (2..7).contains(&x) && (3..6).contains(&y) {
                    flipped.view().get(x - 2, y - 3).copied().unwrap_or(0)
                } else {
                    scene.get(x, y).copied().unwrap_or(0)
                }
            })
            .unwrap();
            let hit = <ZnccScalar as Kernel>::score_at(pasted.view(), &plan, orientation, 2, 3, 1e-8);
            assert!((hit - 1.0).abs() < 1e-5);
        }
    }
}
