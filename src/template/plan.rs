//! Template plan precomputation for ZNCC scoring.

use crate::image::ImageView;
use crate::util::{ChipMatchError, ChipMatchResult};

/// Precomputed statistics and zero-mean buffer for ZNCC matching.
#[derive(Clone, Debug)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    mean: f32,
    inv_std: f32,
    var_t: f32,
    t_prime: Vec<f32>,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    ///
    /// Fails with `DegenerateTemplate` when the template has no intensity
    /// variation, since ZNCC is undefined for a flat template.
    pub fn from_view(tpl: ImageView<'_, u8>) -> ChipMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let count = width
            .checked_mul(height)
            .ok_or(ChipMatchError::InvalidDimensions { width, height })?;

        let mut sum = 0.0f64;
        let mut sum_sq = 0.0f64;
        for y in 0..height {
            for &value in plan_row(tpl, y)? {
                let v = f64::from(value);
                sum += v;
                sum_sq += v * v;
            }
        }

        let count_f = count as f64;
        let mean_f64 = sum / count_f;
        let variance = sum_sq / count_f - mean_f64 * mean_f64;
        if variance <= 1e-8 {
            return Err(ChipMatchError::DegenerateTemplate {
                reason: "zero variance",
            });
        }

        let mut t_prime = Vec::with_capacity(count);
        let mut var_t = 0.0f64;
        for y in 0..height {
            for &value in plan_row(tpl, y)? {
                let centered = f64::from(value) - mean_f64;
                var_t += centered * centered;
                t_prime.push(centered as f32);
            }
        }

        Ok(Self {
            width,
            height,
            mean: mean_f64 as f32,
            inv_std: (1.0 / variance.sqrt()) as f32,
            var_t: var_t as f32,
            t_prime,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the mean intensity of the template.
    pub fn mean(&self) -> f32 {
        self.mean
    }

    /// Returns the inverse standard deviation of the template.
    pub fn inv_std(&self) -> f32 {
        self.inv_std
    }

    /// Sum of squared zero-mean template values.
    pub fn var_t(&self) -> f32 {
        self.var_t
    }

    /// Returns the zero-mean template buffer in row-major order.
    pub fn t_prime(&self) -> &[f32] {
        &self.t_prime
    }
}

fn plan_row<'a>(tpl: ImageView<'a, u8>, y: usize) -> ChipMatchResult<&'a [u8]> {
    tpl.row(y).ok_or(ChipMatchError::BufferTooSmall {
        needed: (y + 1).saturating_mul(tpl.stride()),
        got: tpl.as_slice().len(),
    })
}
