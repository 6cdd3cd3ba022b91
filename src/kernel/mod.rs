//! Correlation kernel implementations.
//!
//! The search engine scores one anchor at a time (coarse scan and hill-climb
//! steps alike), so a kernel only needs to evaluate a single placement.
//! Flipped variants reuse the unflipped plan: the kernel walks template rows
//! and columns in mirrored order instead.

use crate::bank::Orientation;
use crate::template::TemplatePlan;
use crate::ImageView;

/// Kernel trait for scoring a template placement.
pub trait Kernel {
    type Plan;

    /// Computes the score of `plan` placed with `orientation` at a single
    /// placement (top-left coordinates).
    ///
    /// Placements outside the image and windows whose variance does not
    /// exceed `min_var_i` score `f32::NEG_INFINITY`.
    fn score_at(
        image: ImageView<'_, u8>,
        plan: &Self::Plan,
        orientation: Orientation,
        x: usize,
        y: usize,
        min_var_i: f32,
    ) -> f32;
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(not(feature = "simd"))]
pub(crate) type ZnccKernel = scalar::ZnccScalar;
#[cfg(feature = "simd")]
pub(crate) type ZnccKernel = simd::ZnccSimd;

/// Scores a placement with the kernel selected by the enabled features.
#[inline]
pub(crate) fn zncc_at(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    orientation: Orientation,
    x: usize,
    y: usize,
    min_var_i: f32,
) -> f32 {
    <ZnccKernel as Kernel>::score_at(image, plan, orientation, x, y, min_var_i)
}

/// Row `ty` of the placed template, as stored in the unflipped plan.
#[inline]
pub(crate) fn source_row(orientation: Orientation, ty: usize, height: usize) -> usize {
    if orientation.mirrors_rows() {
        height - 1 - ty
    } else {
        ty
    }
}
