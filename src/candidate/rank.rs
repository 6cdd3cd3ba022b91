//! Deterministic ranking of match peaks.

use std::cmp::Ordering;

/// Converged peak in working-image coordinates for a specific bank variant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Peak {
    /// X coordinate (column) of the template's top-left anchor.
    pub(crate) x: usize,
    /// Y coordinate (row) of the template's top-left anchor.
    pub(crate) y: usize,
    /// ZNCC score at the anchor.
    pub(crate) score: f32,
    /// Index into the template bank.
    pub(crate) variant: usize,
}

/// Descending score, then leftmost, then topmost, then bank order.
pub(crate) fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.x.cmp(&b.x))
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.variant.cmp(&b.variant))
}

pub(crate) fn sort_peaks_desc(peaks: &mut [Peak]) {
    peaks.sort_by(peak_cmp_desc);
}
