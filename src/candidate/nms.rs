//! Non-maximum suppression over candidate bounding boxes.

use crate::candidate::rank::{sort_peaks_desc, Peak};
use crate::geometry::Rect;

/// Overlap (relative to the smaller box) above which two boxes count as the
/// same object.
pub(crate) const OVERLAP_RATIO: f32 = 0.5;

/// Greedy box NMS.
///
/// Peaks are sorted by descending score; each peak is kept unless its box
/// overlaps an already kept box by more than `max_overlap`. `size_of` returns
/// the box size for a bank variant.
///
/// `frontier` is the smallest anchor y a peak missing from `peaks` can have
/// (`usize::MAX` for a complete scan). A peak whose box reaches the
/// frontier, or that overlaps a higher-ranked such peak, may be decided
/// differently once the missing peaks are known, so it is left out. Every
/// returned peak is therefore also returned for the complete peak set.
pub(crate) fn suppress_overlaps<F>(
    peaks: &mut [Peak],
    size_of: F,
    max_overlap: f32,
    frontier: usize,
) -> Vec<Peak>
where
    F: Fn(usize) -> (usize, usize),
{
    sort_peaks_desc(peaks);
    let mut kept: Vec<Rect> = Vec::new();
    let mut unsettled: Vec<Rect> = Vec::new();
    let mut out = Vec::new();

    for peak in peaks.iter().copied() {
        let (width, height) = size_of(peak.variant);
        let rect = Rect::new(peak.x, peak.y, width, height);
        let overlaps = |other: &Rect| rect.overlap_ratio(other) > max_overlap;

        let settled = rect.bottom() <= frontier && !unsettled.iter().any(overlaps);
        if !settled {
            unsettled.push(rect);
        }
        if kept.iter().any(overlaps) {
            continue;
        }
        kept.push(rect);
        if settled {
            out.push(peak);
        }
    }
    out
}
