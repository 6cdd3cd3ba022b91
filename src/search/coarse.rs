//! Coarse scan over the anchor set of every bank variant.
//!
//! The sequential scan walks anchor rows top to bottom and visits every
//! variant on a row before moving on, so a cancelled scan leaves a clean
//! frontier: no anchor above it is missing. The `rayon` scan runs variants
//! in parallel, each top to bottom. Every anchor that clears the climb
//! threshold seeds a hill-climb, and converged positions that clear the
//! detection threshold are kept once per (variant, position).

use crate::bank::{TemplateBank, Variant};
use crate::candidate::rank::Peak;
use crate::kernel::zncc_at;
use crate::run::{ProgressTracker, RunContext};
use crate::search::grid::AnchorPlan;
use crate::search::refine::{hill_climb, ClimbBounds};
use crate::trace::trace_debug;
use crate::ImageView;
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use std::collections::HashSet;

/// Thresholds and limits shared by every detector built on the scan.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ScanParams {
    pub(crate) climb_threshold: f32,
    pub(crate) detect_threshold: f32,
    pub(crate) max_step: usize,
    pub(crate) min_var_i: f32,
}

/// Converged peaks of a scan plus where it stopped.
#[derive(Debug)]
pub(crate) struct ScanOutcome {
    pub(crate) peaks: Vec<Peak>,
    pub(crate) cancelled: bool,
    /// First anchor row that may be incomplete; `usize::MAX` when done.
    pub(crate) frontier: usize,
}

impl Default for ScanOutcome {
    fn default() -> Self {
        Self {
            peaks: Vec::new(),
            cancelled: false,
            frontier: usize::MAX,
        }
    }
}

impl ScanOutcome {
    fn stop_at(&mut self, row: usize) {
        self.cancelled = true;
        self.frontier = self.frontier.min(row);
    }

    /// Smallest peak y a peak missing from this outcome can have.
    ///
    /// Climbs from unscanned anchors may move up by `max_step` unless the
    /// row axis is locked.
    pub(crate) fn peak_frontier(&self, params: &ScanParams, anchors: &AnchorPlan) -> usize {
        if !self.cancelled {
            return usize::MAX;
        }
        let reach = if anchors.lock_y() { 0 } else { params.max_step };
        self.frontier.saturating_sub(reach)
    }
}

/// Number of anchors the scan will visit (progress total).
pub(crate) fn anchor_count(
    image: ImageView<'_, u8>,
    bank: &TemplateBank,
    anchors: &AnchorPlan,
) -> u64 {
    bank.variants()
        .iter()
        .filter_map(|variant| {
            let (max_x, max_y) = placement_range(image, variant)?;
            Some((anchors.xs(max_x).len() * anchors.ys(max_y).len()) as u64)
        })
        .sum()
}

/// Scans every variant of `bank` over `image`, row by row.
pub(crate) fn scan_bank(
    image: ImageView<'_, u8>,
    bank: &TemplateBank,
    anchors: &AnchorPlan,
    params: &ScanParams,
    ctx: &RunContext,
    tracker: &ProgressTracker<'_>,
) -> ScanOutcome {
    let mut scans: Vec<VariantScan<'_>> = bank
        .variants()
        .iter()
        .enumerate()
        .filter_map(|(idx, variant)| VariantScan::new(image, idx, variant, anchors, params))
        .collect();
    let mut rows: Vec<usize> = scans.iter().flat_map(|s| s.ys.iter().copied()).collect();
    rows.sort_unstable();
    rows.dedup();

    let mut out = ScanOutcome::default();
    for &y in &rows {
        for scan in &mut scans {
            if scan.ys.binary_search(&y).is_err() {
                continue;
            }
            if !scan.scan_row(image, y, params, ctx, &mut out.peaks) {
                out.stop_at(y);
                return out;
            }
            tracker.advance(scan.xs.len() as u64);
        }
    }
    out
}

/// Scans the variants of `bank` in parallel (rayon).
///
/// Peaks are concatenated in bank order, so an uncancelled run yields the
/// same peak set as [`scan_bank`].
#[cfg(feature = "rayon")]
pub(crate) fn scan_bank_par(
    image: ImageView<'_, u8>,
    bank: &TemplateBank,
    anchors: &AnchorPlan,
    params: &ScanParams,
    ctx: &RunContext,
    tracker: &ProgressTracker<'_>,
) -> ScanOutcome {
    let per_variant: Vec<ScanOutcome> = bank
        .variants()
        .par_iter()
        .enumerate()
        .map(|(idx, variant)| {
            let mut out = ScanOutcome::default();
            let Some(mut scan) = VariantScan::new(image, idx, variant, anchors, params) else {
                return out;
            };
            for y in scan.ys.clone() {
                if !scan.scan_row(image, y, params, ctx, &mut out.peaks) {
                    out.stop_at(y);
                    break;
                }
                tracker.advance(scan.xs.len() as u64);
            }
            out
        })
        .collect();

    let mut out = ScanOutcome::default();
    for scanned in per_variant {
        if scanned.cancelled {
            out.stop_at(scanned.frontier);
        }
        out.peaks.extend(scanned.peaks);
    }
    out
}

fn placement_range(image: ImageView<'_, u8>, variant: &Variant) -> Option<(usize, usize)> {
    let max_x = image.width().checked_sub(variant.width())?;
    let max_y = image.height().checked_sub(variant.height())?;
    Some((max_x, max_y))
}

/// Scan state of one variant.
struct VariantScan<'b> {
    idx: usize,
    variant: &'b Variant,
    xs: Vec<usize>,
    ys: Vec<usize>,
    bounds: ClimbBounds,
    seen: HashSet<(usize, usize)>,
}

impl<'b> VariantScan<'b> {
    fn new(
        image: ImageView<'_, u8>,
        idx: usize,
        variant: &'b Variant,
        anchors: &AnchorPlan,
        params: &ScanParams,
    ) -> Option<Self> {
        let (max_x, max_y) = placement_range(image, variant)?;
        Some(Self {
            idx,
            variant,
            xs: anchors.xs(max_x),
            ys: anchors.ys(max_y),
            bounds: ClimbBounds {
                max_step: params.max_step,
                max_x,
                max_y,
                lock_x: anchors.lock_x(),
                lock_y: anchors.lock_y(),
            },
            seen: HashSet::new(),
        })
    }

    /// Scans anchor row `y`; returns `false` if the run was cancelled.
    fn scan_row(
        &mut self,
        image: ImageView<'_, u8>,
        y: usize,
        params: &ScanParams,
        ctx: &RunContext,
        peaks: &mut Vec<Peak>,
    ) -> bool {
        let variant = self.variant;
        let plan = variant.plan();
        let orientation = variant.orientation();
        for &x in &self.xs {
            if ctx.is_cancelled() {
                trace_debug!("scan_cancelled", variant = self.idx, x = x, y = y);
                return false;
            }
            let score = zncc_at(image, plan, orientation, x, y, params.min_var_i);
            if score < params.climb_threshold {
                continue;
            }
            let seed = (x, y);
            let Some(top) =
                hill_climb(image, plan, orientation, seed, score, self.bounds, params.min_var_i, ctx)
            else {
                return false;
            };
            if top.score >= params.detect_threshold && self.seen.insert((top.x, top.y)) {
                peaks.push(Peak {
                    x: top.x,
                    y: top.y,
                    score: top.score,
                    variant: self.idx,
                });
            }
        }
        true
    }
}
