//! Correlation search: coarse scan, hill-climb, thresholding and NMS.
//!
//! [`run_template_match`] is the gate detector entry point. It validates
//! everything up front, builds the working image and the template bank, then
//! scans. The via detector reuses the same engine through [`search_bank`].

pub(crate) mod coarse;
pub mod grid;
pub(crate) mod refine;

pub use grid::{GridConfig, RegularGrid};

use crate::bank::{OrientationMode, TemplateBank, TemplateSource};
use crate::candidate::nms::{suppress_overlaps, OVERLAP_RATIO};
use crate::candidate::{peaks_to_candidates, MatchCandidate};
use crate::geometry::Rect;
use crate::image::pyramid::validate_factor;
use crate::image::WorkingImage;
use crate::run::{Detection, ProgressTracker, RunContext};
use crate::trace::{trace_event, trace_span};
use crate::util::{ChipMatchError, ChipMatchResult};
use crate::ImageView;
use coarse::{anchor_count, scan_bank, ScanOutcome, ScanParams};
use grid::AnchorPlan;

/// Restriction of the coarse scan to project grid lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GridMode {
    /// Every anchor of the working image.
    #[default]
    Default,
    /// Anchor y on row grid lines; climbs move along x only.
    AlongGridRows,
    /// Anchor x on column grid lines; climbs move along y only.
    AlongGridColumns,
}

/// Configuration for gate template matching.
#[derive(Clone, Debug)]
pub struct TemplateMatchConfig {
    /// Scale-down factor applied to image and templates (>= 1).
    pub scale_down: f32,
    /// Minimum coarse score that seeds a hill-climb.
    pub climb_threshold: f32,
    /// Minimum converged score for a detection.
    pub detect_threshold: f32,
    /// Chebyshev radius a climb may travel from its seed, in working pixels.
    pub max_step: usize,
    pub orientation: OrientationMode,
    pub grid_mode: GridMode,
    /// Keep at most this many candidates after NMS (0 = all).
    pub max_results: usize,
    /// Minimum window variance; flatter windows are skipped.
    pub min_var_i: f32,
    /// Scan orientation variants in parallel (requires the `rayon` feature).
    pub parallel: bool,
}

impl Default for TemplateMatchConfig {
    fn default() -> Self {
        Self {
            scale_down: 1.0,
            climb_threshold: 0.5,
            detect_threshold: 0.7,
            max_step: 4,
            orientation: OrientationMode::Any,
            grid_mode: GridMode::Default,
            max_results: 0,
            min_var_i: 1e-3,
            parallel: false,
        }
    }
}

impl TemplateMatchConfig {
    pub fn validate(&self) -> ChipMatchResult<()> {
        validate_factor(self.scale_down)?;
        validate_thresholds(self.climb_threshold, self.detect_threshold)?;
        validate_min_var(self.min_var_i)
    }

    fn scan_params(&self) -> ScanParams {
        ScanParams {
            climb_threshold: self.climb_threshold,
            detect_threshold: self.detect_threshold,
            max_step: self.max_step,
            min_var_i: self.min_var_i,
        }
    }
}

pub(crate) fn validate_thresholds(climb: f32, detect: f32) -> ChipMatchResult<()> {
    if !(0.0..=1.0).contains(&climb) || !(0.0..=1.0).contains(&detect) {
        return Err(ChipMatchError::InvalidConfig {
            reason: "thresholds must lie in [0, 1]",
        });
    }
    if climb > detect {
        return Err(ChipMatchError::InvalidConfig {
            reason: "climb threshold must not exceed detect threshold",
        });
    }
    Ok(())
}

pub(crate) fn validate_min_var(min_var_i: f32) -> ChipMatchResult<()> {
    if !min_var_i.is_finite() || min_var_i < 0.0 {
        return Err(ChipMatchError::InvalidConfig {
            reason: "min_var_i must be finite and non-negative",
        });
    }
    Ok(())
}

/// Finds gate template instances in `region` of `layer`.
///
/// Candidates are in source-layer coordinates, sorted by descending score
/// (ties: smaller x, then smaller y, then template/orientation order).
/// Validation errors are raised before any scanning. A cancelled run returns
/// `cancelled = true` and only the detections the unscanned anchors can no
/// longer suppress, so they are a subset of the uncancelled result.
pub fn run_template_match(
    layer: ImageView<'_, u8>,
    region: Rect,
    templates: &[TemplateSource<'_>],
    cfg: &TemplateMatchConfig,
    grid: &GridConfig,
    ctx: &RunContext,
) -> ChipMatchResult<Detection<MatchCandidate>> {
    let _span = trace_span!(
        "template_match",
        templates = templates.len(),
        width = region.width,
        height = region.height
    )
    .entered();

    cfg.validate()?;
    if templates.is_empty() {
        return Err(ChipMatchError::NoTemplateSelected);
    }
    let working = WorkingImage::build(layer, region, cfg.scale_down)?;
    let bank = TemplateBank::compile(templates, cfg.orientation, cfg.scale_down)?;
    bank.ensure_fits(working.width(), working.height())?;
    let anchors = AnchorPlan::for_mode(
        cfg.grid_mode,
        grid,
        working.map(),
        working.width(),
        working.height(),
    )?;

    Ok(search_bank(
        &working,
        &bank,
        &anchors,
        &cfg.scan_params(),
        cfg.max_results,
        cfg.parallel,
        ctx,
    ))
}

/// Runs the scan over a validated bank and turns peaks into candidates.
pub(crate) fn search_bank(
    working: &WorkingImage,
    bank: &TemplateBank,
    anchors: &AnchorPlan,
    params: &ScanParams,
    max_results: usize,
    parallel: bool,
    ctx: &RunContext,
) -> Detection<MatchCandidate> {
    let image = working.view();
    let tracker = ctx.tracker(anchor_count(image, bank, anchors));

    let mut outcome = {
        let _span = trace_span!("coarse_scan", variants = bank.len()).entered();
        scan(image, bank, anchors, params, ctx, &tracker, parallel)
    };
    let cancelled = outcome.cancelled;
    trace_event!(
        "converged_peaks",
        count = outcome.peaks.len(),
        cancelled = cancelled
    );

    let frontier = outcome.peak_frontier(params, anchors);
    let mut kept = suppress_overlaps(
        &mut outcome.peaks,
        |variant| {
            bank.variant(variant)
                .map_or((0, 0), |v| (v.width(), v.height()))
        },
        OVERLAP_RATIO,
        frontier,
    );
    if max_results > 0 && kept.len() > max_results {
        kept.truncate(max_results);
    }
    trace_event!(
        "candidates",
        count = kept.len(),
        evaluated = tracker.completed()
    );

    Detection {
        items: peaks_to_candidates(&kept, bank, working.map()),
        cancelled,
    }
}

fn scan(
    image: ImageView<'_, u8>,
    bank: &TemplateBank,
    anchors: &AnchorPlan,
    params: &ScanParams,
    ctx: &RunContext,
    tracker: &ProgressTracker<'_>,
    parallel: bool,
) -> ScanOutcome {
    #[cfg(not(feature = "rayon"))]
    let _ = parallel;
    #[cfg(feature = "rayon")]
    {
        if parallel && bank.len() > 1 {
            return coarse::scan_bank_par(image, bank, anchors, params, ctx, tracker);
        }
    }
    scan_bank(image, bank, anchors, params, ctx, tracker)
}

#[cfg(test)]
mod tests {
    use super::{validate_thresholds, TemplateMatchConfig};

    #[test]
    fn config_rejects_inverted_thresholds() {
        assert!(validate_thresholds(0.8, 0.6).is_err());
        assert!(validate_thresholds(-0.1, 0.6).is_err());
        assert!(validate_thresholds(0.6, 0.6).is_ok());

        let cfg = TemplateMatchConfig {
            scale_down: 0.5,
            ..TemplateMatchConfig::default()
        };
        assert!(cfg.validate().is_err());
        assert!(TemplateMatchConfig::default().validate().is_ok());
    }
}
