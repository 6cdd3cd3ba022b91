//! Via detection with a synthetic disc template.
//!
//! Vias show up as bright round spots of a known diameter. The detector
//! renders a disc template, downscales it like any gate template and runs the
//! correlation search with the Normal orientation only (a disc is symmetric
//! under every flip).

use crate::bank::{OrientationMode, TemplateBank, TemplateSource};
use crate::candidate::{CandidateSource, MatchCandidate};
use crate::geometry::Rect;
use crate::image::pyramid::validate_factor;
use crate::image::WorkingImage;
use crate::model::{LayerId, LayerStack, ViaDirection};
use crate::run::{Detection, RunContext};
use crate::search::coarse::ScanParams;
use crate::search::grid::AnchorPlan;
use crate::search::{search_bank, validate_min_var, validate_thresholds};
use crate::template::synth::disc_template;
use crate::trace::{trace_event, trace_span};
use crate::util::{ChipMatchError, ChipMatchResult};
use crate::ImageView;

/// Configuration for via detection.
#[derive(Clone, Debug)]
pub struct ViaMatchConfig {
    /// Which adjacent layer is scanned; `Undefined` is rejected.
    pub direction: ViaDirection,
    /// Via diameter in source pixels.
    pub diameter: f32,
    pub scale_down: f32,
    pub climb_threshold: f32,
    pub detect_threshold: f32,
    /// Chebyshev climb radius in working pixels.
    pub max_step: usize,
    /// Keep at most this many vias after NMS (0 = all).
    pub max_count: usize,
    pub min_var_i: f32,
}

impl Default for ViaMatchConfig {
    fn default() -> Self {
        Self {
            direction: ViaDirection::Up,
            diameter: 6.0,
            scale_down: 1.0,
            climb_threshold: 0.5,
            detect_threshold: 0.7,
            max_step: 2,
            max_count: 0,
            min_var_i: 1e-3,
        }
    }
}

impl ViaMatchConfig {
    pub fn validate(&self) -> ChipMatchResult<()> {
        if self.direction == ViaDirection::Undefined {
            return Err(ChipMatchError::InvalidConfig {
                reason: "via direction must be up or down",
            });
        }
        if !self.diameter.is_finite() || self.diameter < 1.0 {
            return Err(ChipMatchError::InvalidConfig {
                reason: "via diameter must be finite and >= 1",
            });
        }
        validate_factor(self.scale_down)?;
        validate_thresholds(self.climb_threshold, self.detect_threshold)?;
        validate_min_var(self.min_var_i)
    }
}

/// Detects vias in `region` of the layer adjacent to `base` in the
/// configured direction (Up: one position higher, Down: one lower).
pub fn run_via_match(
    layers: &LayerStack,
    base: LayerId,
    region: Rect,
    cfg: &ViaMatchConfig,
    ctx: &RunContext,
) -> ChipMatchResult<Detection<MatchCandidate>> {
    cfg.validate()?;
    let target = layers.adjacent(base, cfg.direction)?;
    let image = target.require_image()?;
    detect_vias(image.view(), region, cfg, ctx)
}

/// Detects vias in `region` of `image`.
///
/// Candidates carry `CandidateSource::Via(direction)`; the via center is the
/// candidate box center.
pub fn detect_vias(
    image: ImageView<'_, u8>,
    region: Rect,
    cfg: &ViaMatchConfig,
    ctx: &RunContext,
) -> ChipMatchResult<Detection<MatchCandidate>> {
    let _span = trace_span!(
        "via_match",
        diameter = cfg.diameter,
        width = region.width,
        height = region.height
    )
    .entered();

    cfg.validate()?;
    let disc = disc_template(cfg.diameter)?;
    let sources = [TemplateSource {
        source: CandidateSource::Via(cfg.direction),
        image: disc.view(),
    }];
    let working = WorkingImage::build(image, region, cfg.scale_down)?;
    let bank = TemplateBank::compile(&sources, OrientationMode::Normal, cfg.scale_down)?;
    bank.ensure_fits(working.width(), working.height())?;

    let params = ScanParams {
        climb_threshold: cfg.climb_threshold,
        detect_threshold: cfg.detect_threshold,
        max_step: cfg.max_step,
        min_var_i: cfg.min_var_i,
    };
    let detection = search_bank(
        &working,
        &bank,
        &AnchorPlan::raster(),
        &params,
        cfg.max_count,
        false,
        ctx,
    );
    trace_event!("vias", count = detection.len(), cancelled = detection.cancelled);
    Ok(detection)
}

#[cfg(test)]
mod tests {
    use super::{detect_vias, ViaMatchConfig};
    use crate::geometry::Rect;
    use crate::image::OwnedImage;
    use crate::model::ViaDirection;
    use crate::run::RunContext;
    use crate::util::ChipMatchError;

    #[test]
    fn undefined_direction_is_rejected() {
        let img = OwnedImage::from_fn(32, 32, |x, _| (x * 7) as u8).unwrap();
        let cfg = ViaMatchConfig {
            direction: ViaDirection::Undefined,
            ..ViaMatchConfig::default()
        };
        let err = detect_vias(img.view(), Rect::full(32, 32), &cfg, &RunContext::new()).unwrap_err();
        assert!(matches!(err, ChipMatchError::InvalidConfig { .. }));
    }

    #[test]
    fn finds_disc_center() {
        // Disc of diameter 6 centred at continuous (20, 14).
        let img = OwnedImage::from_fn(40, 30, |x, y| {
            let dx = x as f32 + 0.5 - 20.0;
            let dy = y as f32 + 0.5 - 14.0;
            if dx * dx + dy * dy <= 9.0 {
                230
            } else {
                20
            }
        })
        .unwrap();
        let cfg = ViaMatchConfig::default();
        let found = detect_vias(img.view(), Rect::full(40, 30), &cfg, &RunContext::new()).unwrap();
        assert_eq!(found.len(), 1);
        let (cx, cy) = found.items[0].center();
        assert!((cx - 20.0).abs() <= 0.5 && (cy - 14.0).abs() <= 0.5);
        assert!(found.items[0].score > 0.99);
    }
}
