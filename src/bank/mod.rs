//! Precomputed template variants for a matching run.
//!
//! A bank holds every (template, orientation) pair a run evaluates. Each
//! template is downscaled with the same area averaging as the working image
//! and planned once; its orientation variants share that plan and the kernel
//! reads it mirrored, so no flipped bitmap is materialized.

mod orientation;

pub use orientation::{enumerate_variants, Orientation, OrientationMode};

use std::sync::Arc;

use crate::candidate::CandidateSource;
use crate::image::pyramid::validate_factor;
use crate::image::{downscale_area, ImageView};
use crate::template::TemplatePlan;
use crate::util::{ChipMatchError, ChipMatchResult};

/// A template bitmap at source resolution together with its identity.
#[derive(Clone, Copy, Debug)]
pub struct TemplateSource<'a> {
    pub source: CandidateSource,
    pub image: ImageView<'a, u8>,
}

/// One scaled template placed with a given orientation.
#[derive(Clone, Debug)]
pub struct Variant {
    source: CandidateSource,
    orientation: Orientation,
    plan: Arc<TemplatePlan>,
}

impl Variant {
    pub fn source(&self) -> CandidateSource {
        self.source
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Width at working scale.
    pub fn width(&self) -> usize {
        self.plan.width()
    }

    /// Height at working scale.
    pub fn height(&self) -> usize {
        self.plan.height()
    }

    /// Plan of the unflipped template; read it through [`Self::orientation`].
    pub(crate) fn plan(&self) -> &TemplatePlan {
        &self.plan
    }
}

/// Ordered set of template variants: templates outer, orientations inner.
#[derive(Clone, Debug, Default)]
pub struct TemplateBank {
    variants: Vec<Variant>,
}

impl TemplateBank {
    /// Downscales every template by `factor` and enumerates `mode`.
    ///
    /// Fails with `NoTemplateSelected` when `templates` is empty and with
    /// `DegenerateTemplate` when a scaled variant is flat.
    pub fn compile(
        templates: &[TemplateSource<'_>],
        mode: OrientationMode,
        factor: f32,
    ) -> ChipMatchResult<Self> {
        validate_factor(factor)?;
        if templates.is_empty() {
            return Err(ChipMatchError::NoTemplateSelected);
        }

        let mut variants = Vec::with_capacity(templates.len() * mode.orientations().len());
        for tpl in templates {
            let scaled = downscale_area(tpl.image, factor)?;
            let plan = Arc::new(TemplatePlan::from_view(scaled.view())?);
            for &orientation in mode.orientations() {
                variants.push(Variant {
                    source: tpl.source,
                    orientation,
                    plan: Arc::clone(&plan),
                });
            }
        }
        if variants.is_empty() {
            return Err(ChipMatchError::NoTemplateSelected);
        }
        Ok(Self { variants })
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    pub fn variant(&self, idx: usize) -> Option<&Variant> {
        self.variants.get(idx)
    }

    /// Fails with `TemplateTooLarge` if any variant exceeds the search area.
    pub fn ensure_fits(&self, area_width: usize, area_height: usize) -> ChipMatchResult<()> {
        for variant in &self.variants {
            if variant.width() > area_width || variant.height() > area_height {
                return Err(ChipMatchError::TemplateTooLarge {
                    tpl_width: variant.width(),
                    tpl_height: variant.height(),
                    area_width,
                    area_height,
                });
            }
        }
        Ok(())
    }
}
