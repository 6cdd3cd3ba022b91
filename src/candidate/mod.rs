//! Candidate ranking, pruning and the public match record.

pub(crate) mod nms;
pub(crate) mod rank;

use crate::bank::{Orientation, TemplateBank};
use crate::image::ScaleMap;
use crate::model::{TemplateId, ViaDirection};
use rank::Peak;

/// What produced a candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// A gate template from the library.
    Template(TemplateId),
    /// The synthetic via template for a direction.
    Via(ViaDirection),
}

/// Transient detection result in source-layer coordinates.
///
/// `x`/`y` address the top-left corner of the matched box; the caller turns
/// candidates into gate, via or wire objects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchCandidate {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub orientation: Orientation,
    pub score: f32,
    pub source: CandidateSource,
}

impl MatchCandidate {
    /// Center of the matched box.
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width * 0.5, self.y + self.height * 0.5)
    }
}

pub(crate) fn peaks_to_candidates(
    peaks: &[Peak],
    bank: &TemplateBank,
    map: &ScaleMap,
) -> Vec<MatchCandidate> {
    peaks
        .iter()
        .filter_map(|peak| {
            let variant = bank.variant(peak.variant)?;
            let (x, y) = map.corner_to_source(peak.x as f32, peak.y as f32);
            Some(MatchCandidate {
                x,
                y,
                width: map.length_to_source(variant.width() as f32),
                height: map.length_to_source(variant.height() as f32),
                orientation: variant.orientation(),
                score: peak.score,
                source: variant.source(),
            })
        })
        .collect()
}
