//! Orientation tags and the orientation enumerator.

use crate::image::{ImageView, OwnedImage};
use crate::template::flip::{flip_both, flip_left_right, flip_up_down};
use crate::util::ChipMatchResult;

/// Placement orientation of a gate instance relative to its template.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Orientation {
    #[default]
    Undefined,
    Normal,
    FlipLeftRight,
    FlipUpDown,
    FlipBoth,
}

impl Orientation {
    /// Renders the template bitmap as it appears with this orientation.
    ///
    /// `Undefined` is treated as `Normal`.
    pub fn apply(self, src: ImageView<'_, u8>) -> ChipMatchResult<OwnedImage> {
        match self {
            Orientation::Undefined | Orientation::Normal => OwnedImage::from_view(src),
            Orientation::FlipLeftRight => flip_left_right(src),
            Orientation::FlipUpDown => flip_up_down(src),
            Orientation::FlipBoth => flip_both(src),
        }
    }

    /// Whether template columns are read right to left.
    pub fn mirrors_columns(self) -> bool {
        matches!(self, Orientation::FlipLeftRight | Orientation::FlipBoth)
    }

    /// Whether template rows are read bottom to top.
    pub fn mirrors_rows(self) -> bool {
        matches!(self, Orientation::FlipUpDown | Orientation::FlipBoth)
    }

    /// Maps a template-relative point to its placed position inside a
    /// `width` x `height` box.
    pub fn transform_point(self, x: f32, y: f32, width: f32, height: f32) -> (f32, f32) {
        match self {
            Orientation::Undefined | Orientation::Normal => (x, y),
            Orientation::FlipLeftRight => (width - 1.0 - x, y),
            Orientation::FlipUpDown => (x, height - 1.0 - y),
            Orientation::FlipBoth => (width - 1.0 - x, height - 1.0 - y),
        }
    }
}

/// Orientation request for a matching run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OrientationMode {
    #[default]
    Any,
    Normal,
    FlipLeftRight,
    FlipUpDown,
    FlipBoth,
}

const ALL: [Orientation; 4] = [
    Orientation::Normal,
    Orientation::FlipLeftRight,
    Orientation::FlipUpDown,
    Orientation::FlipBoth,
];

impl OrientationMode {
    /// Concrete orientations to evaluate, in evaluation order.
    pub fn orientations(self) -> &'static [Orientation] {
        match self {
            OrientationMode::Any => &ALL,
            OrientationMode::Normal => &ALL[0..1],
            OrientationMode::FlipLeftRight => &ALL[1..2],
            OrientationMode::FlipUpDown => &ALL[2..3],
            OrientationMode::FlipBoth => &ALL[3..4],
        }
    }
}

/// Produces the template variants requested by `mode`.
pub fn enumerate_variants(
    tpl: ImageView<'_, u8>,
    mode: OrientationMode,
) -> ChipMatchResult<Vec<(OwnedImage, Orientation)>> {
    mode.orientations()
        .iter()
        .map(|&orientation| Ok((orientation.apply(tpl)?, orientation)))
        .collect()
}
