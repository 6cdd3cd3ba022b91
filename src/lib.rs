//! chipmatch is the detection core of an IC reverse-engineering workbench.
//!
//! It finds standard-cell instances (gates), interlayer connections (vias)
//! and metal traces (wires) in grayscale layer images, and checks the
//! resulting structural graph against a fixed set of rules.
//!
//! Gates and vias are found with a ZNCC correlation search: a coarse scan on
//! a downscaled working image, bounded hill-climbing from promising anchors,
//! a detection threshold and overlap suppression. Wires are traced from a
//! filtered gradient field. Every detector honours a [`run::CancelToken`]
//! and reports progress; cancelled runs return partial results.
//!
//! Optional features: `rayon` (parallel orientation scan), `simd` (`wide`
//! ZNCC kernel), `image-io` (layer image loading) and `tracing`.

pub mod bank;
mod candidate;
pub mod geometry;
pub mod image;
pub mod kernel;
pub mod model;
pub mod rules;
pub mod run;
pub mod search;
pub mod template;
mod trace;
pub mod util;
pub mod via;
pub mod wire;

pub use bank::{Orientation, OrientationMode, TemplateBank, TemplateSource};
pub use candidate::{CandidateSource, MatchCandidate};
pub use geometry::Rect;
pub use image::{ImageView, OwnedImage, ScaleMap, WorkingImage};
pub use kernel::Kernel;
pub use model::Project;
pub use rules::{check_rule_violations, CheckReport, RuleChecker, RuleViolation, ViolationKey};
pub use run::{CancelToken, Detection, Progress, RunContext};
pub use search::{run_template_match, GridConfig, GridMode, TemplateMatchConfig};
pub use template::{Template, TemplatePlan};
pub use util::{ChipMatchError, ChipMatchResult, ErrorKind};
pub use via::{detect_vias, run_via_match, ViaMatchConfig};
pub use wire::{run_wire_match, WireMatchConfig, WirePolyline};
