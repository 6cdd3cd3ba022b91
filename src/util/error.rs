//! Error types for chipmatch.

use thiserror::Error;

/// Result alias for chipmatch operations.
pub type ChipMatchResult<T> = std::result::Result<T, ChipMatchError>;

/// Broad classification of [`ChipMatchError`] values.
///
/// Validation errors are raised before any scanning starts and are fixed by
/// re-configuring. Resource errors abort a run without partial results.
/// Graph errors reject a whole rule-check pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Resource,
    Graph,
}

/// Errors that can occur when running chipmatch algorithms.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ChipMatchError {
    /// Image dimensions are zero or overflow.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer does not cover the requested view.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// The requested rectangle is empty or leaves the layer image.
    #[error(
        "region ({x}, {y}) {width}x{height} is outside the layer image {img_width}x{img_height}"
    )]
    InvalidRegion {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// A configuration value is out of range.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: &'static str },
    /// The run has no template variant to evaluate.
    #[error("no template selected")]
    NoTemplateSelected,
    /// A template variant does not fit into the search area.
    #[error(
        "template {tpl_width}x{tpl_height} is larger than the search area {area_width}x{area_height}"
    )]
    TemplateTooLarge {
        tpl_width: usize,
        tpl_height: usize,
        area_width: usize,
        area_height: usize,
    },
    /// The template cannot be normalized.
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// A layer id does not exist in the project.
    #[error("unknown layer {id}")]
    UnknownLayer { id: u32 },
    /// A gate template id does not exist in the library.
    #[error("unknown gate template {id}")]
    UnknownTemplate { id: u64 },
    /// A graph object id does not exist.
    #[error("unknown object {id}")]
    UnknownObject { id: u64 },
    /// There is no layer in the requested via direction.
    #[error("no layer adjacent to layer {base} in the requested direction")]
    NoAdjacentLayer { base: u32 },
    /// Another detection run holds the project's run gate.
    #[error("a detection run is already active")]
    RunInProgress,
    /// The layer has no image attached.
    #[error("layer {id} has no image")]
    MissingImage { id: u32 },
    /// Loading or decoding an image failed.
    #[error("image i/o failed: {reason}")]
    ImageIo { reason: String },
    /// The geometry graph is inconsistent.
    #[error("malformed graph: {reason}")]
    MalformedGraph { reason: String },
}

impl ChipMatchError {
    /// Returns the taxonomy class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingImage { .. } | Self::ImageIo { .. } => ErrorKind::Resource,
            Self::MalformedGraph { .. } => ErrorKind::Graph,
            _ => ErrorKind::Validation,
        }
    }
}
