//! Wire detection: filtering, edge pairing and centerline tracing.
//!
//! The working image goes through an optional median filter and an optional
//! Gaussian blur before the Sobel operator, all from `imageproc`. Columns are scanned for horizontal
//! wires and rows for vertical wires; see [`centerline`] for the pairing and
//! chaining rules. The result is deterministic for a given image and config.

pub(crate) mod centerline;
pub mod filter;

use crate::geometry::Rect;
use crate::image::pyramid::validate_factor;
use crate::image::{OwnedImage, ScaleMap, WorkingImage};
use crate::run::{Detection, ProgressTracker, RunContext};
use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::{ChipMatchError, ChipMatchResult};
use crate::ImageView;
use centerline::{line_samples, polyline_length, simplify, ChainBuilder, Sample, WidthRange};
use filter::{gaussian_blur, median_filter, sobel, to_gray_image, GradientField};

/// Configuration for wire detection. Lengths are in source pixels.
#[derive(Clone, Debug)]
pub struct WireMatchConfig {
    pub scale_down: f32,
    /// Odd median window width; 0 disables the filter.
    pub median_width: usize,
    /// Gaussian sigma in working pixels; 0 disables the blur.
    pub gaussian_sigma: f32,
    /// Minimum gradient magnitude of an edge pixel.
    pub min_edge_magnitude: f32,
    /// Expected wire width.
    pub diameter: f32,
    /// Relative tolerance on the measured width.
    pub diameter_tolerance: f32,
    /// Shortest centerline kept.
    pub min_length: f32,
    /// Ramer-Douglas-Peucker tolerance.
    pub simplify_tolerance: f32,
}

impl Default for WireMatchConfig {
    fn default() -> Self {
        Self {
            scale_down: 1.0,
            median_width: 3,
            gaussian_sigma: 1.0,
            min_edge_magnitude: 100.0,
            diameter: 6.0,
            diameter_tolerance: 0.3,
            min_length: 10.0,
            simplify_tolerance: 1.0,
        }
    }
}

impl WireMatchConfig {
    pub fn validate(&self) -> ChipMatchResult<()> {
        validate_factor(self.scale_down)?;
        if self.median_width > 1 && self.median_width % 2 == 0 {
            return Err(ChipMatchError::InvalidConfig {
                reason: "median width must be odd",
            });
        }
        if !self.gaussian_sigma.is_finite() || self.gaussian_sigma < 0.0 {
            return Err(ChipMatchError::InvalidConfig {
                reason: "gaussian sigma must be finite and non-negative",
            });
        }
        if !self.min_edge_magnitude.is_finite() || self.min_edge_magnitude <= 0.0 {
            return Err(ChipMatchError::InvalidConfig {
                reason: "edge magnitude threshold must be positive",
            });
        }
        if !self.diameter.is_finite() || self.diameter < 1.0 {
            return Err(ChipMatchError::InvalidConfig {
                reason: "wire diameter must be finite and >= 1",
            });
        }
        if !(0.0..1.0).contains(&self.diameter_tolerance) {
            return Err(ChipMatchError::InvalidConfig {
                reason: "diameter tolerance must lie in [0, 1)",
            });
        }
        if !self.min_length.is_finite() || self.min_length < 0.0 {
            return Err(ChipMatchError::InvalidConfig {
                reason: "min length must be finite and non-negative",
            });
        }
        if !self.simplify_tolerance.is_finite() || self.simplify_tolerance < 0.0 {
            return Err(ChipMatchError::InvalidConfig {
                reason: "simplify tolerance must be finite and non-negative",
            });
        }
        Ok(())
    }
}

/// Detected wire centerline in source-layer coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct WirePolyline {
    /// Pixel-center coordinates `[x, y]`.
    pub points: Vec<[f32; 2]>,
    /// Mean measured width.
    pub diameter: f32,
}

impl WirePolyline {
    pub fn length(&self) -> f32 {
        polyline_length(&self.points)
    }

    fn min_corner(&self) -> (f32, f32) {
        self.points.iter().fold((f32::INFINITY, f32::INFINITY), |acc, p| {
            (acc.0.min(p[0]), acc.1.min(p[1]))
        })
    }
}

/// Orientation of the wires a scan pass looks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    /// Scan columns top to bottom; finds horizontal wires.
    Horizontal,
    /// Scan rows left to right; finds vertical wires.
    Vertical,
}

/// Filtered gradient field of a working image.
pub fn edge_field(image: &OwnedImage, cfg: &WireMatchConfig) -> ChipMatchResult<GradientField> {
    let denoised = median_filter(to_gray_image(image)?, cfg.median_width)?;
    let smoothed = gaussian_blur(denoised, cfg.gaussian_sigma)?;
    Ok(sobel(&smoothed))
}

/// Detects wire centerlines in `region` of `layer`.
///
/// Polylines are sorted by their smallest x, then smallest y. A cancelled
/// run returns the wires traced from the scan lines finished so far.
pub fn run_wire_match(
    layer: ImageView<'_, u8>,
    region: Rect,
    cfg: &WireMatchConfig,
    ctx: &RunContext,
) -> ChipMatchResult<Detection<WirePolyline>> {
    let _span = trace_span!(
        "wire_match",
        width = region.width,
        height = region.height,
        diameter = cfg.diameter
    )
    .entered();

    cfg.validate()?;
    let working = WorkingImage::build(layer, region, cfg.scale_down)?;
    let field = {
        let _span = trace_span!("edge_filter").entered();
        edge_field(working.image(), cfg)?
    };

    let map = working.map();
    let widths = WidthRange::around(map.length_to_scaled(cfg.diameter), cfg.diameter_tolerance);
    let tracker = ctx.tracker((working.width() + working.height()) as u64);

    let mut items = Vec::new();
    let mut cancelled = false;
    for pass in [Pass::Horizontal, Pass::Vertical] {
        let (chains, stopped) = trace_pass(&field, pass, cfg.min_edge_magnitude, widths, ctx, &tracker);
        items.extend(
            chains
                .into_iter()
                .filter_map(|chain| to_polyline(&chain, pass, map, cfg)),
        );
        if stopped {
            cancelled = true;
            break;
        }
    }

    items.sort_by(|a, b| {
        let (ax, ay) = a.min_corner();
        let (bx, by) = b.min_corner();
        ax.total_cmp(&bx).then(ay.total_cmp(&by))
    });
    trace_event!("wires", count = items.len(), cancelled = cancelled);
    Ok(Detection { items, cancelled })
}

fn trace_pass(
    field: &GradientField,
    pass: Pass,
    threshold: f32,
    widths: WidthRange,
    ctx: &RunContext,
    tracker: &ProgressTracker<'_>,
) -> (Vec<Vec<Sample>>, bool) {
    let width = field.magnitude.width();
    let height = field.magnitude.height();
    let (lines, len) = match pass {
        Pass::Horizontal => (width, height),
        Pass::Vertical => (height, width),
    };

    let mut builder = ChainBuilder::default();
    let mut magnitude = vec![0.0; len];
    let mut directional = vec![0.0; len];
    for line in 0..lines {
        if ctx.is_cancelled() {
            trace_debug!("wire_cancelled", line = line);
            return (builder.finish(), true);
        }
        for i in 0..len {
            let (x, y) = match pass {
                Pass::Horizontal => (line, i),
                Pass::Vertical => (i, line),
            };
            magnitude[i] = field.magnitude.get(x, y);
            directional[i] = match pass {
                Pass::Horizontal => field.gy.get(x, y),
                Pass::Vertical => field.gx.get(x, y),
            };
        }
        let samples = line_samples(line, &magnitude, &directional, threshold, widths);
        builder.push_line(line, &samples);
        tracker.advance(1);
    }
    (builder.finish(), false)
}

fn to_polyline(
    chain: &[Sample],
    pass: Pass,
    map: &ScaleMap,
    cfg: &WireMatchConfig,
) -> Option<WirePolyline> {
    let points: Vec<[f32; 2]> = chain
        .iter()
        .map(|s| {
            let (x, y) = match pass {
                Pass::Horizontal => map.center_to_source(s.line as f32, s.offset),
                Pass::Vertical => map.center_to_source(s.offset, s.line as f32),
            };
            [x, y]
        })
        .collect();
    if points.len() < 2 || polyline_length(&points) < cfg.min_length {
        return None;
    }
    let mean_width = chain.iter().map(|s| s.width).sum::<f32>() / chain.len() as f32;
    Some(WirePolyline {
        points: simplify(&points, cfg.simplify_tolerance),
        diameter: map.length_to_source(mean_width),
    })
}

#[cfg(test)]
mod tests {
    use super::{run_wire_match, WireMatchConfig};
    use crate::geometry::Rect;
    use crate::image::OwnedImage;
    use crate::run::RunContext;

    #[test]
    fn traces_horizontal_bar() {
        let img =
            OwnedImage::from_fn(60, 40, |x, y| if (20..26).contains(&y) && (5..55).contains(&x) { 210 } else { 30 })
                .unwrap();
        let cfg = WireMatchConfig {
            median_width: 0,
            gaussian_sigma: 0.0,
            ..WireMatchConfig::default()
        };
        let wires = run_wire_match(img.view(), Rect::full(60, 40), &cfg, &RunContext::new()).unwrap();
        assert!(!wires.cancelled);
        assert_eq!(wires.len(), 1);
        let wire = &wires.items[0];
        assert!(wire.points.iter().all(|p| (p[1] - 22.5).abs() < 1e-3));
        assert!((wire.diameter - 6.0).abs() < 1e-3);
        assert!(wire.length() > 40.0);
        assert_eq!(wire.points.len(), 2);
    }

    #[test]
    fn even_median_width_is_rejected() {
        let img = OwnedImage::from_fn(8, 8, |x, _| x as u8).unwrap();
        let cfg = WireMatchConfig {
            median_width: 4,
            ..WireMatchConfig::default()
        };
        assert!(run_wire_match(img.view(), Rect::full(8, 8), &cfg, &RunContext::new()).is_err());
    }
}
