//! Project grids and the anchor sets they induce.
//!
//! Standard cells are usually placed in rows (or columns) at a fixed pitch.
//! A grid-restricted search only visits anchors whose locked coordinate lies
//! on a grid line, so it evaluates a subset of the raster anchors and never
//! reorders what it finds.

use crate::image::ScaleMap;
use crate::search::GridMode;
use crate::util::{ChipMatchError, ChipMatchResult};

/// Equally spaced grid lines at `offset + k * spacing` (source pixels).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RegularGrid {
    pub offset: f32,
    pub spacing: f32,
}

impl RegularGrid {
    pub fn new(offset: f32, spacing: f32) -> Self {
        Self { offset, spacing }
    }

    pub fn validate(&self) -> ChipMatchResult<()> {
        if !self.offset.is_finite() {
            return Err(ChipMatchError::InvalidConfig {
                reason: "grid offset must be finite",
            });
        }
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(ChipMatchError::InvalidConfig {
                reason: "grid spacing must be positive",
            });
        }
        Ok(())
    }

    /// Grid line coordinates in `[start, end)`, in ascending order.
    ///
    /// Lines are indexed by integer `k`, so the sequence always ends; its
    /// length is about `(end - start) / spacing`.
    pub fn lines(&self, start: f32, end: f32) -> impl Iterator<Item = f32> {
        let offset = f64::from(self.offset);
        let spacing = f64::from(self.spacing);
        let indices = if self.validate().is_ok() && end > start {
            let first = ((f64::from(start) - offset) / spacing).ceil() as i64;
            let last = ((f64::from(end) - offset) / spacing).ceil() as i64;
            first..last
        } else {
            0..0
        };
        indices
            .map(move |k| (offset + k as f64 * spacing) as f32)
            .filter(move |&line| line >= start && line < end)
    }
}

/// Grids of a project: `rows` are horizontal lines (y), `columns` vertical
/// lines (x).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GridConfig {
    pub rows: Option<RegularGrid>,
    pub columns: Option<RegularGrid>,
}

impl GridConfig {
    pub fn validate(&self) -> ChipMatchResult<()> {
        if let Some(rows) = &self.rows {
            rows.validate()?;
        }
        if let Some(columns) = &self.columns {
            columns.validate()?;
        }
        Ok(())
    }
}

/// Anchor coordinates at working scale; `None` means every position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct AnchorPlan {
    xs: Option<Vec<usize>>,
    ys: Option<Vec<usize>>,
}

impl AnchorPlan {
    /// Every raster anchor.
    pub(crate) fn raster() -> Self {
        Self::default()
    }

    /// Anchor plan for `mode`, mapping the needed grid into working pixels.
    ///
    /// `width`/`height` are the working image size.
    pub(crate) fn for_mode(
        mode: GridMode,
        grid: &GridConfig,
        map: &ScaleMap,
        width: usize,
        height: usize,
    ) -> ChipMatchResult<Self> {
        match mode {
            GridMode::Default => Ok(Self::raster()),
            GridMode::AlongGridRows => {
                let rows = grid.rows.ok_or(ChipMatchError::InvalidConfig {
                    reason: "grid mode needs row grid",
                })?;
                rows.validate()?;
                let (_, top) = map.corner_to_source(0.0, 0.0);
                let (_, bottom) = map.corner_to_source(0.0, height as f32);
                let ys = grid_axis(&rows, map, top, bottom, height, |line| {
                    map.corner_to_scaled(0.0, line).1
                });
                Ok(Self {
                    xs: None,
                    ys: Some(ys),
                })
            }
            GridMode::AlongGridColumns => {
                let columns = grid.columns.ok_or(ChipMatchError::InvalidConfig {
                    reason: "grid mode needs column grid",
                })?;
                columns.validate()?;
                let (left, _) = map.corner_to_source(0.0, 0.0);
                let (right, _) = map.corner_to_source(width as f32, 0.0);
                let xs = grid_axis(&columns, map, left, right, width, |line| {
                    map.corner_to_scaled(line, 0.0).0
                });
                Ok(Self {
                    xs: Some(xs),
                    ys: None,
                })
            }
        }
    }

    pub(crate) fn lock_x(&self) -> bool {
        self.xs.is_some()
    }

    pub(crate) fn lock_y(&self) -> bool {
        self.ys.is_some()
    }

    /// Anchor x coordinates for a template that can be placed at `0..=max_x`.
    pub(crate) fn xs(&self, max_x: usize) -> Vec<usize> {
        axis(self.xs.as_deref(), max_x)
    }

    pub(crate) fn ys(&self, max_y: usize) -> Vec<usize> {
        axis(self.ys.as_deref(), max_y)
    }
}

fn axis(lines: Option<&[usize]>, max: usize) -> Vec<usize> {
    match lines {
        Some(lines) => lines.iter().copied().filter(|&v| v <= max).collect(),
        None => (0..=max).collect(),
    }
}

/// Working-pixel anchors of `grid` lines in source range `[start, end)`.
///
/// A grid no coarser than one working pixel hits every pixel of the axis.
fn grid_axis<F>(
    grid: &RegularGrid,
    map: &ScaleMap,
    start: f32,
    end: f32,
    len: usize,
    to_scaled: F,
) -> Vec<usize>
where
    F: Fn(f32) -> f32,
{
    if map.length_to_scaled(grid.spacing) <= 1.0 {
        return (0..len).collect();
    }
    snap(grid.lines(start, end).map(to_scaled), len)
}

/// Rounds scaled line positions to pixels inside `0..len`, sorted and unique.
fn snap(lines: impl Iterator<Item = f32>, len: usize) -> Vec<usize> {
    let mut out: Vec<usize> = lines
        .map(|v| v.round())
        .filter(|v| *v >= 0.0 && (*v as usize) < len)
        .map(|v| v as usize)
        .collect();
    out.sort_unstable();
    out.dedup();
    out
}
