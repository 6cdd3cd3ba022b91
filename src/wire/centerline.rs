//! Centerline extraction from a gradient field.
//!
//! A bright wire crossing a scan line produces two edge runs: a rising one
//! (dark to bright) followed by a falling one. When the runs sit one wire
//! diameter apart, their midpoint is a centerline sample. Samples on
//! neighbouring scan lines that are at most one pixel apart form chains.

use crate::util::math::point_segment_distance;

/// Contiguous stretch of edge pixels on one scan line.
#[derive(Clone, Copy, Debug, PartialEq)]
struct EdgeRun {
    /// Magnitude-weighted center.
    center: f32,
    /// Sum of the directional gradient over the run.
    polarity: f32,
}

/// Centerline crossing on one scan line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Sample {
    /// Index of the scan line (column for horizontal wires, row for vertical).
    pub(crate) line: usize,
    /// Position along the scan line.
    pub(crate) offset: f32,
    /// Distance between the paired edges.
    pub(crate) width: f32,
}

/// Acceptance window for the edge distance of a wire.
#[derive(Clone, Copy, Debug)]
pub(crate) struct WidthRange {
    pub(crate) min: f32,
    pub(crate) max: f32,
}

impl WidthRange {
    pub(crate) fn around(diameter: f32, tolerance: f32) -> Self {
        Self {
            min: diameter * (1.0 - tolerance),
            max: diameter * (1.0 + tolerance),
        }
    }

    fn contains(&self, width: f32) -> bool {
        width >= self.min && width <= self.max
    }
}

fn edge_runs(magnitude: &[f32], directional: &[f32], threshold: f32) -> Vec<EdgeRun> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < magnitude.len() {
        if magnitude[i] < threshold {
            i += 1;
            continue;
        }
        let mut weight = 0.0;
        let mut moment = 0.0;
        let mut polarity = 0.0;
        while i < magnitude.len() && magnitude[i] >= threshold {
            weight += magnitude[i];
            moment += magnitude[i] * i as f32;
            polarity += directional[i];
            i += 1;
        }
        runs.push(EdgeRun {
            center: moment / weight,
            polarity,
        });
    }
    runs
}

/// Pairs each rising run with the run right after it if that one falls and
/// the distance fits `widths`.
pub(crate) fn line_samples(
    line: usize,
    magnitude: &[f32],
    directional: &[f32],
    threshold: f32,
    widths: WidthRange,
) -> Vec<Sample> {
    let runs = edge_runs(magnitude, directional, threshold);
    let mut out = Vec::new();
    let mut i = 0;
    while i + 1 < runs.len() {
        let (rise, fall) = (runs[i], runs[i + 1]);
        let width = fall.center - rise.center;
        if rise.polarity > 0.0 && fall.polarity < 0.0 && widths.contains(width) {
            out.push(Sample {
                line,
                offset: (rise.center + fall.center) * 0.5,
                width,
            });
            i += 2;
        } else {
            i += 1;
        }
    }
    out
}

/// Links samples of consecutive scan lines into chains.
#[derive(Debug, Default)]
pub(crate) struct ChainBuilder {
    open: Vec<Vec<Sample>>,
    closed: Vec<Vec<Sample>>,
}

impl ChainBuilder {
    /// Adds the samples of scan line `line`; lines must arrive in order.
    pub(crate) fn push_line(&mut self, line: usize, samples: &[Sample]) {
        let mut open = Vec::with_capacity(self.open.len());
        for chain in self.open.drain(..) {
            let adjacent = chain
                .last()
                .is_some_and(|last| last.line + 1 == line);
            if adjacent {
                open.push(chain);
            } else {
                self.closed.push(chain);
            }
        }

        let previous = open.len();
        let mut extended = vec![false; previous];
        for sample in samples {
            let mut best: Option<(usize, f32)> = None;
            for (idx, chain) in open.iter().take(previous).enumerate() {
                if extended[idx] {
                    continue;
                }
                let Some(last) = chain.last() else {
                    continue;
                };
                let dist = (last.offset - sample.offset).abs();
                if dist <= 1.0 && best.map_or(true, |(_, d)| dist < d) {
                    best = Some((idx, dist));
                }
            }
            match best {
                Some((idx, _)) => {
                    extended[idx] = true;
                    open[idx].push(*sample);
                }
                None => open.push(vec![*sample]),
            }
        }
        self.open = open;
    }

    /// All chains, in order of their first sample.
    pub(crate) fn finish(mut self) -> Vec<Vec<Sample>> {
        self.closed.append(&mut self.open);
        self.closed
            .sort_by(|a, b| match (a.first(), b.first()) {
                (Some(a), Some(b)) => a.line.cmp(&b.line).then(a.offset.total_cmp(&b.offset)),
                _ => std::cmp::Ordering::Equal,
            });
        self.closed
    }
}

/// Total length of a polyline.
pub(crate) fn polyline_length(points: &[[f32; 2]]) -> f32 {
    points
        .windows(2)
        .map(|w| (w[1][0] - w[0][0]).hypot(w[1][1] - w[0][1]))
        .sum()
}

/// Ramer-Douglas-Peucker simplification keeping both endpoints.
pub(crate) fn simplify(points: &[[f32; 2]], epsilon: f32) -> Vec<[f32; 2]> {
    if points.len() < 3 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    let mut stack = vec![(0usize, points.len() - 1)];
    while let Some((first, last)) = stack.pop() {
        let mut split = None;
        let mut max_dist = epsilon;
        for idx in first + 1..last {
            let dist = point_segment_distance(points[idx], points[first], points[last]);
            if dist > max_dist {
                max_dist = dist;
                split = Some(idx);
            }
        }
        if let Some(idx) = split {
            keep[idx] = true;
            stack.push((first, idx));
            stack.push((idx, last));
        }
    }
    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}
