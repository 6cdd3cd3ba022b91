//! Bounded hill-climbing from a coarse seed.
//!
//! A climb scores the 8-neighbourhood of the current anchor and moves to the
//! strictly best neighbour until no neighbour improves the score. Moves never
//! leave the Chebyshev ball of radius `max_step` around the seed, and a
//! grid-locked axis stays fixed.

use crate::bank::Orientation;
use crate::kernel::zncc_at;
use crate::run::RunContext;
use crate::template::TemplatePlan;
use crate::ImageView;

/// Neighbour visiting order: rows top to bottom, columns left to right.
const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Limits for one climb.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ClimbBounds {
    pub(crate) max_step: usize,
    /// Largest valid anchor x for the variant.
    pub(crate) max_x: usize,
    /// Largest valid anchor y for the variant.
    pub(crate) max_y: usize,
    pub(crate) lock_x: bool,
    pub(crate) lock_y: bool,
}

/// Position and score a climb converged to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Converged {
    pub(crate) x: usize,
    pub(crate) y: usize,
    pub(crate) score: f32,
}

/// Climbs from `seed` (already scored as `seed_score`).
///
/// Returns `None` if the run is cancelled before the climb converges.
#[allow(clippy::too_many_arguments)]
pub(crate) fn hill_climb(
    image: ImageView<'_, u8>,
    plan: &TemplatePlan,
    orientation: Orientation,
    seed: (usize, usize),
    seed_score: f32,
    bounds: ClimbBounds,
    min_var_i: f32,
    ctx: &RunContext,
) -> Option<Converged> {
    let mut current = Converged {
        x: seed.0,
        y: seed.1,
        score: seed_score,
    };

    loop {
        if ctx.is_cancelled() {
            return None;
        }

        let mut best = current;
        for (dx, dy) in NEIGHBOURS {
            if (bounds.lock_x && dx != 0) || (bounds.lock_y && dy != 0) {
                continue;
            }
            let Some(nx) = step(current.x, dx, seed.0, bounds.max_step, bounds.max_x) else {
                continue;
            };
            let Some(ny) = step(current.y, dy, seed.1, bounds.max_step, bounds.max_y) else {
                continue;
            };
            let score = zncc_at(image, plan, orientation, nx, ny, min_var_i);
            if score > best.score {
                best = Converged {
                    x: nx,
                    y: ny,
                    score,
                };
            }
        }

        if best.x == current.x && best.y == current.y {
            return Some(current);
        }
        current = best;
    }
}

/// Moves `pos` by `delta`, staying in `0..=max` and within `budget` of `seed`.
fn step(pos: usize, delta: isize, seed: usize, budget: usize, max: usize) -> Option<usize> {
    let next = pos.checked_add_signed(delta)?;
    if next > max || next.abs_diff(seed) > budget {
        return None;
    }
    Some(next)
}
