use num_traits::Float;

use crate::bounds::Bounds;
use crate::convergence::{as_f64, dot};
use crate::objective::Objective;
use crate::result::TerminationReason;

/// Parameters for the bounded backtracking Wolfe line search.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WolfeParams<F> {
    /// Sufficient decrease parameter (default: 1e-4).
    pub c1: F,
    /// Curvature parameter (default: 0.9).
    pub c2: F,
    /// Step multiplier when the curvature condition fails (default: 10).
    pub grow: F,
    /// Step divisor when the decrease condition fails (default: 10).
    pub shrink: F,
    /// Trials per line search before declaring failure (default: 1000).
    pub max_line_searches: usize,
}

impl Default for WolfeParams<f64> {
    fn default() -> Self {
        WolfeParams {
            c1: 1e-4,
            c2: 0.9,
            grow: 10.0,
            shrink: 10.0,
            max_line_searches: 1000,
        }
    }
}

impl Default for WolfeParams<f32> {
    fn default() -> Self {
        WolfeParams {
            c1: 1e-4,
            c2: 0.9,
            grow: 10.0,
            shrink: 10.0,
            max_line_searches: 1000,
        }
    }
}

/// Result of a successful line search.
#[derive(Debug)]
pub struct LineSearchResult<F> {
    /// The accepted step size.
    pub step: F,
    /// The accepted point, already projected onto the bounds.
    pub x: Vec<F>,
    /// Objective value at `x`.
    pub value: F,
    /// Gradient at `x`.
    pub gradient: Vec<F>,
    /// Number of function evaluations used.
    pub evals: usize,
}

/// A line search that did not produce a new point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSearchFailure {
    /// [`TerminationReason::LineSearchFailed`] or [`TerminationReason::NumericalError`].
    pub reason: TerminationReason,
    /// Number of function evaluations used.
    pub evals: usize,
}

/// The search region around the current iterate.
pub struct SearchBox<'a, F> {
    /// Per-coordinate bounds; `None` for an unbounded coordinate.
    pub bounds: &'a [Option<Bounds<F>>],
    /// Coordinates held fixed for this step.
    pub pinned: &'a [bool],
}

impl<F: Float> SearchBox<'_, F> {
    fn project(&self, x: &[F], z: &[F], step: F, out: &mut [F]) {
        for i in 0..x.len() {
            out[i] = if self.pinned.get(i).copied().unwrap_or(false) {
                x[i]
            } else {
                let t = x[i] - step * z[i];
                match self.bounds.get(i).copied().flatten() {
                    Some(b) => b.clamp(t),
                    None => t,
                }
            };
        }
    }
}

/// Backtracking line search along `-z` satisfying the weak Wolfe conditions.
///
/// Trial points are `x - step * z` projected onto the box. `descent` is the
/// directional derivative `-z^T g` at `x` and must be negative. The decrease
/// test is `f_new <= f_x + c1 * tolerance * step * descent`, evaluated with a
/// value-only call; the gradient is only requested once it passes. On a
/// failed decrease the step shrinks, on a failed curvature test it grows,
/// unless it already shrank, in which case the point is accepted.
#[allow(clippy::too_many_arguments)]
pub fn backtracking_wolfe<F: Float, O: Objective<F>>(
    obj: &mut O,
    x: &[F],
    z: &[F],
    f_x: F,
    descent: F,
    step_init: F,
    tolerance: F,
    region: &SearchBox<'_, F>,
    params: &WolfeParams<F>,
) -> Result<LineSearchResult<F>, LineSearchFailure> {
    let n = x.len();
    let mut step = step_init;
    let mut shrunk = false;
    let mut x_new = vec![F::zero(); n];
    let mut evals = 0;

    for trial in 0..params.max_line_searches {
        region.project(x, z, step, &mut x_new);

        let f_new = obj.eval(&x_new);
        evals += 1;
        if f_new.is_nan() {
            tracing::warn!(trial, step = as_f64(step), "objective is NaN during line search");
            return Err(LineSearchFailure {
                reason: TerminationReason::NumericalError,
                evals,
            });
        }
        tracing::trace!(trial, step = as_f64(step), value = as_f64(f_new), "line search trial");

        if f_new <= f_x + params.c1 * tolerance * step * descent {
            let (f_new, g_new) = obj.eval_grad(&x_new);
            evals += 1;
            if f_new.is_nan() || g_new.iter().any(|g| g.is_nan()) {
                tracing::warn!(trial, step = as_f64(step), "gradient is NaN during line search");
                return Err(LineSearchFailure {
                    reason: TerminationReason::NumericalError,
                    evals,
                });
            }

            let curvature = -dot(z, &g_new);
            if shrunk || curvature >= params.c2 * descent {
                return Ok(LineSearchResult {
                    step,
                    x: x_new,
                    value: f_new,
                    gradient: g_new,
                    evals,
                });
            }
            step = step * params.grow;
        } else {
            step = step / params.shrink;
            shrunk = true;
        }
    }

    tracing::warn!(
        trials = params.max_line_searches,
        "line search exhausted without an acceptable step"
    );
    Err(LineSearchFailure {
        reason: TerminationReason::LineSearchFailed,
        evals,
    })
}
