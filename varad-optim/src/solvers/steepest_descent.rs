use num_traits::Float;

use crate::bounds::Bounds;
use crate::objective::Objective;
use crate::result::OptimResult;
use crate::solvers::lbfgs::{minimize, LbfgsConfig};

/// Bounded steepest descent.
///
/// The L-BFGS driver with no curvature memory: every direction is the
/// projected gradient and every line search starts at `min(1, 1/||g||)`.
/// `config.memory` is ignored.
pub fn steepest_descent<F: Float, O: Objective<F>>(
    obj: &mut O,
    x0: &[F],
    bounds: &[Option<Bounds<F>>],
    config: &LbfgsConfig<F>,
) -> OptimResult<F> {
    minimize(obj, x0, bounds, config, 0)
}
