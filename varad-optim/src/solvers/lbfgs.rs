use num_traits::Float;

use crate::bounds::Bounds;
use crate::convergence::{as_f64, dot, norm, ConvergenceParams};
use crate::error::ConfigError;
use crate::line_search::{backtracking_wolfe, SearchBox, WolfeParams};
use crate::objective::Objective;
use crate::result::{OptimResult, TerminationReason};

/// Configuration for the L-BFGS solver.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LbfgsConfig<F> {
    /// Number of recent (s, y) pairs to store (default: 10).
    pub memory: usize,
    /// Convergence parameters.
    pub convergence: ConvergenceParams<F>,
    /// Line search parameters.
    pub line_search: WolfeParams<F>,
}

impl Default for LbfgsConfig<f64> {
    fn default() -> Self {
        LbfgsConfig {
            memory: 10,
            convergence: ConvergenceParams::default(),
            line_search: WolfeParams::default(),
        }
    }
}

impl Default for LbfgsConfig<f32> {
    fn default() -> Self {
        LbfgsConfig {
            memory: 10,
            convergence: ConvergenceParams::default(),
            line_search: WolfeParams::default(),
        }
    }
}

impl<F: Float> LbfgsConfig<F> {
    /// Reject settings the solver cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let err = |e: ConfigError| {
            tracing::error!(error = %e, "invalid optimizer configuration");
            Err(e)
        };
        if self.convergence.max_iter == 0 {
            return err(ConfigError::ZeroIterations);
        }
        let ls = &self.line_search;
        if ls.max_line_searches == 0 {
            return err(ConfigError::ZeroLineSearches);
        }
        let tol = self.convergence.grad_tol;
        if !(tol > F::zero() && tol.is_finite()) {
            return err(ConfigError::InvalidTolerance(as_f64(tol)));
        }
        if !(ls.c1 > F::zero() && ls.c1 < ls.c2 && ls.c2 < F::one()) {
            return err(ConfigError::InvalidWolfe {
                c1: as_f64(ls.c1),
                c2: as_f64(ls.c2),
            });
        }
        if !(ls.grow > F::one() && ls.shrink > F::one()) {
            return err(ConfigError::InvalidStepFactor {
                grow: as_f64(ls.grow),
                shrink: as_f64(ls.shrink),
            });
        }
        Ok(())
    }
}

/// L-BFGS optimization.
///
/// Minimizes `obj` starting from `x0` using the limited-memory BFGS method
/// with two-loop recursion and a backtracking Wolfe line search.
pub fn lbfgs<F: Float, O: Objective<F>>(
    obj: &mut O,
    x0: &[F],
    config: &LbfgsConfig<F>,
) -> OptimResult<F> {
    let bounds = vec![None; x0.len()];
    minimize(obj, x0, &bounds, config, config.memory)
}

/// L-BFGS with per-coordinate box constraints.
///
/// `bounds[i]` constrains `x[i]`; `None` leaves it free. A start outside its
/// box is moved to the midpoint. Every point handed to `obj` lies inside the
/// box. Coordinates sitting on a bound whose gradient points outward, or is
/// negligible, are pinned for the iteration; when every coordinate is pinned
/// the run ends with [`TerminationReason::BoundedSolution`].
pub fn lbfgs_bounded<F: Float, O: Objective<F>>(
    obj: &mut O,
    x0: &[F],
    bounds: &[Option<Bounds<F>>],
    config: &LbfgsConfig<F>,
) -> OptimResult<F> {
    minimize(obj, x0, bounds, config, config.memory)
}

/// Shared driver; `memory == 0` keeps no curvature pairs, which is steepest descent.
pub(crate) fn minimize<F: Float, O: Objective<F>>(
    obj: &mut O,
    x0: &[F],
    bounds: &[Option<Bounds<F>>],
    config: &LbfgsConfig<F>,
    memory: usize,
) -> OptimResult<F> {
    let n = x0.len();
    let tol = config.convergence.grad_tol;

    let mut x: Vec<F> = x0
        .iter()
        .enumerate()
        .map(|(i, &xi)| match bounds.get(i).copied().flatten() {
            Some(b) => b.admit(xi),
            None => xi,
        })
        .collect();

    if config.validate().is_err() {
        return OptimResult {
            x,
            value: F::nan(),
            gradient: vec![F::zero(); n],
            gradient_norm: F::zero(),
            iterations: 0,
            func_evals: 0,
            phase: 0,
            termination: TerminationReason::NumericalError,
        };
    }

    let (mut f_val, mut grad) = obj.eval_grad(&x);
    let mut func_evals = 1usize;
    let mut grad_norm = norm(&grad);
    let mut history = History::new(memory);

    macro_rules! finish {
        ($iterations:expr, $reason:expr) => {
            return OptimResult {
                x,
                value: f_val,
                gradient: grad,
                gradient_norm: grad_norm,
                iterations: $iterations,
                func_evals,
                phase: 0,
                termination: $reason,
            }
        };
    }

    if f_val.is_nan() || grad.iter().any(|g| g.is_nan()) {
        tracing::warn!("objective is NaN at the starting point");
        finish!(0, TerminationReason::NumericalError);
    }

    for iter in 0..config.convergence.max_iter {
        let pinned: Vec<bool> = (0..n)
            .map(|i| match bounds.get(i).copied().flatten() {
                Some(b) => b.pins(x[i], grad[i], tol),
                None => false,
            })
            .collect();
        if n > 0 && pinned.iter().all(|&p| p) {
            tracing::debug!(iter, "every parameter pinned at a bound");
            finish!(iter, TerminationReason::BoundedSolution);
        }

        let pg: Vec<F> = grad
            .iter()
            .zip(&pinned)
            .map(|(&g, &p)| if p { F::zero() } else { g })
            .collect();
        grad_norm = norm(&pg);
        tracing::trace!(
            iter,
            value = as_f64(f_val),
            grad_norm = as_f64(grad_norm),
            "lbfgs iteration"
        );
        if config.convergence.converged(grad_norm, norm(&x)) {
            finish!(iter, TerminationReason::GradientNorm);
        }

        let mut z = history.two_loop(&pg);
        for (zi, &p) in z.iter_mut().zip(&pinned) {
            if p {
                *zi = F::zero();
            }
        }
        let mut descent = -dot(&z, &pg);
        if !(descent < -F::epsilon() * norm(&z) * grad_norm) {
            tracing::debug!(iter, "search direction is not a descent direction, restarting");
            history.clear();
            z = pg.clone();
            descent = -dot(&z, &z);
        }

        let step_init = if history.is_empty() {
            F::one().min(F::one() / grad_norm)
        } else {
            F::one()
        };
        let region = SearchBox {
            bounds,
            pinned: &pinned,
        };
        let ls = match backtracking_wolfe(
            obj,
            &x,
            &z,
            f_val,
            descent,
            step_init,
            tol,
            &region,
            &config.line_search,
        ) {
            Ok(ls) => ls,
            Err(failure) => {
                func_evals += failure.evals;
                finish!(iter, failure.reason);
            }
        };
        func_evals += ls.evals;

        let s: Vec<F> = ls.x.iter().zip(&x).map(|(&a, &b)| a - b).collect();
        let y: Vec<F> = ls.gradient.iter().zip(&grad).map(|(&a, &b)| a - b).collect();
        history.push(s, y);

        x = ls.x;
        f_val = ls.value;
        grad = ls.gradient;
    }

    grad_norm = norm(&grad);
    finish!(config.convergence.max_iter, TerminationReason::MaxIterations);
}

/// Ring buffer of the most recent curvature pairs.
struct History<F> {
    s: Vec<Vec<F>>,
    y: Vec<Vec<F>>,
    rho: Vec<F>,
    capacity: usize,
    count: usize,
}

impl<F: Float> History<F> {
    fn new(capacity: usize) -> Self {
        History {
            s: Vec::with_capacity(capacity),
            y: Vec::with_capacity(capacity),
            rho: Vec::with_capacity(capacity),
            capacity,
            count: 0,
        }
    }

    fn len(&self) -> usize {
        self.count.min(self.capacity)
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear(&mut self) {
        self.count = 0;
    }

    /// Store a pair unless it has non-positive curvature.
    fn push(&mut self, s: Vec<F>, y: Vec<F>) {
        if self.capacity == 0 {
            return;
        }
        let sy = dot(&s, &y);
        if !(sy > F::zero()) {
            return;
        }
        let slot = self.count % self.capacity;
        if slot < self.s.len() {
            self.s[slot] = s;
            self.y[slot] = y;
            self.rho[slot] = F::one() / sy;
        } else {
            self.s.push(s);
            self.y.push(y);
            self.rho.push(F::one() / sy);
        }
        self.count += 1;
    }

    /// Buffer slot of the `k`-th newest pair.
    fn slot(&self, k: usize) -> usize {
        (self.count - 1 - k) % self.capacity
    }

    /// Two-loop recursion: `H_k * g` with `H_0 = gamma * I`.
    fn two_loop(&self, grad: &[F]) -> Vec<F> {
        let k = self.len();
        let mut q: Vec<F> = grad.to_vec();

        // Newest to oldest
        let mut alpha = vec![F::zero(); k];
        for (j, a) in alpha.iter_mut().enumerate() {
            let i = self.slot(j);
            *a = self.rho[i] * dot(&self.s[i], &q);
            for (qv, &yv) in q.iter_mut().zip(&self.y[i]) {
                *qv = *qv - *a * yv;
            }
        }

        let mut r = q;
        if k > 0 {
            let newest = self.slot(0);
            let sy = dot(&self.s[newest], &self.y[newest]);
            let yy = dot(&self.y[newest], &self.y[newest]);
            if yy > F::zero() {
                let gamma = sy / yy;
                for v in r.iter_mut() {
                    *v = *v * gamma;
                }
            }
        }

        // Oldest to newest
        for j in (0..k).rev() {
            let i = self.slot(j);
            let beta = self.rho[i] * dot(&self.y[i], &r);
            for (rv, &sv) in r.iter_mut().zip(&self.s[i]) {
                *rv = *rv + (alpha[j] - beta) * sv;
            }
        }

        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rosenbrock;

    impl Objective<f64> for Rosenbrock {
        fn dim(&self) -> usize {
            2
        }

        fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
            let a = 1.0 - x[0];
            let b = x[1] - x[0] * x[0];
            let f = a * a + 100.0 * b * b;
            let g0 = -2.0 * a - 400.0 * x[0] * b;
            let g1 = 200.0 * b;
            (f, vec![g0, g1])
        }
    }

    #[test]
    fn lbfgs_rosenbrock() {
        let mut obj = Rosenbrock;
        let mut config = LbfgsConfig::default();
        config.convergence.grad_tol = 1e-5;
        let result = lbfgs(&mut obj, &[-1.2, 1.0], &config);

        assert_eq!(result.termination, TerminationReason::GradientNorm);
        assert!(
            (result.x[0] - 1.0).abs() < 1e-3,
            "x[0] = {}, expected 1.0",
            result.x[0]
        );
        assert!(
            (result.x[1] - 1.0).abs() < 1e-3,
            "x[1] = {}, expected 1.0",
            result.x[1]
        );
    }

    #[test]
    fn lbfgs_already_converged() {
        let mut obj = Rosenbrock;
        let config = LbfgsConfig::default();
        let result = lbfgs(&mut obj, &[1.0, 1.0], &config);

        assert_eq!(result.termination, TerminationReason::GradientNorm);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.func_evals, 1);
    }

    #[test]
    fn history_wraps_and_keeps_newest() {
        let mut h = History::<f64>::new(2);
        h.push(vec![1.0], vec![1.0]);
        h.push(vec![2.0], vec![1.0]);
        h.push(vec![3.0], vec![1.0]);
        assert_eq!(h.len(), 2);
        assert_eq!(h.s[h.slot(0)], vec![3.0]);
        assert_eq!(h.s[h.slot(1)], vec![2.0]);

        // Negative curvature is dropped.
        h.push(vec![1.0], vec![-1.0]);
        assert_eq!(h.s[h.slot(0)], vec![3.0]);

        h.clear();
        assert!(h.is_empty());
        assert_eq!(h.two_loop(&[4.0]), vec![4.0]);
    }

    #[test]
    fn two_loop_recovers_inverse_hessian_on_1d_quadratic() {
        // f = x^2, H = 2: one exact pair gives H^{-1} g.
        let mut h = History::<f64>::new(5);
        h.push(vec![1.0], vec![2.0]);
        assert_eq!(h.two_loop(&[6.0]), vec![3.0]);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = LbfgsConfig::<f64>::default();
        config.line_search.c2 = 1e-5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWolfe { .. })
        ));

        let mut config = LbfgsConfig::<f64>::default();
        config.convergence.grad_tol = 0.0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidTolerance(0.0)));

        let mut obj = Rosenbrock;
        let mut config = LbfgsConfig::default();
        config.convergence.max_iter = 0;
        let result = lbfgs(&mut obj, &[0.0, 0.0], &config);
        assert_eq!(result.termination, TerminationReason::NumericalError);
        assert_eq!(result.func_evals, 0);
    }

    #[test]
    fn bounded_minimum_on_the_boundary() {
        // (x - 10)^2 on [0, 5]
        struct Shifted;
        impl Objective<f64> for Shifted {
            fn dim(&self) -> usize {
                1
            }
            fn eval_grad(&mut self, x: &[f64]) -> (f64, Vec<f64>) {
                assert!((0.0..=5.0).contains(&x[0]), "evaluated outside bounds: {}", x[0]);
                let d = x[0] - 10.0;
                (d * d, vec![2.0 * d])
            }
        }

        let bounds = [Some(Bounds::new(0.0, 5.0))];
        let result = lbfgs_bounded(&mut Shifted, &[7.0], &bounds, &LbfgsConfig::default());
        assert_eq!(result.termination, TerminationReason::BoundedSolution);
        assert_eq!(result.x, vec![5.0]);
    }
}
