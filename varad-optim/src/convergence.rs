use num_traits::Float;

/// Parameters controlling convergence checks.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConvergenceParams<F> {
    /// Maximum number of iterations per phase (default: 1000).
    pub max_iter: usize,
    /// Relative gradient tolerance: stop when `||g|| < grad_tol * max(1, ||x||)`
    /// (default: 1e-6 for `f64`, 1e-4 for `f32`).
    pub grad_tol: F,
}

impl Default for ConvergenceParams<f64> {
    fn default() -> Self {
        ConvergenceParams {
            max_iter: 1000,
            grad_tol: 1e-6,
        }
    }
}

impl Default for ConvergenceParams<f32> {
    fn default() -> Self {
        ConvergenceParams {
            max_iter: 1000,
            grad_tol: 1e-4,
        }
    }
}

impl<F: Float> ConvergenceParams<F> {
    /// Whether `grad_norm` passes the relative test at a point of norm `x_norm`.
    #[inline]
    pub fn converged(&self, grad_norm: F, x_norm: F) -> bool {
        grad_norm < self.grad_tol * x_norm.max(F::one())
    }
}

/// Compute the L2 norm of a vector.
pub fn norm<F: Float>(v: &[F]) -> F {
    let mut s = F::zero();
    for &x in v {
        s = s + x * x;
    }
    s.sqrt()
}

/// Compute the dot product of two vectors.
pub fn dot<F: Float>(a: &[F], b: &[F]) -> F {
    debug_assert_eq!(a.len(), b.len());
    let mut s = F::zero();
    for i in 0..a.len() {
        s = s + a[i] * b[i];
    }
    s
}

/// Lossy view of a scalar for log fields.
#[inline]
pub(crate) fn as_f64<F: Float>(v: F) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
