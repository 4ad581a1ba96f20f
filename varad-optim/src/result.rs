use std::fmt;

/// Result of an optimization run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OptimResult<F> {
    /// Solution point.
    pub x: Vec<F>,
    /// Objective value at the solution.
    pub value: F,
    /// Gradient at the solution.
    pub gradient: Vec<F>,
    /// Norm of the projected gradient at the solution.
    pub gradient_norm: F,
    /// Number of outer iterations performed.
    pub iterations: usize,
    /// Total number of objective function evaluations.
    pub func_evals: usize,
    /// Phase this result belongs to; zero for a standalone solve.
    pub phase: u32,
    /// Reason for termination.
    pub termination: TerminationReason,
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerminationReason {
    /// Projected gradient norm fell below tolerance.
    GradientNorm,
    /// Every parameter is held at one of its bounds.
    BoundedSolution,
    /// Reached the maximum number of iterations.
    MaxIterations,
    /// Line search could not find an acceptable step.
    LineSearchFailed,
    /// The objective or its gradient became NaN.
    NumericalError,
}

impl TerminationReason {
    /// Whether the run ended at an accepted solution.
    pub fn is_success(self) -> bool {
        matches!(
            self,
            TerminationReason::GradientNorm | TerminationReason::BoundedSolution
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationReason::GradientNorm => write!(f, "gradient norm below tolerance"),
            TerminationReason::BoundedSolution => write!(f, "all parameters at bounds"),
            TerminationReason::MaxIterations => write!(f, "maximum iterations reached"),
            TerminationReason::LineSearchFailed => write!(f, "line search failed"),
            TerminationReason::NumericalError => write!(f, "numerical error"),
        }
    }
}
