use thiserror::Error;

/// Configuration rejected before any evaluation takes place.
///
/// Numerical failures during a run are not errors; they are reported through
/// [`TerminationReason`](crate::TerminationReason).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("maximum iterations must be positive")]
    ZeroIterations,

    #[error("maximum line searches must be positive")]
    ZeroLineSearches,

    #[error("gradient tolerance must be positive and finite, got {0}")]
    InvalidTolerance(f64),

    #[error("Wolfe constants must satisfy 0 < c1 < c2 < 1, got c1 = {c1}, c2 = {c2}")]
    InvalidWolfe { c1: f64, c2: f64 },

    #[error("step factors must exceed 1, got grow = {grow}, shrink = {shrink}")]
    InvalidStepFactor { grow: f64, shrink: f64 },

    #[error("activation phase must be at least 1")]
    InvalidPhase,
}
