//! Phased, bound-constrained minimization over `varad` Variables.
//!
//! [`lbfgs`] and [`lbfgs_bounded`] minimize any [`Objective`]. The
//! [`Optimizer`] drives a [`Model`] whose objective is written with `varad`
//! arithmetic, activating registered parameters phase by phase.

pub mod bounds;
pub mod convergence;
pub mod error;
pub mod line_search;
pub mod objective;
pub mod optimizer;
pub mod parameters;
pub mod result;
pub mod solvers;

pub use bounds::Bounds;
pub use convergence::ConvergenceParams;
pub use error::ConfigError;
pub use line_search::WolfeParams;
pub use objective::{Model, Objective};
pub use optimizer::{Algorithm, Optimizer};
pub use parameters::{ParamId, Parameter, Parameters};
pub use result::{OptimResult, TerminationReason};
pub use solvers::lbfgs::{lbfgs, lbfgs_bounded, LbfgsConfig};
pub use solvers::steepest_descent::steepest_descent;
