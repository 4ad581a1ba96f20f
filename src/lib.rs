//! Assignment-driven automatic differentiation.
//!
//! Arithmetic over [`Variable`]s and [`Expr`]s builds immutable expression
//! nodes; assigning an expression into a `Variable` stores the derivative of
//! its value with respect to every independent Variable it depends on. An
//! optional statement [`Tape`] gives a second, replay-based route to the same
//! derivatives.

pub mod context;
pub mod expr;
pub mod float;
pub mod gradient;
pub mod id;
pub mod math;
pub mod opcode;
pub mod tape;
pub mod variable;
mod traits;

pub use context::{
    is_recording, set_recording, set_support_arbitrary_order, supports_arbitrary_order,
    ContextGuard, DiffContext, RecordingGuard,
};
pub use expr::Expr;
pub use float::Float;
pub use gradient::GradientMap;
pub use id::{IvId, NOT_INDEPENDENT};
pub use opcode::OpCode;
pub use tape::{Statement, Tape};
pub use variable::Variable;

/// Type alias for Variables over `f64`.
pub type Variable64 = Variable<f64>;
/// Type alias for Variables over `f32`.
pub type Variable32 = Variable<f32>;
/// Type alias for expressions over `f64`.
pub type Expr64 = Expr<f64>;
/// Type alias for expressions over `f32`.
pub type Expr32 = Expr<f32>;
