//! Elementary operation codes.
//!
//! Each opcode names one node kind of the expression model and one record kind
//! of the statement tape. [`eval_forward`] computes a result, [`partials`] its
//! local partial derivatives and [`chain`] combines those with the operand
//! derivatives. Expression nodes and tape replay both go through these three
//! functions, which is what keeps the two differentiation paths in exact agreement.

use crate::float::Float;

/// Magnitude beyond which [`OpCode::MfExp`] switches to its rational tail.
pub const MFEXP_THRESHOLD: f64 = 60.0;

/// Elementary operation codes.
///
/// Binary ops consume two operands. Unary ops consume one operand plus an
/// immediate `b` which is only meaningful for [`OpCode::PowConst`] (the
/// exponent) and [`OpCode::ConstPow`] (the base).
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OpCode {
    // ── Leaves ──
    /// Scalar constant.
    Constant,
    /// Independent variable.
    Variable,

    // ── Binary ──
    Add,
    Sub,
    Mul,
    Div,
    /// `a^b` with both operands differentiable.
    Pow,
    Atan2,

    // ── Unary ──
    Neg,
    Sqrt,
    /// `a^c` for a constant exponent `c` (immediate).
    PowConst,
    /// `c^a` for a constant base `c` (immediate). Zero derivative.
    ConstPow,

    // ── Exp / Log ──
    Exp,
    /// Overflow-safe exponential.
    MfExp,
    Log,
    Log10,

    // ── Trig ──
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,

    // ── Hyperbolic ──
    Sinh,
    Cosh,
    Tanh,

    // ── Misc ──
    Abs,
    /// Zero derivative.
    Floor,
    /// Zero derivative.
    Ceil,
}

impl OpCode {
    /// Whether this op consumes two operands.
    #[inline]
    pub fn is_binary(self) -> bool {
        matches!(
            self,
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Pow | OpCode::Atan2
        )
    }

    /// Whether this op is a leaf record.
    #[inline]
    pub fn is_leaf(self) -> bool {
        matches!(self, OpCode::Constant | OpCode::Variable)
    }
}

/// Evaluate a single opcode.
///
/// For binary ops `a` and `b` are the operand values. For unary ops `a` is the
/// operand and `b` the immediate. Leaves return `a` unchanged.
#[inline]
pub fn eval_forward<F: Float>(op: OpCode, a: F, b: F) -> F {
    match op {
        OpCode::Constant | OpCode::Variable => a,

        OpCode::Add => a + b,
        OpCode::Sub => a - b,
        OpCode::Mul => a * b,
        OpCode::Div => a / b,
        OpCode::Pow | OpCode::PowConst => a.powf(b),
        OpCode::ConstPow => b.powf(a),
        OpCode::Atan2 => a.atan2(b),

        OpCode::Neg => -a,
        OpCode::Sqrt => a.sqrt(),

        OpCode::Exp => a.exp(),
        OpCode::MfExp => mfexp(a),
        OpCode::Log => a.ln(),
        OpCode::Log10 => a.log10(),

        OpCode::Sin => a.sin(),
        OpCode::Cos => a.cos(),
        OpCode::Tan => a.tan(),
        OpCode::Asin => a.asin(),
        OpCode::Acos => a.acos(),
        OpCode::Atan => a.atan(),

        OpCode::Sinh => a.sinh(),
        OpCode::Cosh => a.cosh(),
        OpCode::Tanh => a.tanh(),

        OpCode::Abs => a.abs(),
        OpCode::Floor => a.floor(),
        OpCode::Ceil => a.ceil(),
    }
}

/// Local partial derivatives `(∂r/∂a, ∂r/∂b)` of a single opcode.
///
/// `r` is the already computed result. For unary ops the second partial is zero.
#[inline]
pub fn partials<F: Float>(op: OpCode, a: F, b: F, r: F) -> (F, F) {
    let zero = F::zero();
    let one = F::one();
    match op {
        OpCode::Constant | OpCode::Variable => (zero, zero),

        OpCode::Add => (one, one),
        OpCode::Sub => (one, -one),
        OpCode::Mul => (b, a),
        OpCode::Div => {
            let inv = one / b;
            (inv, -a * inv * inv)
        }
        OpCode::Pow => {
            // d/da a^b = b * a^(b-1), d/db a^b = a^b * ln(a)
            (b * a.powf(b - one), r * a.ln())
        }
        OpCode::Atan2 => {
            let denom = a * a + b * b;
            (b / denom, -a / denom)
        }

        OpCode::Neg => (-one, zero),
        OpCode::Sqrt => (F::lit(0.5) / r, zero),
        OpCode::PowConst => (b * a.powf(b - one), zero),
        // Known gap: c^a * ln(c) is not propagated.
        OpCode::ConstPow => (zero, zero),

        OpCode::Exp => (r, zero),
        // Chain rule through the stabilized value, not the exact exponential.
        OpCode::MfExp => (r, zero),
        OpCode::Log => (one / a, zero),
        OpCode::Log10 => (one / (a * F::LN_10()), zero),

        OpCode::Sin => (a.cos(), zero),
        OpCode::Cos => (-a.sin(), zero),
        OpCode::Tan => {
            let c = a.cos();
            (one / (c * c), zero)
        }
        OpCode::Asin => (one / (one - a * a).sqrt(), zero),
        OpCode::Acos => (-one / (one - a * a).sqrt(), zero),
        OpCode::Atan => (one / (a * a + one), zero),

        OpCode::Sinh => (a.cosh(), zero),
        OpCode::Cosh => (a.sinh(), zero),
        OpCode::Tanh => {
            let c = a.cosh();
            (one / (c * c), zero)
        }

        OpCode::Abs => (a.signum(), zero),
        OpCode::Floor | OpCode::Ceil => (zero, zero),
    }
}

/// Combine local partials with operand derivatives.
///
/// `None` is the structural zero: an operand with no dependency on the target.
/// When both operands report `None` the result is `None` and no multiply happens.
#[inline]
pub fn chain<F: Float>((pa, pb): (F, F), da: Option<F>, db: Option<F>) -> Option<F> {
    match (da, db) {
        (None, None) => None,
        (Some(da), None) => Some(pa * da),
        (None, Some(db)) => Some(pb * db),
        (Some(da), Some(db)) => Some(pa * da + pb * db),
    }
}

/// Derivative of a unary op given its operand derivative.
#[inline]
pub fn chain_unary<F: Float>(op: OpCode, a: F, imm: F, r: F, da: Option<F>) -> Option<F> {
    let da = da?;
    Some(partials(op, a, imm, r).0 * da)
}

/// Derivative of a binary op given its operand derivatives.
#[inline]
pub fn chain_binary<F: Float>(op: OpCode, a: F, b: F, r: F, da: Option<F>, db: Option<F>) -> Option<F> {
    if da.is_none() && db.is_none() {
        return None;
    }
    chain(partials(op, a, b, r), da, db)
}

/// Exponential that stays finite: exact for `|x| <= 60`, a rational tail beyond.
///
/// Continuous in value at `±60`; the tails grow (decay) linearly instead of exponentially.
#[inline]
pub fn mfexp<F: Float>(x: F) -> F {
    let b = F::lit(MFEXP_THRESHOLD);
    let one = F::one();
    let two = F::lit(2.0);
    if x <= b && x >= -b {
        x.exp()
    } else if x > b {
        b.exp() * (one + two * (x - b)) / (one + x - b)
    } else {
        (-b).exp() * (one - x - b) / (one + two * (-x - b))
    }
}
