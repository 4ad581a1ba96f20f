//! Flat post-order statement tape and its replay-based derivative.
//!
//! A tape is the reverse-Polish rendering of the expression that produced a
//! Variable's value: leaves push, operators pop their operands and push the
//! result. Replaying it on an explicit `(value, derivative)` stack yields the
//! same first derivative as the recursive node protocol, without the tree.
//! Tapes are only recorded while
//! [`supports_arbitrary_order`](crate::context::supports_arbitrary_order) is on.

use crate::float::Float;
use crate::id::{IvId, NOT_INDEPENDENT};
use crate::opcode::{self, OpCode};

/// One tape record.
///
/// `value` holds the leaf value for [`OpCode::Constant`] / [`OpCode::Variable`]
/// and the immediate for [`OpCode::PowConst`] / [`OpCode::ConstPow`]; it is
/// unused otherwise. `id` is only meaningful for [`OpCode::Variable`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Statement<F> {
    pub op: OpCode,
    pub value: F,
    pub id: IvId,
}

impl<F: Float> Statement<F> {
    #[inline]
    pub fn constant(value: F) -> Self {
        Statement {
            op: OpCode::Constant,
            value,
            id: NOT_INDEPENDENT,
        }
    }

    #[inline]
    pub fn variable(value: F, id: IvId) -> Self {
        Statement {
            op: OpCode::Variable,
            value,
            id,
        }
    }

    #[inline]
    pub fn operator(op: OpCode, immediate: F) -> Self {
        Statement {
            op,
            value: immediate,
            id: NOT_INDEPENDENT,
        }
    }
}

/// Post-order sequence of [`Statement`]s.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tape<F> {
    statements: Vec<Statement<F>>,
}

impl<F: Float> Tape<F> {
    pub fn new() -> Self {
        Tape {
            statements: Vec::new(),
        }
    }

    pub fn with_capacity(est_ops: usize) -> Self {
        Tape {
            statements: Vec::with_capacity(est_ops),
        }
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn statements(&self) -> &[Statement<F>] {
        &self.statements
    }

    #[inline]
    pub(crate) fn push(&mut self, stmt: Statement<F>) {
        self.statements.push(stmt);
    }

    #[inline]
    pub(crate) fn extend_from(&mut self, other: &Tape<F>) {
        self.statements.extend_from_slice(&other.statements);
    }

    /// Replay the tape for its value. `None` for an empty or malformed tape.
    pub fn value(&self) -> Option<F> {
        self.replay(NOT_INDEPENDENT).map(|(v, _)| v)
    }

    /// Replay the tape for the derivative with respect to `wrt`.
    ///
    /// Returns zero for an empty tape, for a tape with no `Variable` record
    /// matching `wrt`, and for a malformed tape.
    pub fn derivative(&self, wrt: IvId) -> F {
        self.replay(wrt)
            .and_then(|(_, d)| d)
            .unwrap_or_else(F::zero)
    }

    fn replay(&self, wrt: IvId) -> Option<(F, Option<F>)> {
        if self.statements.is_empty() {
            return None;
        }
        let mut stack: Vec<(F, Option<F>)> = Vec::with_capacity(self.statements.len() / 2 + 1);

        for (pos, stmt) in self.statements.iter().enumerate() {
            let entry = match stmt.op {
                OpCode::Constant => (stmt.value, None),
                OpCode::Variable => {
                    let seed = (wrt != NOT_INDEPENDENT && stmt.id == wrt).then(F::one);
                    (stmt.value, seed)
                }
                op if op.is_binary() => {
                    let (Some((b, db)), Some((a, da))) = (stack.pop(), stack.pop()) else {
                        tracing::warn!(pos, ?op, "tape underflow on binary operator");
                        return None;
                    };
                    let r = opcode::eval_forward(op, a, b);
                    (r, opcode::chain_binary(op, a, b, r, da, db))
                }
                op => {
                    let Some((a, da)) = stack.pop() else {
                        tracing::warn!(pos, ?op, "tape underflow on unary operator");
                        return None;
                    };
                    let r = opcode::eval_forward(op, a, stmt.value);
                    (r, opcode::chain_unary(op, a, stmt.value, r, da))
                }
            };
            stack.push(entry);
        }

        if stack.len() != 1 {
            tracing::warn!(depth = stack.len(), "tape left more than one value on the stack");
            return None;
        }
        stack.pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tape_is_zero() {
        let tape = Tape::<f64>::new();
        assert_eq!(tape.derivative(1), 0.0);
        assert_eq!(tape.value(), None);
    }

    #[test]
    fn replay_product() {
        // x * y + 2 with x = 3 (id 1), y = 4 (id 2)
        let mut tape = Tape::new();
        tape.push(Statement::variable(3.0, 1));
        tape.push(Statement::variable(4.0, 2));
        tape.push(Statement::operator(OpCode::Mul, 0.0));
        tape.push(Statement::constant(2.0));
        tape.push(Statement::operator(OpCode::Add, 0.0));

        assert_eq!(tape.value(), Some(14.0));
        assert_eq!(tape.derivative(1), 4.0);
        assert_eq!(tape.derivative(2), 3.0);
        assert_eq!(tape.derivative(7), 0.0);
    }

    #[test]
    fn replay_immediate_power() {
        // x^3 at x = 2
        let mut tape = Tape::new();
        tape.push(Statement::variable(2.0, 5));
        tape.push(Statement::operator(OpCode::PowConst, 3.0));
        assert_eq!(tape.value(), Some(8.0));
        assert_eq!(tape.derivative(5), 12.0);
    }

    #[test]
    fn malformed_tape_is_zero() {
        let mut tape = Tape::new();
        tape.push(Statement::variable(2.0_f64, 5));
        tape.push(Statement::operator(OpCode::Add, 0.0));
        assert_eq!(tape.derivative(5), 0.0);
        assert_eq!(tape.value(), None);
    }
}
