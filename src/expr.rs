//! Expression node model.
//!
//! An [`Expr`] is an immutable node with its value computed eagerly at
//! construction. Children are reference counted, so an expression can outlive
//! the statement that built it and sub-expressions can be shared between
//! parents. Differentiation is per target id: [`Expr::derivative`] walks the
//! tree applying the rule of each node's [`OpCode`], memoizing shared nodes so
//! repeated composition such as `t = &t * &t` stays linear in the node count.
//!
//! Expressions are built with ordinary operators and the functions in
//! [`crate::math`]:
//!
//! ```
//! use varad::{math, Variable};
//!
//! let x = Variable::independent(0.5_f64);
//! let e = math::sin(&x) * 2.0 + &x;
//! assert!((e.value() - (2.0 * 0.5_f64.sin() + 0.5)).abs() < 1e-15);
//! assert_eq!(e.derivative(x.id()), Some(2.0 * 0.5_f64.cos() + 1.0));
//! ```

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::{self, Display};
use std::rc::Rc;

use crate::float::Float;
use crate::gradient::GradientMap;
use crate::id::{IvId, NOT_INDEPENDENT};
use crate::opcode::{self, OpCode};
use crate::tape::{Statement, Tape};

/// An immutable expression node with its cached value.
#[derive(Clone, Debug)]
pub struct Expr<F: Float> {
    value: F,
    node: Rc<Node<F>>,
}

#[derive(Debug)]
enum Node<F: Float> {
    Literal,
    Variable(Leaf<F>),
    Unary { op: OpCode, arg: Expr<F>, imm: F },
    Binary { op: OpCode, lhs: Expr<F>, rhs: Expr<F> },
}

/// Snapshot of a Variable taken when it enters an expression.
#[derive(Clone, Debug)]
pub(crate) struct Leaf<F: Float> {
    /// Own id if independent, [`NOT_INDEPENDENT`] otherwise.
    pub(crate) id: IvId,
    pub(crate) gradient: Rc<GradientMap<F>>,
    pub(crate) tape: Option<Rc<Tape<F>>>,
}

impl<F: Float> Leaf<F> {
    /// An independent leaf is a pure input: one for its own id, nothing else.
    #[inline]
    pub(crate) fn derivative(&self, id: IvId) -> Option<F> {
        if self.id == NOT_INDEPENDENT {
            self.gradient.get(id)
        } else if self.id == id {
            Some(F::one())
        } else {
            None
        }
    }
}

type NodeKey<F> = *const Node<F>;

impl<F: Float> Expr<F> {
    /// A constant node.
    #[inline]
    pub fn literal(value: F) -> Self {
        Expr {
            value,
            node: Rc::new(Node::Literal),
        }
    }

    #[inline]
    pub(crate) fn leaf(value: F, leaf: Leaf<F>) -> Self {
        Expr {
            value,
            node: Rc::new(Node::Variable(leaf)),
        }
    }

    #[inline]
    pub(crate) fn unary(op: OpCode, arg: Expr<F>, imm: F) -> Self {
        let value = opcode::eval_forward(op, arg.value, imm);
        Expr {
            value,
            node: Rc::new(Node::Unary { op, arg, imm }),
        }
    }

    #[inline]
    pub(crate) fn binary(op: OpCode, lhs: Expr<F>, rhs: Expr<F>) -> Self {
        let value = opcode::eval_forward(op, lhs.value, rhs.value);
        Expr {
            value,
            node: Rc::new(Node::Binary { op, lhs, rhs }),
        }
    }

    /// The cached value.
    #[inline]
    pub fn value(&self) -> F {
        self.value
    }

    /// Whether this node is a constant.
    #[inline]
    pub fn is_literal(&self) -> bool {
        matches!(*self.node, Node::Literal)
    }

    /// The opcode of this node (`Constant` for literals, `Variable` for Variable leaves).
    pub fn op(&self) -> OpCode {
        match &*self.node {
            Node::Literal => OpCode::Constant,
            Node::Variable(_) => OpCode::Variable,
            Node::Unary { op, .. } | Node::Binary { op, .. } => *op,
        }
    }

    /// Derivative with respect to the independent variable `id`.
    ///
    /// `None` means no Variable leaf below this node depends on `id`, which
    /// callers treat as zero.
    pub fn derivative(&self, id: IvId) -> Option<F> {
        if id == NOT_INDEPENDENT {
            return None;
        }
        let mut memo = HashMap::new();
        self.derivative_memo(id, &mut memo)
    }

    fn derivative_memo(&self, id: IvId, memo: &mut HashMap<NodeKey<F>, Option<F>>) -> Option<F> {
        // A node referenced once can only be reached once.
        let shared = Rc::strong_count(&self.node) > 1;
        let key = Rc::as_ptr(&self.node);
        if shared {
            if let Some(&d) = memo.get(&key) {
                return d;
            }
        }

        let d = match &*self.node {
            Node::Literal => None,
            Node::Variable(leaf) => leaf.derivative(id),
            Node::Unary { op, arg, imm } => {
                let da = arg.derivative_memo(id, memo);
                opcode::chain_unary(*op, arg.value, *imm, self.value, da)
            }
            Node::Binary { op, lhs, rhs } => {
                let da = lhs.derivative_memo(id, memo);
                let db = rhs.derivative_memo(id, memo);
                opcode::chain_binary(*op, lhs.value, rhs.value, self.value, da, db)
            }
        };

        if shared {
            memo.insert(key, d);
        }
        d
    }

    /// Add every id this expression could have a nonzero derivative for.
    pub fn collect_ids(&self, into: &mut BTreeSet<IvId>) {
        let mut visited = HashSet::new();
        self.collect_ids_inner(into, &mut visited);
    }

    fn collect_ids_inner(&self, into: &mut BTreeSet<IvId>, visited: &mut HashSet<NodeKey<F>>) {
        if Rc::strong_count(&self.node) > 1 && !visited.insert(Rc::as_ptr(&self.node)) {
            return;
        }
        match &*self.node {
            Node::Literal => {}
            Node::Variable(leaf) => {
                if leaf.id != NOT_INDEPENDENT {
                    into.insert(leaf.id);
                } else {
                    into.extend(leaf.gradient.ids());
                }
            }
            Node::Unary { arg, .. } => arg.collect_ids_inner(into, visited),
            Node::Binary { lhs, rhs, .. } => {
                lhs.collect_ids_inner(into, visited);
                rhs.collect_ids_inner(into, visited);
            }
        }
    }

    /// The ids this expression depends on, in ascending order.
    pub fn ids(&self) -> BTreeSet<IvId> {
        let mut ids = BTreeSet::new();
        self.collect_ids(&mut ids);
        ids
    }

    /// Flatten into a post-order statement tape.
    ///
    /// Independent Variable leaves become `Variable` records, other Variable
    /// leaves inline their own tape (or a `Constant` if they have none, in
    /// which case derivatives through them are lost to replay).
    /// Shared sub-expressions are emitted once per reference.
    pub fn to_tape(&self) -> Tape<F> {
        let mut tape = Tape::new();
        self.push_statements(&mut tape);
        tape
    }

    fn push_statements(&self, tape: &mut Tape<F>) {
        match &*self.node {
            Node::Literal => tape.push(Statement::constant(self.value)),
            Node::Variable(leaf) => {
                if leaf.id != NOT_INDEPENDENT {
                    tape.push(Statement::variable(self.value, leaf.id));
                } else {
                    match leaf.tape.as_deref() {
                        Some(sub) if !sub.is_empty() => tape.extend_from(sub),
                        _ => {
                            if !leaf.gradient.is_empty() {
                                tracing::warn!(
                                    dependencies = leaf.gradient.len(),
                                    "Variable without a tape recorded as a constant; \
                                     replayed derivatives through it are zero"
                                );
                            }
                            tape.push(Statement::constant(self.value));
                        }
                    }
                }
            }
            Node::Unary { op, arg, imm } => {
                arg.push_statements(tape);
                tape.push(Statement::operator(*op, *imm));
            }
            Node::Binary { op, lhs, rhs } => {
                lhs.push_statements(tape);
                rhs.push_statements(tape);
                tape.push(Statement::operator(*op, F::zero()));
            }
        }
    }

    // ── Powers ──

    /// `self ^ exponent`.
    ///
    /// A literal exponent yields a [`OpCode::PowConst`] node and a literal base
    /// a [`OpCode::ConstPow`] node; otherwise both sides are differentiated.
    pub fn pow(self, exponent: impl Into<Expr<F>>) -> Self {
        let exponent = exponent.into();
        if exponent.is_literal() {
            self.powf(exponent.value)
        } else if self.is_literal() {
            Expr::literal_pow(self.value, exponent)
        } else {
            Expr::binary(OpCode::Pow, self, exponent)
        }
    }

    /// `self ^ exponent` for a constant exponent.
    #[inline]
    pub fn powf(self, exponent: F) -> Self {
        Expr::unary(OpCode::PowConst, self, exponent)
    }

    /// `base ^ exponent` for a constant base.
    ///
    /// The derivative of this node is always zero; `base^x · ln(base)` is not
    /// propagated.
    #[inline]
    pub fn literal_pow(base: F, exponent: impl Into<Expr<F>>) -> Self {
        Expr::unary(OpCode::ConstPow, exponent.into(), base)
    }

    /// Four-quadrant arctangent of `self / other`.
    #[inline]
    pub fn atan2(self, other: impl Into<Expr<F>>) -> Self {
        Expr::binary(OpCode::Atan2, self, other.into())
    }
}

macro_rules! unary_methods {
    ($($(#[$doc:meta])* $name:ident => $op:ident;)*) => {
        impl<F: Float> Expr<F> {
            $(
                $(#[$doc])*
                #[inline]
                pub fn $name(self) -> Self {
                    Expr::unary(OpCode::$op, self, F::zero())
                }
            )*
        }
    };
}

unary_methods! {
    sqrt => Sqrt;
    exp => Exp;
    /// Overflow-safe exponential, see [`opcode::mfexp`].
    mfexp => MfExp;
    /// Natural logarithm.
    ln => Log;
    log10 => Log10;
    sin => Sin;
    cos => Cos;
    tan => Tan;
    asin => Asin;
    acos => Acos;
    atan => Atan;
    sinh => Sinh;
    cosh => Cosh;
    tanh => Tanh;
    abs => Abs;
    /// Derivative is zero everywhere, including at the integers.
    floor => Floor;
    /// Derivative is zero everywhere, including at the integers.
    ceil => Ceil;
}

impl<F: Float> From<F> for Expr<F> {
    #[inline]
    fn from(value: F) -> Self {
        Expr::literal(value)
    }
}

impl<F: Float> From<&Expr<F>> for Expr<F> {
    #[inline]
    fn from(expr: &Expr<F>) -> Self {
        expr.clone()
    }
}

impl<F: Float> Display for Expr<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id;

    fn var(value: f64) -> (Expr<f64>, IvId) {
        let id = id::allocate();
        let leaf = Leaf {
            id,
            gradient: Rc::new(GradientMap::new()),
            tape: None,
        };
        (Expr::leaf(value, leaf), id)
    }

    #[test]
    fn literal_has_no_dependency() {
        let c = Expr::literal(4.0_f64);
        assert_eq!(c.value(), 4.0);
        assert_eq!(c.derivative(1), None);
        assert!(c.ids().is_empty());
    }

    #[test]
    fn value_is_cached_at_construction() {
        let (x, _) = var(2.0);
        let e = Expr::binary(OpCode::Mul, x.clone(), x.sin());
        assert_eq!(e.value(), 2.0 * 2.0_f64.sin());
    }

    #[test]
    fn unrelated_id_is_not_found() {
        let (x, xid) = var(1.5);
        let (_, other) = var(0.0);
        let e = x.exp().sin();
        assert!(e.derivative(xid).is_some());
        assert_eq!(e.derivative(other), None);
        assert_eq!(e.derivative(NOT_INDEPENDENT), None);
    }

    #[test]
    fn shared_subexpression_depth_is_linear() {
        // t = x^(2^40) by repeated squaring of a shared node; without memoization
        // the derivative walk would take 2^40 steps.
        let (x, xid) = var(1.0);
        let mut t = x;
        for _ in 0..40 {
            t = Expr::binary(OpCode::Mul, t.clone(), t);
        }
        assert_eq!(t.value(), 1.0);
        assert_eq!(t.derivative(xid), Some(2.0_f64.powi(40)));
        assert_eq!(t.ids().len(), 1);
    }

    #[test]
    fn pow_dispatches_on_literal_operands() {
        let (x, _) = var(2.0);
        assert_eq!(x.clone().pow(3.0).op(), OpCode::PowConst);
        assert_eq!(Expr::literal(3.0).pow(x.clone()).op(), OpCode::ConstPow);
        assert_eq!(x.clone().pow(x.clone()).op(), OpCode::Pow);
        assert_eq!(Expr::literal(3.0).pow(x).value(), 9.0);
    }

    #[test]
    fn tape_is_post_order() {
        let (x, xid) = var(3.0);
        let e = Expr::binary(OpCode::Add, x.sin(), Expr::literal(1.0));
        let tape = e.to_tape();
        let ops: Vec<OpCode> = tape.statements().iter().map(|s| s.op).collect();
        assert_eq!(
            ops,
            vec![OpCode::Variable, OpCode::Sin, OpCode::Constant, OpCode::Add]
        );
        assert_eq!(tape.statements()[0].id, xid);
        assert_eq!(tape.value(), Some(e.value()));
    }
}
