use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::rc::Rc;

use crate::context;
use crate::expr::{Expr, Leaf};
use crate::float::Float;
use crate::gradient::GradientMap;
use crate::id::{self, IvId, NOT_INDEPENDENT};
use crate::opcode::{self, OpCode};
use crate::tape::Tape;

/// Gradient-accumulating scalar cell.
///
/// Assigning an expression into a `Variable` evaluates the derivative of the
/// expression with respect to every independent variable it reaches and stores
/// the result, so the Variable can later be queried with [`wrt`](Self::wrt)
/// or used as an operand in further expressions.
///
/// ```
/// use varad::{math, Variable};
///
/// let x = Variable::independent(2.0_f64);
/// let y = Variable::independent(3.0_f64);
/// let mut f = Variable::default();
/// f.assign(&x * &y + math::sin(&x));
/// assert_eq!(f.wrt(&x), 3.0 + 2.0_f64.cos());
/// assert_eq!(f.wrt(&y), 2.0);
/// ```
#[derive(Clone, Debug)]
pub struct Variable<F: Float> {
    value: F,
    iv_id: IvId,
    independent: bool,
    min: F,
    max: F,
    name: Option<String>,
    gradient: Rc<GradientMap<F>>,
    tape: Option<Rc<Tape<F>>>,
}

impl<F: Float> Default for Variable<F> {
    fn default() -> Self {
        Variable::new(F::zero())
    }
}

impl<F: Float> Variable<F> {
    /// A constant Variable with no dependencies.
    pub fn new(value: F) -> Self {
        Variable {
            value,
            iv_id: NOT_INDEPENDENT,
            independent: false,
            min: F::min_value(),
            max: F::max_value(),
            name: None,
            gradient: Rc::new(GradientMap::new()),
            tape: None,
        }
    }

    /// An independent Variable with a freshly allocated id.
    pub fn independent(value: F) -> Self {
        let mut v = Variable::new(value);
        v.set_independent(true);
        v
    }

    /// Attach a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach bounds. Inverted bounds are swapped.
    pub fn with_bounds(mut self, min: F, max: F) -> Self {
        self.set_bounds(min, max);
        self
    }

    #[inline]
    pub fn value(&self) -> F {
        self.value
    }

    /// The independent-variable id, or [`NOT_INDEPENDENT`].
    #[inline]
    pub fn id(&self) -> IvId {
        if self.independent {
            self.iv_id
        } else {
            NOT_INDEPENDENT
        }
    }

    #[inline]
    pub fn is_independent(&self) -> bool {
        self.independent
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    /// `(min, max)`; the representable extremes when unbounded.
    pub fn bounds(&self) -> (F, F) {
        (self.min, self.max)
    }

    pub fn set_bounds(&mut self, min: F, max: F) {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        self.min = min;
        self.max = max;
    }

    /// Whether either bound is tighter than the representable range.
    pub fn is_bounded(&self) -> bool {
        self.min > F::min_value() || self.max < F::max_value()
    }

    /// Mark or unmark this Variable as independent.
    ///
    /// The id is allocated the first time and kept afterwards, so toggling
    /// never consumes or reuses ids.
    pub fn set_independent(&mut self, on: bool) {
        if on && self.iv_id == NOT_INDEPENDENT {
            self.iv_id = id::allocate();
        }
        self.independent = on;
    }

    /// The accumulated partial derivatives.
    pub fn gradient(&self) -> &GradientMap<F> {
        &self.gradient
    }

    /// The recorded statement tape, if any.
    pub fn tape(&self) -> Option<&Tape<F>> {
        self.tape.as_deref()
    }

    /// Assign a plain scalar: the Variable keeps its independence but loses
    /// all recorded dependencies.
    pub fn set_value(&mut self, value: F) {
        self.value = value;
        self.clear_derivatives();
    }

    fn clear_derivatives(&mut self) {
        if !self.gradient.is_empty() {
            self.gradient = Rc::new(GradientMap::new());
        }
        self.tape = None;
    }

    /// Assign an expression, re-deriving gradient and tape from scratch.
    ///
    /// A plain scalar behaves like [`set_value`](Self::set_value).
    pub fn assign(&mut self, expr: impl Into<Expr<F>>) {
        let expr = expr.into();
        if expr.is_literal() {
            self.set_value(expr.value());
            return;
        }
        if !context::is_recording() {
            self.value = expr.value();
            self.clear_derivatives();
            return;
        }

        let mut ids = BTreeSet::new();
        expr.collect_ids(&mut ids);

        let mut gradient = GradientMap::with_capacity(ids.len());
        for id in ids {
            gradient.insert(id, expr.derivative(id).unwrap_or_else(F::zero));
        }

        self.tape = context::supports_arbitrary_order().then(|| Rc::new(expr.to_tape()));
        self.gradient = Rc::new(gradient);
        self.value = expr.value();
    }

    /// Assign another Variable, treated as the identity expression.
    pub fn assign_from(&mut self, other: &Variable<F>) {
        self.assign(other.expr());
    }

    /// This Variable as an expression leaf.
    pub fn expr(&self) -> Expr<F> {
        Expr::leaf(self.value, self.as_operand())
    }

    /// Derivative with respect to `id`: one for this Variable's own id when
    /// independent, the stored partial otherwise, `None` if nothing is recorded.
    #[inline]
    pub fn partial(&self, id: IvId) -> Option<F> {
        if id == NOT_INDEPENDENT {
            None
        } else if self.independent && self.iv_id == id {
            Some(F::one())
        } else {
            self.gradient.get(id)
        }
    }

    /// Derivative of this Variable with respect to `other`.
    ///
    /// Zero when `other` is not independent or no dependency was recorded.
    #[inline]
    pub fn wrt(&self, other: &Variable<F>) -> F {
        self.partial(other.id()).unwrap_or_else(F::zero)
    }

    /// Derivative with respect to `other`, obtained by replaying the tape.
    ///
    /// Zero when no tape was recorded.
    pub fn diff(&self, other: &Variable<F>) -> F {
        match self.tape.as_deref() {
            Some(tape) => tape.derivative(other.id()),
            None => F::zero(),
        }
    }

    /// This Variable as an operand: an independent Variable is a pure input
    /// and its own stored gradient does not flow through it.
    fn as_operand(&self) -> Leaf<F> {
        Leaf {
            id: self.id(),
            gradient: Rc::clone(&self.gradient),
            tape: self.tape.clone(),
        }
    }

    fn operand_ids(&self) -> Vec<IvId> {
        if self.independent {
            vec![self.iv_id]
        } else {
            self.gradient.ids().collect()
        }
    }

    /// In-place `self = self <op> rhs` for a Variable right-hand side.
    ///
    /// Produces the same value, gradient and tape as assigning the expression
    /// `self <op> rhs`, without building the expression for the gradient.
    pub(crate) fn combine(&mut self, op: OpCode, rhs: &Variable<F>) {
        let a = self.value;
        let b = rhs.value;
        let r = opcode::eval_forward(op, a, b);
        if !context::is_recording() {
            self.value = r;
            self.clear_derivatives();
            return;
        }

        let ids: BTreeSet<IvId> = self
            .operand_ids()
            .into_iter()
            .chain(rhs.operand_ids())
            .collect();
        let (lhs_leaf, rhs_leaf) = (self.as_operand(), rhs.as_operand());
        let mut gradient = GradientMap::with_capacity(ids.len());
        for id in ids {
            let (da, db) = (lhs_leaf.derivative(id), rhs_leaf.derivative(id));
            if let Some(d) = opcode::chain_binary(op, a, b, r, da, db) {
                gradient.insert(id, d);
            }
        }

        if context::supports_arbitrary_order() {
            let tape = Expr::binary(op, self.expr(), rhs.expr()).to_tape();
            self.tape = Some(Rc::new(tape));
        } else {
            self.tape = None;
        }
        self.gradient = Rc::new(gradient);
        self.value = r;
    }
}

impl<F: Float> From<F> for Variable<F> {
    fn from(value: F) -> Self {
        Variable::new(value)
    }
}

impl<F: Float> From<Expr<F>> for Variable<F> {
    fn from(expr: Expr<F>) -> Self {
        let mut v = Variable::default();
        v.assign(expr);
        v
    }
}

impl<F: Float> From<&Variable<F>> for Expr<F> {
    #[inline]
    fn from(v: &Variable<F>) -> Self {
        v.expr()
    }
}

impl<F: Float> From<Variable<F>> for Expr<F> {
    #[inline]
    fn from(v: Variable<F>) -> Self {
        v.expr()
    }
}

impl<F: Float> Display for Variable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} = {}", name, self.value),
            None => write!(f, "{}", self.value),
        }
    }
}
