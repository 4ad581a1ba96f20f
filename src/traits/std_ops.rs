use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use crate::expr::Expr;
use crate::float::Float;
use crate::opcode::OpCode;
use crate::variable::Variable;

// ──────────────────────────────────────────────
//  Expression-building operators
// ──────────────────────────────────────────────

// Every operand kind converts into an `Expr` leaf or node; the operator only
// picks the opcode.
macro_rules! impl_binary_ops {
    ($($Trait:ident $method:ident => $op:ident;)*) => {$(
        impl_binary_ops!(@impl $Trait $method $op; [] Expr<F>, Expr<F>);
        impl_binary_ops!(@impl $Trait $method $op; ['a] Expr<F>, &'a Expr<F>);
        impl_binary_ops!(@impl $Trait $method $op; ['a] Expr<F>, &'a Variable<F>);
        impl_binary_ops!(@impl $Trait $method $op; [] Expr<F>, F);

        impl_binary_ops!(@impl $Trait $method $op; ['a] &'a Expr<F>, Expr<F>);
        impl_binary_ops!(@impl $Trait $method $op; ['a, 'b] &'a Expr<F>, &'b Expr<F>);
        impl_binary_ops!(@impl $Trait $method $op; ['a, 'b] &'a Expr<F>, &'b Variable<F>);
        impl_binary_ops!(@impl $Trait $method $op; ['a] &'a Expr<F>, F);

        impl_binary_ops!(@impl $Trait $method $op; ['a] &'a Variable<F>, Expr<F>);
        impl_binary_ops!(@impl $Trait $method $op; ['a, 'b] &'a Variable<F>, &'b Expr<F>);
        impl_binary_ops!(@impl $Trait $method $op; ['a, 'b] &'a Variable<F>, &'b Variable<F>);
        impl_binary_ops!(@impl $Trait $method $op; ['a] &'a Variable<F>, F);
    )*};
    (@impl $Trait:ident $method:ident $op:ident; [$($lt:lifetime),*] $Lhs:ty, $Rhs:ty) => {
        impl<$($lt,)* F: Float> $Trait<$Rhs> for $Lhs {
            type Output = Expr<F>;
            #[inline]
            fn $method(self, rhs: $Rhs) -> Expr<F> {
                Expr::binary(OpCode::$op, Expr::<F>::from(self), Expr::<F>::from(rhs))
            }
        }
    };
}

impl_binary_ops! {
    Add add => Add;
    Sub sub => Sub;
    Mul mul => Mul;
    Div div => Div;
}

// Mixed ops with a primitive float on the left.
// We generate these for f32 and f64 via a macro.
macro_rules! impl_scalar_lhs_ops {
    ($f:ty; $($Trait:ident $method:ident => $op:ident;)*) => {$(
        impl $Trait<Expr<$f>> for $f {
            type Output = Expr<$f>;
            #[inline]
            fn $method(self, rhs: Expr<$f>) -> Expr<$f> {
                Expr::binary(OpCode::$op, Expr::literal(self), rhs)
            }
        }

        impl<'a> $Trait<&'a Expr<$f>> for $f {
            type Output = Expr<$f>;
            #[inline]
            fn $method(self, rhs: &'a Expr<$f>) -> Expr<$f> {
                Expr::binary(OpCode::$op, Expr::literal(self), rhs.clone())
            }
        }

        impl<'a> $Trait<&'a Variable<$f>> for $f {
            type Output = Expr<$f>;
            #[inline]
            fn $method(self, rhs: &'a Variable<$f>) -> Expr<$f> {
                Expr::binary(OpCode::$op, Expr::literal(self), rhs.expr())
            }
        }
    )*};
}

macro_rules! impl_scalar_lhs_all {
    ($($f:ty),*) => {$(
        impl_scalar_lhs_ops! {
            $f;
            Add add => Add;
            Sub sub => Sub;
            Mul mul => Mul;
            Div div => Div;
        }
    )*};
}

impl_scalar_lhs_all!(f32, f64);

impl<F: Float> Neg for Expr<F> {
    type Output = Expr<F>;
    #[inline]
    fn neg(self) -> Expr<F> {
        Expr::unary(OpCode::Neg, self, F::zero())
    }
}

impl<F: Float> Neg for &Expr<F> {
    type Output = Expr<F>;
    #[inline]
    fn neg(self) -> Expr<F> {
        -self.clone()
    }
}

impl<F: Float> Neg for &Variable<F> {
    type Output = Expr<F>;
    #[inline]
    fn neg(self) -> Expr<F> {
        -self.expr()
    }
}

// ──────────────────────────────────────────────
//  Compound assignment on Variable
// ──────────────────────────────────────────────

// A Variable right-hand side combines gradients in place; anything else goes
// through the expression path `self = self <op> rhs`.
macro_rules! impl_compound_assign {
    ($($Trait:ident $method:ident => $op:ident;)*) => {$(
        impl<'a, F: Float> $Trait<&'a Variable<F>> for Variable<F> {
            #[inline]
            fn $method(&mut self, rhs: &'a Variable<F>) {
                self.combine(OpCode::$op, rhs);
            }
        }

        impl<F: Float> $Trait<Variable<F>> for Variable<F> {
            #[inline]
            fn $method(&mut self, rhs: Variable<F>) {
                self.combine(OpCode::$op, &rhs);
            }
        }

        impl<F: Float> $Trait<Expr<F>> for Variable<F> {
            #[inline]
            fn $method(&mut self, rhs: Expr<F>) {
                let expr = Expr::binary(OpCode::$op, self.expr(), rhs);
                self.assign(expr);
            }
        }

        impl<'a, F: Float> $Trait<&'a Expr<F>> for Variable<F> {
            #[inline]
            fn $method(&mut self, rhs: &'a Expr<F>) {
                let expr = Expr::binary(OpCode::$op, self.expr(), rhs.clone());
                self.assign(expr);
            }
        }

        impl<F: Float> $Trait<F> for Variable<F> {
            #[inline]
            fn $method(&mut self, rhs: F) {
                let expr = Expr::binary(OpCode::$op, self.expr(), Expr::literal(rhs));
                self.assign(expr);
            }
        }
    )*};
}

impl_compound_assign! {
    AddAssign add_assign => Add;
    SubAssign sub_assign => Sub;
    MulAssign mul_assign => Mul;
    DivAssign div_assign => Div;
}

#[cfg(test)]
mod tests {
    use crate::Variable;

    #[test]
    fn mixed_operands() {
        let x = Variable::independent(2.0_f64);
        let y = Variable::independent(5.0_f64);

        let e = 3.0 * &x - &y / 2.0 + (&x * &y);
        assert_eq!(e.value(), 6.0 - 2.5 + 10.0);
        assert_eq!(e.derivative(x.id()), Some(3.0 + 5.0));
        assert_eq!(e.derivative(y.id()), Some(-0.5 + 2.0));

        let n = -&x;
        assert_eq!(n.value(), -2.0);
        assert_eq!(n.derivative(x.id()), Some(-1.0));
    }

    #[test]
    fn scalar_compound_assign() {
        let x = Variable::independent(2.0_f64);
        let mut v = Variable::default();
        v.assign(&x * &x);
        v += 1.0;
        v *= 3.0;
        assert_eq!(v.value(), 15.0);
        assert_eq!(v.wrt(&x), 12.0);
    }
}
