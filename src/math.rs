//! Elementary functions over anything that converts into an [`Expr`]:
//! expressions, `&Variable`s and plain scalars.

use crate::expr::Expr;
use crate::float::Float;

macro_rules! unary_fns {
    ($($(#[$doc:meta])* $name:ident => $method:ident;)*) => {$(
        $(#[$doc])*
        #[inline]
        pub fn $name<F: Float>(x: impl Into<Expr<F>>) -> Expr<F> {
            x.into().$method()
        }
    )*};
}

unary_fns! {
    sqrt => sqrt;
    exp => exp;
    /// Exponential with rational tails beyond `|x| > 60`; derivative is `dx · mfexp(x)`.
    mfexp => mfexp;
    /// Natural logarithm.
    log => ln;
    log10 => log10;
    sin => sin;
    cos => cos;
    tan => tan;
    asin => asin;
    acos => acos;
    atan => atan;
    sinh => sinh;
    cosh => cosh;
    tanh => tanh;
    abs => abs;
    floor => floor;
    ceil => ceil;
}

/// `base ^ exponent`. See [`Expr::pow`] for how literal operands are handled.
#[inline]
pub fn pow<F: Float>(base: impl Into<Expr<F>>, exponent: impl Into<Expr<F>>) -> Expr<F> {
    base.into().pow(exponent)
}

/// Four-quadrant arctangent of `y / x`.
#[inline]
pub fn atan2<F: Float>(y: impl Into<Expr<F>>, x: impl Into<Expr<F>>) -> Expr<F> {
    y.into().atan2(x)
}
