use std::fmt::{Debug, Display};

use num_traits::{Float as NumFloat, FloatConst, FromPrimitive};

/// Marker trait for the scalar types a [`Variable`](crate::Variable) can hold (`f32`, `f64`).
///
/// Bundles the numeric and utility traits needed by the expression nodes,
/// the gradient map and the statement tape.
pub trait Float:
    NumFloat + FloatConst + FromPrimitive + Copy + Default + Debug + Display + 'static
{
    /// Convert an `f64` constant into this type.
    #[inline]
    fn lit(value: f64) -> Self {
        Self::from_f64(value).unwrap_or_else(Self::nan)
    }
}

impl Float for f32 {}
impl Float for f64 {}
