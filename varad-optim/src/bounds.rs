use num_traits::Float;

/// Closed box `[lower, upper]` for one parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds<F> {
    pub lower: F,
    pub upper: F,
}

impl<F: Float> Bounds<F> {
    /// Inverted bounds are swapped.
    pub fn new(lower: F, upper: F) -> Self {
        if lower > upper {
            Bounds {
                lower: upper,
                upper: lower,
            }
        } else {
            Bounds { lower, upper }
        }
    }

    #[inline]
    pub fn contains(&self, x: F) -> bool {
        x >= self.lower && x <= self.upper
    }

    #[inline]
    pub fn clamp(&self, x: F) -> F {
        x.max(self.lower).min(self.upper)
    }

    #[inline]
    pub fn midpoint(&self) -> F {
        (self.lower + self.upper) / (F::one() + F::one())
    }

    /// `x` itself if feasible, otherwise the midpoint.
    #[inline]
    pub fn admit(&self, x: F) -> F {
        if self.contains(x) {
            x
        } else {
            self.midpoint()
        }
    }

    /// Whether a parameter at `x` with gradient `g` stays where it is.
    ///
    /// Only a parameter sitting exactly on a bound can be pinned: either its
    /// gradient is negligible or a descent step would leave the box.
    #[inline]
    pub fn pins(&self, x: F, g: F, tol: F) -> bool {
        let negligible = g.abs() < tol;
        (x <= self.lower && (negligible || g > F::zero()))
            || (x >= self.upper && (negligible || g < F::zero()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swapped_and_midpoint() {
        let b = Bounds::new(4.0_f64, -2.0);
        assert_eq!(b, Bounds { lower: -2.0, upper: 4.0 });
        assert_eq!(b.midpoint(), 1.0);
        assert_eq!(b.admit(7.0), 1.0);
        assert_eq!(b.admit(3.0), 3.0);
        assert_eq!(b.clamp(-9.0), -2.0);
    }

    #[test]
    fn pinning() {
        let b = Bounds::new(0.0_f64, 1.0);
        assert!(b.pins(0.0, 2.0, 1e-6));
        assert!(!b.pins(0.0, -2.0, 1e-6));
        assert!(b.pins(1.0, -2.0, 1e-6));
        assert!(b.pins(1.0, 1e-9, 1e-6));
        assert!(!b.pins(0.5, 2.0, 1e-6));
    }
}
