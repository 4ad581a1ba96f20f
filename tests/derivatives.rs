use approx::assert_relative_eq;
use proptest::prelude::*;
use varad::{math, Expr, Variable};

/// Derivative of `f` at `x` through assignment into a Variable.
fn assigned_grad(f: impl Fn(&Variable<f64>) -> Expr<f64>, x_val: f64) -> f64 {
    let x = Variable::independent(x_val);
    let mut y = Variable::default();
    y.assign(f(&x));
    y.wrt(&x)
}

/// The same expression evaluated on a constant, for finite differencing.
fn plain_value(f: &impl Fn(&Variable<f64>) -> Expr<f64>, x_val: f64) -> f64 {
    f(&Variable::new(x_val)).value()
}

/// Central finite difference for comparison.
fn finite_diff(f: impl Fn(f64) -> f64, x: f64) -> f64 {
    let h = 1e-6 * x.abs().max(1.0);
    (f(x + h) - f(x - h)) / (2.0 * h)
}

fn fd_matches(f: impl Fn(&Variable<f64>) -> Expr<f64>, x: f64) -> Result<(), TestCaseError> {
    let grad = assigned_grad(&f, x);
    let expected = finite_diff(|v| plain_value(&f, v), x);
    prop_assert!(
        (grad - expected).abs() <= 1e-6 * expected.abs().max(1.0),
        "at x = {}: assigned {} vs finite difference {}",
        x,
        grad,
        expected
    );
    Ok(())
}

// ── Arithmetic ──

#[test]
fn x_squared() {
    let grad = assigned_grad(|x| x * x, 3.0);
    assert_relative_eq!(grad, 6.0, max_relative = 1e-12);
}

#[test]
fn x_times_y() {
    let x = Variable::independent(3.0);
    let y = Variable::independent(4.0);
    let mut z = Variable::default();
    z.assign(&x * &y);
    assert_eq!(z.wrt(&x), 4.0);
    assert_eq!(z.wrt(&y), 3.0);
}

#[test]
fn diamond_pattern() {
    // z = x^2 + x^3, both paths use x.
    let grad = assigned_grad(|x| x * x + x * x * x, 2.0);
    assert_relative_eq!(grad, 4.0 + 12.0, max_relative = 1e-12);
}

#[test]
fn derivative_through_intermediate_variables() {
    let x = Variable::independent(0.5);
    let y = Variable::independent(2.0);
    let mut u = Variable::default();
    u.assign(math::sin(&x) * &y);
    let mut w = Variable::default();
    w.assign(&u * &u + &x);

    let expected_x = 2.0 * 0.5_f64.sin() * 2.0 * 0.5_f64.cos() * 2.0 + 1.0;
    let expected_y = 2.0 * 0.5_f64.sin() * 2.0 * 0.5_f64.sin();
    assert_relative_eq!(w.wrt(&x), expected_x, max_relative = 1e-12);
    assert_relative_eq!(w.wrt(&y), expected_y, max_relative = 1e-12);
}

#[test]
fn expression_variable_power() {
    let x = Variable::independent(1.5);
    let y = Variable::independent(2.5);
    let mut z = Variable::default();
    z.assign(math::pow(&x, &y));
    assert_relative_eq!(z.value(), 1.5_f64.powf(2.5), max_relative = 1e-14);
    assert_relative_eq!(z.wrt(&x), 2.5 * 1.5_f64.powf(1.5), max_relative = 1e-12);
    assert_relative_eq!(
        z.wrt(&y),
        1.5_f64.powf(2.5) * 1.5_f64.ln(),
        max_relative = 1e-12
    );
}

#[test]
fn atan2_partials() {
    let y = Variable::independent(1.0);
    let x = Variable::independent(2.0);
    let mut z = Variable::default();
    z.assign(math::atan2(&y, &x));
    assert_relative_eq!(z.wrt(&y), 2.0 / 5.0, max_relative = 1e-12);
    assert_relative_eq!(z.wrt(&x), -1.0 / 5.0, max_relative = 1e-12);
}

// ── Fixed choices ──

#[test]
fn literal_base_power_has_zero_derivative() {
    let grad = assigned_grad(|x| Expr::literal_pow(2.0, x), 3.0);
    assert_eq!(grad, 0.0);
    let x = Variable::independent(3.0);
    assert_eq!(Expr::literal_pow(2.0, &x).value(), 8.0);
}

#[test]
fn floor_and_ceil_are_flat() {
    for v in [-2.5, -0.3, 0.7, 4.2] {
        assert_eq!(assigned_grad(|x| math::floor(x), v), 0.0);
        assert_eq!(assigned_grad(|x| math::ceil(x), v), 0.0);
    }
}

#[test]
fn mfexp_derivative_is_its_value() {
    for v in [-80.0_f64, -3.0, 0.0, 2.0, 75.0] {
        let x = Variable::independent(v);
        let mut y = Variable::default();
        y.assign(math::mfexp(&x));
        assert!(y.value().is_finite());
        assert_eq!(y.wrt(&x), y.value());
    }
}

#[test]
fn abs_at_zero_follows_signum() {
    assert_eq!(assigned_grad(|x| math::abs(x), 0.0), 1.0);
    assert_eq!(assigned_grad(|x| math::abs(x), -2.0), -1.0);
}

// ── Elementals against finite differences ──

proptest! {
    #[test]
    fn unary_elementals(x in -3.0f64..3.0) {
        fd_matches(|v| math::sin(v), x)?;
        fd_matches(|v| math::cos(v), x)?;
        fd_matches(|v| math::atan(v), x)?;
        fd_matches(|v| math::sinh(v), x)?;
        fd_matches(|v| math::cosh(v), x)?;
        fd_matches(|v| math::tanh(v), x)?;
        fd_matches(|v| math::exp(v), x)?;
        fd_matches(|v| -v * 2.0 + 1.0, x)?;
    }

    #[test]
    fn positive_domain_elementals(x in 0.1f64..5.0) {
        fd_matches(|v| math::sqrt(v), x)?;
        fd_matches(|v| math::log(v), x)?;
        fd_matches(|v| math::log10(v), x)?;
        fd_matches(|v| math::abs(v), x)?;
        fd_matches(|v| math::abs(-v), x)?;
        fd_matches(|v| 1.0 / v, x)?;
    }

    #[test]
    fn bounded_domain_elementals(x in -0.9f64..0.9) {
        fd_matches(|v| math::asin(v), x)?;
        fd_matches(|v| math::acos(v), x)?;
        fd_matches(|v| math::tan(v), x)?;
    }

    #[test]
    fn mfexp_inside_threshold(x in -5.0f64..5.0) {
        fd_matches(|v| math::mfexp(v), x)?;
    }

    #[test]
    fn constant_exponent(x in 0.5f64..3.0, c in -2.0f64..3.0) {
        fd_matches(|v| math::pow(v, c), x)?;
        fd_matches(|v| Expr::from(v).powf(c), x)?;
    }

    #[test]
    fn binary_operators(x in -3.0f64..3.0, y in 0.5f64..3.0) {
        fd_matches(|v| v + y, x)?;
        fd_matches(|v| v - y * v, x)?;
        fd_matches(|v| v * v * y, x)?;
        fd_matches(|v| v / y, x)?;
        fd_matches(|v| y / (v * v + 1.0), x)?;
        fd_matches(|v| math::atan2(v, y), x)?;
        fd_matches(|v| math::atan2(y, v * v + 0.5), x)?;
    }

    #[test]
    fn variable_exponent(x in 0.5f64..3.0, y in -2.0f64..2.0) {
        let yv = Variable::new(y);
        fd_matches(|v| math::pow(v, &yv), x)?;
        let xv = Variable::new(x);
        fd_matches(|v| math::pow(&xv, v), y)?;
    }

    #[test]
    fn composite(x in 0.2f64..2.0) {
        fd_matches(
            |v| math::exp(math::sin(v) * v) / math::sqrt(v * v + 1.0) + math::log(v) * math::cosh(v),
            x,
        )?;
    }
}
