use varad::{math, Variable};

// ─── Rosenbrock ────────────────────────────────────────────────────────────

pub fn rosenbrock(x: &[Variable<f64>]) -> Variable<f64> {
    let mut sum = Variable::new(0.0);
    for i in 0..x.len() - 1 {
        let t1 = 1.0 - &x[i];
        let t2 = &x[i + 1] - &x[i] * &x[i];
        sum += &t1 * &t1 + 100.0 * &t2 * &t2;
    }
    sum
}

pub fn rosenbrock_f64(x: &[f64]) -> f64 {
    let mut sum = 0.0;
    for i in 0..x.len() - 1 {
        let t1 = 1.0 - x[i];
        let t2 = x[i + 1] - x[i] * x[i];
        sum += t1 * t1 + 100.0 * t2 * t2;
    }
    sum
}

// ─── Rastrigin ─────────────────────────────────────────────────────────────
// f(x) = 10n + Σ[x_i² - 10·cos(2π·x_i)]

pub fn rastrigin(x: &[Variable<f64>]) -> Variable<f64> {
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut sum = Variable::new(10.0 * x.len() as f64);
    for xi in x {
        sum += xi * xi - 10.0 * math::cos(xi * two_pi);
    }
    sum
}

// ─── Deep chain ────────────────────────────────────────────────────────────
// t ← t·t repeated, sharing the previous node each time.

pub fn repeated_square(x: &Variable<f64>, depth: usize) -> Variable<f64> {
    let mut t = varad::Expr::from(x);
    for _ in 0..depth {
        t = &t * &t;
    }
    Variable::from(t)
}

// ─── Helpers ───────────────────────────────────────────────────────────────

pub fn make_input(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.5 + 0.01 * i as f64).collect()
}

pub fn make_variables(x: &[f64]) -> Vec<Variable<f64>> {
    x.iter().map(|&v| Variable::independent(v)).collect()
}

pub fn finite_diff_gradient(f: fn(&[f64]) -> f64, x: &[f64], h: f64) -> Vec<f64> {
    let mut g = vec![0.0; x.len()];
    let mut xp = x.to_vec();
    for i in 0..x.len() {
        let orig = xp[i];
        xp[i] = orig + h;
        let fp = f(&xp);
        xp[i] = orig - h;
        let fm = f(&xp);
        xp[i] = orig;
        g[i] = (fp - fm) / (2.0 * h);
    }
    g
}
