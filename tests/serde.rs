#![cfg(feature = "serde")]

use varad::{DiffContext, OpCode, Statement, Tape, Variable};

fn rosenbrock(x: &Variable<f64>, y: &Variable<f64>) -> Variable<f64> {
    let dx = 1.0 - x;
    let t = y - x * x;
    let mut f = Variable::default();
    f.assign(&dx * &dx + 100.0 * &t * &t);
    f
}

#[test]
fn roundtrip_tape_json() {
    let _ctx = DiffContext::with_tape().activate();
    let x = Variable::independent(1.5);
    let y = Variable::independent(2.5);
    let f = rosenbrock(&x, &y);
    let tape = f.tape().unwrap();

    let json = serde_json::to_string(tape).unwrap();
    let tape2: Tape<f64> = serde_json::from_str(&json).unwrap();

    assert_eq!(&tape2, tape);
    for v in [&x, &y] {
        let o = tape.derivative(v.id());
        let d = tape2.derivative(v.id());
        assert!((o - d).abs() < 1e-12, "original={}, deserialized={}", o, d);
    }
    assert_eq!(tape2.value(), Some(f.value()));
}

#[test]
fn hand_written_tape_from_json() {
    // sin(x) * 2 at x = 0 (id 9)
    let statements = vec![
        Statement::variable(0.0_f64, 9),
        Statement::operator(OpCode::Sin, 0.0),
        Statement::constant(2.0),
        Statement::operator(OpCode::Mul, 0.0),
    ];
    let json = serde_json::to_string(&statements).unwrap();
    let parsed: Vec<Statement<f64>> = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, statements);

    let tape: Tape<f64> = serde_json::from_str(&format!("{{\"statements\":{json}}}")).unwrap();
    assert_eq!(tape.derivative(9), 2.0);
}

#[test]
fn context_roundtrip() {
    let ctx = DiffContext::with_tape();
    let json = serde_json::to_string(&ctx).unwrap();
    let back: DiffContext = serde_json::from_str(&json).unwrap();
    assert_eq!(back, ctx);
}
