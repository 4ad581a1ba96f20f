use varad::{Float, RecordingGuard, Variable};

use crate::parameters::{ParamId, Parameters};

/// Trait for optimization objectives.
///
/// Implementors provide function evaluation and gradient computation.
/// Methods take `&mut self` to allow caching, eval counting, and internal buffers.
pub trait Objective<F: num_traits::Float> {
    /// Number of input variables.
    fn dim(&self) -> usize;

    /// Evaluate the objective and its gradient at `x`.
    ///
    /// Returns `(f(x), ∇f(x))`.
    fn eval_grad(&mut self, x: &[F]) -> (F, Vec<F>);

    /// Evaluate the objective alone.
    ///
    /// Line searches call this for trial points. The default discards the
    /// gradient of [`eval_grad`](Self::eval_grad).
    fn eval(&mut self, x: &[F]) -> F {
        self.eval_grad(x).0
    }
}

/// A user model driven by [`Optimizer::run`](crate::Optimizer::run).
///
/// Only [`objective_function`](Self::objective_function) is required. It
/// reads the registered parameters and assigns the objective into `f`; the
/// optimizer decides whether that assignment records derivatives.
pub trait Model<F: Float> {
    /// Called once before the first phase, after parameters were registered.
    fn initialize(&mut self, params: &mut Parameters<F>) {
        let _ = params;
    }

    /// Compute the objective for the current parameter values.
    fn objective_function(&mut self, params: &Parameters<F>, f: &mut Variable<F>);

    /// Called after `phase` completed successfully, before the next one starts.
    fn transition_phase(&mut self, phase: u32, params: &Parameters<F>) {
        let _ = (phase, params);
    }

    /// Called once after the last phase.
    fn finalize(&mut self, params: &Parameters<F>) {
        let _ = params;
    }
}

/// Adapter exposing the active parameters of one phase as an [`Objective`].
///
/// Value-only evaluations run with recording disabled, so the objective
/// Variable carries no derivatives and costs no gradient work.
pub(crate) struct PhaseObjective<'a, F: Float, M: ?Sized> {
    model: &'a mut M,
    params: &'a mut Parameters<F>,
    active: &'a [ParamId],
    func_evals: usize,
}

impl<'a, F: Float, M: Model<F> + ?Sized> PhaseObjective<'a, F, M> {
    pub(crate) fn new(model: &'a mut M, params: &'a mut Parameters<F>, active: &'a [ParamId]) -> Self {
        PhaseObjective {
            model,
            params,
            active,
            func_evals: 0,
        }
    }

    /// Current values of the active parameters.
    pub(crate) fn point(&self) -> Vec<F> {
        self.active.iter().map(|&id| self.params.value(id)).collect()
    }

    /// Write `x` back into the active parameters.
    pub(crate) fn load(&mut self, x: &[F]) {
        for (&id, &v) in self.active.iter().zip(x) {
            self.params.set_value(id, v);
        }
    }

    pub(crate) fn func_evals(&self) -> usize {
        self.func_evals
    }

    fn evaluate(&mut self, recording: bool) -> Variable<F> {
        let _rec = RecordingGuard::new(recording);
        self.func_evals += 1;
        let mut f = Variable::default();
        self.model.objective_function(self.params, &mut f);
        f
    }
}

impl<F: Float, M: Model<F> + ?Sized> Objective<F> for PhaseObjective<'_, F, M> {
    fn dim(&self) -> usize {
        self.active.len()
    }

    fn eval_grad(&mut self, x: &[F]) -> (F, Vec<F>) {
        self.load(x);
        let f = self.evaluate(true);
        let grad = self.active.iter().map(|&id| f.wrt(&self.params[id])).collect();
        (f.value(), grad)
    }

    fn eval(&mut self, x: &[F]) -> F {
        self.load(x);
        self.evaluate(false).value()
    }
}
