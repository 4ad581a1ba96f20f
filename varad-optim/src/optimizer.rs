use varad::{DiffContext, Float, Variable};

use crate::error::ConfigError;
use crate::objective::{Model, PhaseObjective};
use crate::parameters::{ParamId, Parameters};
use crate::result::OptimResult;
use crate::solvers::lbfgs::{minimize, LbfgsConfig};

/// Search direction strategy for [`Optimizer::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Algorithm {
    #[default]
    Lbfgs,
    SteepestDescent,
}

/// Phased, bound-constrained minimizer of a [`Model`].
///
/// Parameters are registered up front; `run` then minimizes the model's
/// objective over the parameters active in each phase, from phase 1 up to the
/// largest registered phase. Each phase starts from where the previous one
/// left every parameter.
///
/// ```
/// use varad::Variable;
/// use varad_optim::{Algorithm, LbfgsConfig, Model, Optimizer, ParamId, Parameters};
///
/// struct Parabola(ParamId);
///
/// impl Model<f64> for Parabola {
///     fn objective_function(&mut self, params: &Parameters<f64>, f: &mut Variable<f64>) {
///         let x = &params[self.0];
///         f.assign((x - 3.0) * (x - 3.0));
///     }
/// }
///
/// let mut opt = Optimizer::new(LbfgsConfig::default()).unwrap();
/// let x = opt.register(Variable::new(0.0));
/// let mut model = Parabola(x);
/// assert!(opt.run(&mut model, Algorithm::Lbfgs));
/// assert!((opt.value(x) - 3.0).abs() < 1e-6);
/// ```
#[derive(Debug)]
pub struct Optimizer<F: Float> {
    config: LbfgsConfig<F>,
    context: DiffContext,
    params: Parameters<F>,
    results: Vec<OptimResult<F>>,
    gradient: Vec<F>,
}

impl<F: Float> Optimizer<F> {
    /// Create an optimizer, rejecting an unusable configuration.
    pub fn new(config: LbfgsConfig<F>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Optimizer {
            config,
            context: DiffContext::default(),
            params: Parameters::new(),
            results: Vec::new(),
            gradient: Vec::new(),
        })
    }

    /// Switches activated for the duration of each run.
    pub fn with_context(mut self, context: DiffContext) -> Self {
        self.context = context;
        self
    }

    pub fn config(&self) -> &LbfgsConfig<F> {
        &self.config
    }

    pub fn parameters(&self) -> &Parameters<F> {
        &self.params
    }

    pub fn register(&mut self, variable: Variable<F>) -> ParamId {
        self.params.register(variable)
    }

    pub fn register_bounded(&mut self, variable: Variable<F>, lower: F, upper: F) -> ParamId {
        self.params.register_bounded(variable, lower, upper)
    }

    pub fn register_phased(
        &mut self,
        variable: Variable<F>,
        bounds: Option<(F, F)>,
        phase: u32,
    ) -> Result<ParamId, ConfigError> {
        self.params.register_phased(variable, bounds, phase)
    }

    /// Current value of a registered parameter.
    pub fn value(&self, id: ParamId) -> F {
        self.params.value(id)
    }

    /// Minimize `model` phase by phase.
    ///
    /// Returns `true` when every phase ended at an accepted solution. The
    /// first failing phase stops the run; its result is still recorded and
    /// `finalize` is still called.
    pub fn run<M: Model<F> + ?Sized>(&mut self, model: &mut M, algorithm: Algorithm) -> bool {
        let _ctx = self.context.activate();
        self.results.clear();

        model.initialize(&mut self.params);
        self.params.admit_bounds();
        self.gradient = vec![F::zero(); self.params.len()];

        let memory = match algorithm {
            Algorithm::Lbfgs => self.config.memory,
            Algorithm::SteepestDescent => 0,
        };
        let last_phase = self.params.max_phase().max(1);
        let mut success = true;

        for phase in 1..=last_phase {
            let active = self.params.active(phase);
            let bounds = self.params.bounds_of(&active);
            tracing::info!(phase, active = active.len(), ?algorithm, "phase starting");

            let mut obj = PhaseObjective::new(&mut *model, &mut self.params, &active);
            let x0 = obj.point();
            let mut result = minimize(&mut obj, &x0, &bounds, &self.config, memory);
            obj.load(&result.x);
            let model_evals = obj.func_evals();
            result.phase = phase;

            self.gradient.iter_mut().for_each(|g| *g = F::zero());
            for (id, &g) in active.iter().zip(&result.gradient) {
                self.gradient[id.index()] = g;
            }

            let ok = result.termination.is_success();
            if ok {
                tracing::info!(
                    phase,
                    iterations = result.iterations,
                    func_evals = model_evals,
                    value = %result.value,
                    termination = %result.termination,
                    "phase finished"
                );
            } else {
                tracing::warn!(
                    phase,
                    iterations = result.iterations,
                    termination = %result.termination,
                    "phase failed, stopping"
                );
            }
            self.results.push(result);

            if !ok {
                success = false;
                break;
            }
            model.transition_phase(phase, &self.params);
        }

        model.finalize(&self.params);
        success
    }

    /// Gradient of the objective at the end of the last phase run, indexed by
    /// [`ParamId::index`]. Parameters inactive in that phase read zero.
    pub fn gradient(&self) -> &[F] {
        &self.gradient
    }

    /// One result per phase of the last run.
    pub fn results(&self) -> &[OptimResult<F>] {
        &self.results
    }
}
