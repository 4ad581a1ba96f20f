use std::ops::Index;

use varad::{Float, Variable};

use crate::bounds::Bounds;
use crate::error::ConfigError;

/// Handle to a registered parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(usize);

impl ParamId {
    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        ParamId(index)
    }

    /// Registration order, starting at zero.
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One estimated quantity: an independent Variable, its activation phase and
/// optional bounds.
#[derive(Debug, Clone)]
pub struct Parameter<F: Float> {
    variable: Variable<F>,
    phase: u32,
    bounds: Option<Bounds<F>>,
}

impl<F: Float> Parameter<F> {
    pub fn variable(&self) -> &Variable<F> {
        &self.variable
    }

    pub fn value(&self) -> F {
        self.variable.value()
    }

    /// First phase in which this parameter is estimated.
    pub fn phase(&self) -> u32 {
        self.phase
    }

    pub fn bounds(&self) -> Option<Bounds<F>> {
        self.bounds
    }
}

/// Registry of the parameters an [`Optimizer`](crate::Optimizer) estimates.
///
/// Every registered Variable is marked independent. A parameter is active in
/// every phase at or after its activation phase and held fixed before it.
#[derive(Debug, Clone)]
pub struct Parameters<F: Float> {
    entries: Vec<Parameter<F>>,
}

impl<F: Float> Default for Parameters<F> {
    fn default() -> Self {
        Parameters::new()
    }
}

impl<F: Float> Parameters<F> {
    pub fn new() -> Self {
        Parameters {
            entries: Vec::new(),
        }
    }

    /// Register for phase 1. A Variable that carries its own bounds keeps them.
    pub fn register(&mut self, variable: Variable<F>) -> ParamId {
        let bounds = variable.is_bounded().then(|| {
            let (lo, hi) = variable.bounds();
            Bounds::new(lo, hi)
        });
        self.push(variable, bounds, 1)
    }

    /// Register for phase 1 within `[lower, upper]`.
    pub fn register_bounded(&mut self, variable: Variable<F>, lower: F, upper: F) -> ParamId {
        self.push(variable, Some(Bounds::new(lower, upper)), 1)
    }

    /// Register with explicit bounds and activation phase.
    pub fn register_phased(
        &mut self,
        variable: Variable<F>,
        bounds: Option<(F, F)>,
        phase: u32,
    ) -> Result<ParamId, ConfigError> {
        if phase == 0 {
            tracing::error!("parameter registered with activation phase 0");
            return Err(ConfigError::InvalidPhase);
        }
        let bounds = bounds.map(|(lo, hi)| Bounds::new(lo, hi));
        Ok(self.push(variable, bounds, phase))
    }

    fn push(&mut self, mut variable: Variable<F>, bounds: Option<Bounds<F>>, phase: u32) -> ParamId {
        variable.set_independent(true);
        if let Some(b) = bounds {
            variable.set_bounds(b.lower, b.upper);
        }
        let id = ParamId::new(self.entries.len());
        tracing::debug!(
            index = id.index(),
            iv_id = variable.id(),
            phase,
            bounded = bounds.is_some(),
            "parameter registered"
        );
        self.entries.push(Parameter {
            variable,
            phase,
            bounds,
        });
        id
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: ParamId) -> Option<&Parameter<F>> {
        self.entries.get(id.0)
    }

    /// Current value of a parameter.
    ///
    /// # Panics
    ///
    /// If `id` came from a different registry.
    pub fn value(&self, id: ParamId) -> F {
        self.entries[id.0].value()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, &Parameter<F>)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, p)| (ParamId::new(i), p))
    }

    /// The latest activation phase; zero when nothing is registered.
    pub fn max_phase(&self) -> u32 {
        self.entries.iter().map(|p| p.phase).max().unwrap_or(0)
    }

    /// Parameters estimated in `phase`, in registration order.
    pub fn active(&self, phase: u32) -> Vec<ParamId> {
        self.iter()
            .filter(|(_, p)| p.phase <= phase)
            .map(|(id, _)| id)
            .collect()
    }

    pub(crate) fn set_value(&mut self, id: ParamId, value: F) {
        self.entries[id.0].variable.set_value(value);
    }

    /// Reset every bounded parameter that lies outside its box to the midpoint.
    pub(crate) fn admit_bounds(&mut self) {
        for (i, p) in self.entries.iter_mut().enumerate() {
            let Some(b) = p.bounds else { continue };
            let v = p.variable.value();
            let admitted = b.admit(v);
            if admitted != v {
                tracing::debug!(index = i, from = %v, to = %admitted, "parameter reset into bounds");
                p.variable.set_value(admitted);
            }
        }
    }

    pub(crate) fn bounds_of(&self, ids: &[ParamId]) -> Vec<Option<Bounds<F>>> {
        ids.iter().map(|&id| self.entries[id.0].bounds).collect()
    }
}

impl<F: Float> Index<ParamId> for Parameters<F> {
    type Output = Variable<F>;

    fn index(&self, id: ParamId) -> &Variable<F> {
        &self.entries[id.0].variable
    }
}
