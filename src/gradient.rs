//! Sparse per-Variable gradient storage.

use std::collections::HashMap;

use crate::float::Float;
use crate::id::IvId;

/// Partial derivatives of one Variable, keyed by independent-variable id.
///
/// Only ids touched by an assignment are present. A missing entry reads as
/// zero, so "no recorded dependency" and "dependency with zero derivative"
/// are indistinguishable to callers of [`get_or_zero`](Self::get_or_zero).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GradientMap<F> {
    entries: HashMap<IvId, F>,
}

impl<F: Float> GradientMap<F> {
    pub fn new() -> Self {
        GradientMap {
            entries: HashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        GradientMap {
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// The stored partial for `id`, if any.
    #[inline]
    pub fn get(&self, id: IvId) -> Option<F> {
        self.entries.get(&id).copied()
    }

    /// The stored partial for `id`, or zero.
    #[inline]
    pub fn get_or_zero(&self, id: IvId) -> F {
        self.get(id).unwrap_or_else(F::zero)
    }

    #[inline]
    pub fn insert(&mut self, id: IvId, partial: F) {
        self.entries.insert(id, partial);
    }

    #[inline]
    pub fn contains(&self, id: IvId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Iterate `(id, partial)` pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (IvId, F)> + '_ {
        self.entries.iter().map(|(&id, &d)| (id, d))
    }

    /// Iterate the ids with a stored partial.
    pub fn ids(&self) -> impl Iterator<Item = IvId> + '_ {
        self.entries.keys().copied()
    }
}

impl<F: Float> FromIterator<(IvId, F)> for GradientMap<F> {
    fn from_iter<I: IntoIterator<Item = (IvId, F)>>(iter: I) -> Self {
        GradientMap {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_reads_zero() {
        let mut g = GradientMap::<f64>::new();
        assert_eq!(g.get(3), None);
        assert_eq!(g.get_or_zero(3), 0.0);
        g.insert(3, 2.5);
        assert_eq!(g.get(3), Some(2.5));
        assert!(g.contains(3));
        assert_eq!(g.len(), 1);
        g.clear();
        assert!(g.is_empty());
    }
}
