use crate::core::constants::GEO_TOLERANCE;
use crate::core::linalg::ComplexMatrix;
use nalgebra::Vector3;
use std::collections::HashMap;

/// Lattice-sum propagators between two sub-lattices separated by `d`.
#[derive(Debug, Clone)]
pub struct PropagatorPair {
    /// Waves from the sub-lattice at `r` arriving at the one at `r + d`.
    pub forward: ComplexMatrix,
    /// Waves from `r + d` arriving at `r`.
    pub backward: ComplexMatrix,
}

type DisplacementKey = (usize, [i64; 3]);

/// Inter-sub-lattice propagators keyed by angular cutoff and displacement.
///
/// Displacements are compared on a grid of [`GEO_TOLERANCE`]. A cache is only
/// valid for one energy and one Bloch vector.
#[derive(Debug, Default, Clone)]
pub struct PropagatorCache {
    data: HashMap<DisplacementKey, PropagatorPair>,
}

impl PropagatorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, l_max: usize, displacement: &Vector3<f64>, pair: PropagatorPair) {
        self.data.insert(Self::key(l_max, displacement), pair);
    }

    pub fn get(&self, l_max: usize, displacement: &Vector3<f64>) -> Option<&PropagatorPair> {
        self.data.get(&Self::key(l_max, displacement))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn key(l_max: usize, displacement: &Vector3<f64>) -> DisplacementKey {
        let q = |x: f64| (x / GEO_TOLERANCE).round() as i64;
        (l_max, [q(displacement.x), q(displacement.y), q(displacement.z)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(value: f64) -> PropagatorPair {
        let m = ComplexMatrix::identity(2).scale(num_complex::Complex64::new(value, 0.0));
        PropagatorPair {
            forward: m.clone(),
            backward: m,
        }
    }

    #[test]
    fn lookup_tolerates_round_off() {
        let mut cache = PropagatorCache::new();
        cache.insert(2, &Vector3::new(1.0, 2.0, 0.5), pair(3.0));

        let hit = cache.get(2, &Vector3::new(1.0 + 1e-6, 2.0 - 1e-6, 0.5));
        assert_eq!(hit.unwrap().forward[(0, 0)].re, 3.0);
        assert!(cache.get(2, &Vector3::new(1.01, 2.0, 0.5)).is_none());
    }

    #[test]
    fn entries_are_separated_by_cutoff() {
        let mut cache = PropagatorCache::new();
        let d = Vector3::new(0.0, 1.0, 0.0);
        cache.insert(2, &d, pair(1.0));
        assert!(cache.get(3, &d).is_none());
        cache.insert(3, &d, pair(2.0));
        assert_eq!(cache.len(), 2);
    }
}
