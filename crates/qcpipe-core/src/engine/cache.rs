use crate::core::models::ids::CalculationId;
use crate::solver::ScfSolution;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Converged solver state retained for later visualization queries:
/// the geometry/basis context paired with the solution produced from
/// it.
pub struct CachedResult<C> {
    pub context: Arc<C>,
    pub solution: Arc<ScfSolution>,
}

impl<C> Clone for CachedResult<C> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            solution: Arc::clone(&self.solution),
        }
    }
}

/// Per-calculation store of solver handles, written once on pipeline
/// completion and read by the volumetric sampler.
///
/// Entries live until process teardown; there is no automatic eviction,
/// so a long-running embedder should call [`ResultCache::evict`] when a
/// calculation's visualizations are no longer needed.
pub struct ResultCache<C> {
    entries: RwLock<HashMap<CalculationId, CachedResult<C>>>,
}

impl<C> Default for ResultCache<C> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<C> ResultCache<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: CalculationId, context: C, solution: ScfSolution) {
        self.entries
            .write()
            .expect("result cache lock poisoned")
            .insert(
                id,
                CachedResult {
                    context: Arc::new(context),
                    solution: Arc::new(solution),
                },
            );
    }

    pub fn get(&self, id: CalculationId) -> Option<CachedResult<C>> {
        self.entries
            .read()
            .expect("result cache lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Drops the entry for a calculation. Returns whether one existed.
    pub fn evict(&self, id: CalculationId) -> bool {
        self.entries
            .write()
            .expect("result cache lock poisoned")
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("result cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{DMatrix, DVector, Vector3};

    fn dummy_solution() -> ScfSolution {
        ScfSolution {
            energy: -1.0,
            orbital_energies: DVector::zeros(2),
            occupations: DVector::zeros(2),
            orbital_coeffs: DMatrix::identity(2, 2),
            density_matrix: DMatrix::zeros(2, 2),
            dipole_debye: Vector3::zeros(),
            mulliken_charges: DVector::zeros(2),
        }
    }

    #[test]
    fn insert_then_get_returns_shared_handles() {
        let cache: ResultCache<u32> = ResultCache::new();
        let id = CalculationId::new();
        cache.insert(id, 7, dummy_solution());

        let entry = cache.get(id).unwrap();
        assert_eq!(*entry.context, 7);
        assert_eq!(entry.solution.energy, -1.0);
    }

    #[test]
    fn missing_entry_returns_none() {
        let cache: ResultCache<u32> = ResultCache::new();
        assert!(cache.get(CalculationId::new()).is_none());
    }

    #[test]
    fn evict_removes_the_entry() {
        let cache: ResultCache<u32> = ResultCache::new();
        let id = CalculationId::new();
        cache.insert(id, 1, dummy_solution());

        assert!(cache.evict(id));
        assert!(!cache.evict(id));
        assert!(cache.is_empty());
    }
}
