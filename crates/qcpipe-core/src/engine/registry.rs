use crate::analysis::frequencies::FrequencyAnalysis;
use crate::analysis::properties::ElectronicProperties;
use crate::core::models::ids::{CalculationId, MoleculeId};
use crate::engine::error::EngineError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationMethod {
    Energy,
    Optimize,
    Frequency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CalculationStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl CalculationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// The lifecycle is strictly monotonic: PENDING → RUNNING →
    /// {COMPLETED, FAILED}. Terminal states admit no successor and
    /// RUNNING is never skipped.
    fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

/// The authoritative record of one calculation.
///
/// `error` is set only on FAILED and result fields only on COMPLETED;
/// the two never coexist. Once a record is terminal it is immutable.
#[derive(Debug, Clone, Serialize)]
pub struct CalculationRecord {
    pub id: CalculationId,
    pub molecule_id: MoleculeId,
    pub method: CalculationMethod,
    pub status: CalculationStatus,
    pub energy: Option<f64>,
    pub properties: Option<ElectronicProperties>,
    pub frequencies: Option<FrequencyAnalysis>,
    pub converged: Option<bool>,
    pub iterations: Option<usize>,
    pub final_grad_norm: Option<f64>,
    /// Final geometry in angstrom, flattened `[x0, y0, z0, ...]`.
    pub optimized_positions: Option<Vec<f64>>,
    pub error: Option<String>,
}

impl CalculationRecord {
    fn new(id: CalculationId, molecule_id: MoleculeId, method: CalculationMethod) -> Self {
        Self {
            id,
            molecule_id,
            method,
            status: CalculationStatus::Pending,
            energy: None,
            properties: None,
            frequencies: None,
            converged: None,
            iterations: None,
            final_grad_norm: None,
            optimized_positions: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self) {
        self.status = CalculationStatus::Running;
    }

    pub fn mark_completed(&mut self) {
        self.status = CalculationStatus::Completed;
    }

    pub fn mark_failed(&mut self, message: impl Into<String>) {
        self.status = CalculationStatus::Failed;
        self.error = Some(message.into());
    }
}

/// Process-wide calculation state store.
///
/// Writes for a given id originate from the single worker processing
/// that calculation; reads may happen concurrently from anywhere.
/// Updates replace the whole record under the lock so a reader never
/// observes a torn update.
#[derive(Debug, Default)]
pub struct CalculationRegistry {
    records: RwLock<HashMap<CalculationId, CalculationRecord>>,
}

impl CalculationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new PENDING record. Ids are single-use: a duplicate id
    /// is rejected.
    pub fn create(
        &self,
        id: CalculationId,
        molecule_id: MoleculeId,
        method: CalculationMethod,
    ) -> Result<CalculationRecord, EngineError> {
        let mut records = self.records.write().expect("registry lock poisoned");
        if records.contains_key(&id) {
            return Err(EngineError::InvalidInput(format!(
                "calculation id already exists: {id}"
            )));
        }
        let record = CalculationRecord::new(id, molecule_id, method);
        records.insert(id, record.clone());
        Ok(record)
    }

    /// Returns a snapshot of the record, if present.
    pub fn get(&self, id: CalculationId) -> Option<CalculationRecord> {
        self.records
            .read()
            .expect("registry lock poisoned")
            .get(&id)
            .cloned()
    }

    /// Applies `mutate` to a copy of the stored record and swaps the
    /// merged copy back in. A no-op for unknown ids, for terminal
    /// records, and for mutations that would move the status backward.
    pub fn update(&self, id: CalculationId, mutate: impl FnOnce(&mut CalculationRecord)) {
        let mut records = self.records.write().expect("registry lock poisoned");
        let Some(existing) = records.get(&id) else {
            return;
        };
        if existing.status.is_terminal() {
            warn!(%id, "ignoring update to terminal calculation");
            return;
        }

        let mut next = existing.clone();
        mutate(&mut next);

        if next.status == existing.status || existing.status.can_advance_to(next.status) {
            records.insert(id, next);
        } else {
            warn!(
                %id,
                from = ?existing.status,
                to = ?next.status,
                "ignoring non-monotonic status transition"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with_record() -> (CalculationRegistry, CalculationId) {
        let registry = CalculationRegistry::new();
        let id = CalculationId::new();
        registry
            .create(id, MoleculeId::new(), CalculationMethod::Energy)
            .unwrap();
        (registry, id)
    }

    #[test]
    fn create_starts_pending_and_empty() {
        let (registry, id) = registry_with_record();
        let record = registry.get(id).unwrap();
        assert_eq!(record.status, CalculationStatus::Pending);
        assert!(record.energy.is_none());
        assert!(record.error.is_none());
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let (registry, id) = registry_with_record();
        let err = registry
            .create(id, MoleculeId::new(), CalculationMethod::Energy)
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
    }

    #[test]
    fn get_unknown_id_returns_none() {
        let registry = CalculationRegistry::new();
        assert!(registry.get(CalculationId::new()).is_none());
    }

    #[test]
    fn update_unknown_id_is_a_no_op() {
        let registry = CalculationRegistry::new();
        registry.update(CalculationId::new(), |r| r.mark_running());
    }

    #[test]
    fn lifecycle_advances_through_running_to_completed() {
        let (registry, id) = registry_with_record();
        registry.update(id, |r| r.mark_running());
        assert_eq!(registry.get(id).unwrap().status, CalculationStatus::Running);

        registry.update(id, |r| {
            r.energy = Some(-75.3);
            r.mark_completed();
        });
        let record = registry.get(id).unwrap();
        assert_eq!(record.status, CalculationStatus::Completed);
        assert_eq!(record.energy, Some(-75.3));
    }

    #[test]
    fn running_cannot_be_skipped() {
        let (registry, id) = registry_with_record();
        registry.update(id, |r| r.mark_completed());
        assert_eq!(registry.get(id).unwrap().status, CalculationStatus::Pending);
    }

    #[test]
    fn terminal_records_are_immutable() {
        let (registry, id) = registry_with_record();
        registry.update(id, |r| r.mark_running());
        registry.update(id, |r| r.mark_failed("solver exploded"));

        registry.update(id, |r| {
            r.energy = Some(1.0);
            r.mark_completed();
        });

        let record = registry.get(id).unwrap();
        assert_eq!(record.status, CalculationStatus::Failed);
        assert_eq!(record.error.as_deref(), Some("solver exploded"));
        assert!(record.energy.is_none());
    }

    #[test]
    fn failed_record_never_carries_results() {
        let (registry, id) = registry_with_record();
        registry.update(id, |r| r.mark_running());
        registry.update(id, |r| r.mark_failed("boom"));

        let record = registry.get(id).unwrap();
        assert!(record.error.is_some());
        assert!(record.energy.is_none());
        assert!(record.properties.is_none());
        assert!(record.frequencies.is_none());
    }
}
