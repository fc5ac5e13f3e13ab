use crate::core::models::ids::{CalculationId, MoleculeId};
use crate::solver::SolverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("molecule not found: {0}")]
    MoleculeNotFound(MoleculeId),

    #[error("calculation not found: {0}")]
    CalculationNotFound(CalculationId),

    #[error("no solver result cached for calculation {0}")]
    ResultNotCached(CalculationId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error("worker pool failure: {0}")]
    Pool(String),
}

impl EngineError {
    /// Whether the error denotes a missing molecule, calculation, or
    /// cached result rather than a failure of the work itself.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MoleculeNotFound(_) | Self::CalculationNotFound(_) | Self::ResultNotCached(_)
        )
    }
}
