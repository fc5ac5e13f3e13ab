//! Single-point energy stage.

use crate::analysis::properties::{self, ElectronicProperties};
use crate::core::models::molecule::Molecule;
use crate::engine::error::EngineError;
use crate::solver::{ScfSolution, ScfSolver, SolverSettings};
use tracing::{debug, instrument};

#[derive(Debug)]
pub struct EnergyStage<C> {
    pub context: C,
    pub solution: ScfSolution,
    pub properties: ElectronicProperties,
}

/// Builds a solver context, runs one SCF solve, and extracts electronic
/// properties. Blocking; runs on the solver pool.
#[instrument(skip_all, fields(molecule = %molecule.name))]
pub fn run<S: ScfSolver>(
    solver: &S,
    molecule: &Molecule,
    settings: &SolverSettings,
) -> Result<EnergyStage<S::Context>, EngineError> {
    let context = solver.build(molecule, settings)?;
    let solution = solver.solve(&context, &settings.functional)?;
    debug!(energy = solution.energy, "SCF solve finished");

    let properties = properties::extract(&solution);
    Ok(EnergyStage {
        context,
        solution,
        properties,
    })
}
