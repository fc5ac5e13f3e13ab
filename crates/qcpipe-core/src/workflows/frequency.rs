//! Vibrational frequency stage.

use crate::analysis::frequencies::{self, FrequencyAnalysis};
use crate::analysis::properties::{self, ElectronicProperties};
use crate::core::models::molecule::Molecule;
use crate::engine::error::EngineError;
use crate::solver::{ScfSolution, ScfSolver, SolverContext, SolverSettings};
use tracing::{debug, instrument};

pub struct FrequencyStage<C> {
    pub context: C,
    pub solution: ScfSolution,
    pub properties: ElectronicProperties,
    pub analysis: FrequencyAnalysis,
}

/// Single-point solve followed by a Hessian evaluation and harmonic
/// analysis. The electronic properties of the underlying solve are
/// reported alongside the modes. Blocking; runs on the solver pool.
#[instrument(skip_all, fields(molecule = %molecule.name))]
pub fn run<S: ScfSolver>(
    solver: &S,
    molecule: &Molecule,
    settings: &SolverSettings,
) -> Result<FrequencyStage<S::Context>, EngineError> {
    let context = solver.build(molecule, settings)?;
    let solution = solver.solve(&context, &settings.functional)?;
    let properties = properties::extract(&solution);

    let hessian = solver.hessian(&context)?;
    let analysis = frequencies::analyze(&hessian, context.masses_amu());
    debug!(
        num_frequencies = analysis.num_frequencies,
        num_imaginary = analysis.num_imaginary,
        "frequency analysis finished"
    );

    Ok(FrequencyStage {
        context,
        solution,
        properties,
        analysis,
    })
}
