//! Geometry optimization stage.

use crate::analysis::properties::{self, ElectronicProperties};
use crate::core::constants::BOHR_TO_ANGSTROM;
use crate::core::models::molecule::Molecule;
use crate::engine::error::EngineError;
use crate::engine::progress::ProgressEvent;
use crate::solver::{
    OptimizationPolicy, ScfSolution, ScfSolver, SolverContext, SolverSettings,
};
use tracing::{debug, instrument};

pub struct OptimizeStage<C> {
    pub context: C,
    pub solution: ScfSolution,
    pub properties: ElectronicProperties,
    pub converged: bool,
    pub iterations: usize,
    pub final_grad_norm: f64,
    /// Relaxed geometry in angstrom, flattened `[x0, y0, z0, ...]`.
    pub positions_angstrom: Vec<f64>,
}

/// Relaxes the geometry, emitting one `Progress` event per optimizer
/// iteration, then re-solves at the final geometry.
///
/// The re-solve is mandatory: the optimizer's returned context carries
/// the relaxed positions but not necessarily a matching electronic
/// state, so the trustworthy energy and properties come from a fresh
/// solve. Blocking; runs on the solver pool.
#[instrument(skip_all, fields(molecule = %molecule.name, max_iterations = policy.max_iterations))]
pub fn run<S: ScfSolver>(
    solver: &S,
    molecule: &Molecule,
    settings: &SolverSettings,
    policy: &OptimizationPolicy,
    emit: &mut dyn FnMut(ProgressEvent),
) -> Result<OptimizeStage<S::Context>, EngineError> {
    let context = solver.build(molecule, settings)?;

    let outcome = solver.optimize(&context, policy, &mut |snapshot| {
        let grad_norm = snapshot.gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
        emit(ProgressEvent::Progress {
            iteration: snapshot.iteration,
            energy: snapshot.energy,
            grad_norm,
            positions: to_angstrom(snapshot.positions_bohr),
        });
    })?;
    debug!(
        converged = outcome.converged,
        iterations = outcome.iterations,
        final_grad_norm = outcome.final_grad_norm,
        "optimizer returned"
    );

    let solution = solver.solve(&outcome.context, &settings.functional)?;
    let properties = properties::extract(&solution);

    let positions_angstrom: Vec<f64> = outcome
        .context
        .positions_bohr()
        .iter()
        .flat_map(|p| [p.x, p.y, p.z])
        .map(|x| x * BOHR_TO_ANGSTROM)
        .collect();

    Ok(OptimizeStage {
        context: outcome.context,
        solution,
        properties,
        converged: outcome.converged,
        iterations: outcome.iterations,
        final_grad_norm: outcome.final_grad_norm,
        positions_angstrom,
    })
}

fn to_angstrom(positions_bohr: &[f64]) -> Vec<f64> {
    positions_bohr.iter().map(|x| x * BOHR_TO_ANGSTROM).collect()
}
