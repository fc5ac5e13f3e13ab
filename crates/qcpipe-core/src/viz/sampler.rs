//! On-demand scalar fields from cached solver state.
//!
//! Stateless over its inputs, so distinct calculations can be sampled
//! concurrently. The callers run this on the visualization pool, never
//! on the serialized solver pool.

use crate::core::constants::BOHR_TO_ANGSTROM;
use crate::engine::error::EngineError;
use crate::solver::{ScfSolution, ScfSolver, SolverContext};
use crate::viz::grid::{GridLayout, GridSpec, VolumetricGrid};
use nalgebra::Point3;
use tracing::instrument;

/// Samples one molecular orbital, `ψ_k(r) = Σ_i AO_i(r) · C_ik`, over
/// the molecule's padded bounding box.
#[instrument(skip_all, fields(orbital_index, resolution = spec.resolution))]
pub fn orbital_field<S: ScfSolver>(
    solver: &S,
    context: &S::Context,
    solution: &ScfSolution,
    orbital_index: usize,
    spec: &GridSpec,
) -> Result<VolumetricGrid, EngineError> {
    let num_orbitals = solution.orbital_coeffs.ncols();
    if orbital_index >= num_orbitals {
        return Err(EngineError::InvalidInput(format!(
            "orbital index {orbital_index} out of range (have {num_orbitals} orbitals)"
        )));
    }

    let layout = layout_for(context, spec);
    let basis = solver.evaluate_basis(context, &layout.points_bohr())?;
    let values = &basis * solution.orbital_coeffs.column(orbital_index);
    let field = values.iter().map(|v| *v as f32).collect();
    Ok(VolumetricGrid::new(&layout, field))
}

/// Samples the total electron density,
/// `ρ(r) = Σ_ij AO_i(r) · DM_ij · AO_j(r)`.
#[instrument(skip_all, fields(resolution = spec.resolution))]
pub fn density_field<S: ScfSolver>(
    solver: &S,
    context: &S::Context,
    solution: &ScfSolution,
    spec: &GridSpec,
) -> Result<VolumetricGrid, EngineError> {
    let layout = layout_for(context, spec);
    let basis = solver.evaluate_basis(context, &layout.points_bohr())?;

    // Contract one side first, then a per-point dot product.
    let half = &basis * &solution.density_matrix;
    let field = (0..basis.nrows())
        .map(|p| half.row(p).dot(&basis.row(p)) as f32)
        .collect();
    Ok(VolumetricGrid::new(&layout, field))
}

fn layout_for<C: SolverContext>(context: &C, spec: &GridSpec) -> GridLayout {
    let positions_angstrom: Vec<Point3<f64>> = context
        .positions_bohr()
        .iter()
        .map(|p| p * BOHR_TO_ANGSTROM)
        .collect();
    spec.layout(&positions_angstrom)
}
