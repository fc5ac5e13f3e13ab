//! The electronic-structure collaborator seam.
//!
//! The pipeline never does SCF math itself; it drives an [`ScfSolver`]
//! implementation through this trait. A converged [`ScfSolution`] plus
//! the [`SolverContext`] it was produced from is everything the
//! post-processing kernels and the volumetric sampler need.

pub mod model;

use crate::core::models::molecule::Molecule;
use nalgebra::{DMatrix, DVector, Point3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("basis construction failed: {0}")]
    Build(String),

    #[error("SCF solve failed: {0}")]
    Scf(String),

    #[error("Hessian evaluation failed: {0}")]
    Hessian(String),

    #[error("geometry optimization failed: {0}")]
    Optimization(String),

    #[error("basis evaluation failed: {0}")]
    BasisEvaluation(String),
}

/// Electronic-structure settings attached to a submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub functional: String,
    pub basis: String,
    pub charge: i32,
    pub spin: u32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            functional: "b3lyp".to_string(),
            basis: "6-31g*".to_string(),
            charge: 0,
            spin: 0,
        }
    }
}

/// Termination policy for geometry relaxation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OptimizationPolicy {
    pub max_iterations: usize,
    /// Gradient-norm threshold in Hartree/Bohr.
    pub grad_tolerance: f64,
}

impl Default for OptimizationPolicy {
    fn default() -> Self {
        Self {
            max_iterations: 500,
            grad_tolerance: 1e-4,
        }
    }
}

/// The converged output of one SCF solve.
///
/// Energies are in Hartree, the dipole in Debye; orbital coefficients
/// are column-per-orbital over the atomic-orbital basis.
#[derive(Debug, Clone)]
pub struct ScfSolution {
    pub energy: f64,
    pub orbital_energies: DVector<f64>,
    pub occupations: DVector<f64>,
    pub orbital_coeffs: DMatrix<f64>,
    pub density_matrix: DMatrix<f64>,
    pub dipole_debye: Vector3<f64>,
    pub mulliken_charges: DVector<f64>,
}

/// Analytic second-derivative tensor shaped `(atom, coord, atom, coord)`,
/// in Hartree/Bohr².
#[derive(Debug, Clone)]
pub struct HessianTensor {
    num_atoms: usize,
    data: Vec<f64>,
}

impl HessianTensor {
    /// Wraps a flat `(3N)²`-element buffer laid out so that
    /// `data[(3i + a) * 3N + (3j + b)]` is the `(i, a, j, b)` entry.
    pub fn new(num_atoms: usize, data: Vec<f64>) -> Self {
        let n = 3 * num_atoms;
        assert_eq!(data.len(), n * n, "Hessian buffer must hold (3N)^2 entries");
        Self { num_atoms, data }
    }

    pub fn num_atoms(&self) -> usize {
        self.num_atoms
    }

    /// Reshapes the tensor to the symmetric 3N x 3N matrix.
    pub fn to_matrix(&self) -> DMatrix<f64> {
        let n = 3 * self.num_atoms;
        DMatrix::from_fn(n, n, |row, col| self.data[row * n + col])
    }
}

/// One optimizer iteration, reported synchronously on the worker thread.
///
/// Gradients and positions are flattened `3N` vectors in solver-native
/// units (Hartree/Bohr and Bohr).
#[derive(Debug, Clone, Copy)]
pub struct IterationSnapshot<'a> {
    pub iteration: usize,
    pub energy: f64,
    pub gradient: &'a [f64],
    pub positions_bohr: &'a [f64],
}

/// What the optimizer actually did, including its true termination
/// signal. `converged` is false when the iteration budget ran out
/// before the gradient threshold was met.
#[derive(Debug)]
pub struct RelaxationOutcome<C> {
    pub context: C,
    pub converged: bool,
    pub iterations: usize,
    pub final_grad_norm: f64,
}

/// Geometry and basis context produced by [`ScfSolver::build`].
///
/// The accessors expose exactly what the post-processing kernels need;
/// everything else about the context is opaque to the pipeline.
pub trait SolverContext: Send + Sync + 'static {
    fn num_atoms(&self) -> usize;
    /// Atomic positions in Bohr.
    fn positions_bohr(&self) -> &[Point3<f64>];
    /// Per-atom masses in amu, in atom order.
    fn masses_amu(&self) -> &[f64];
    /// Number of molecular orbitals available from a solve.
    fn num_orbitals(&self) -> usize;
}

/// The external electronic-structure engine.
///
/// All methods are CPU-bound and blocking; the pipeline runs them on a
/// worker pool, never on the cooperative scheduler.
pub trait ScfSolver: Send + Sync + 'static {
    type Context: SolverContext;

    /// Builds a solver context from a molecule and settings.
    fn build(&self, molecule: &Molecule, settings: &SolverSettings)
    -> Result<Self::Context, SolverError>;

    /// Runs a single-point SCF solve.
    fn solve(&self, context: &Self::Context, functional: &str)
    -> Result<ScfSolution, SolverError>;

    /// Computes the analytic second-derivative tensor.
    fn hessian(&self, context: &Self::Context) -> Result<HessianTensor, SolverError>;

    /// Evaluates every atomic-orbital basis function at each point,
    /// returning a `points x num_orbitals` matrix.
    fn evaluate_basis(
        &self,
        context: &Self::Context,
        points_bohr: &[Point3<f64>],
    ) -> Result<DMatrix<f64>, SolverError>;

    /// Relaxes the geometry, invoking `on_iteration` synchronously per
    /// optimizer step. The returned context reflects the final
    /// geometry; its internal solver state is not guaranteed to, so
    /// callers must re-solve before trusting energies or properties.
    fn optimize(
        &self,
        context: &Self::Context,
        policy: &OptimizationPolicy,
        on_iteration: &mut dyn FnMut(IterationSnapshot<'_>),
    ) -> Result<RelaxationOutcome<Self::Context>, SolverError>;
}
