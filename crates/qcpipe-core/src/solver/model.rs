//! A self-contained model collaborator implementing the full
//! [`ScfSolver`] surface.
//!
//! One s-type Gaussian function per atom, a screened one-electron
//! Hamiltonian, and a pairwise spring potential for geometry work. The
//! numbers are not chemistry-grade; the point is a deterministic,
//! dependency-free engine that exercises every pipeline path, for tests
//! and for the bundled CLI.

use super::{
    HessianTensor, IterationSnapshot, OptimizationPolicy, RelaxationOutcome, ScfSolution,
    ScfSolver, SolverContext, SolverError, SolverSettings,
};
use crate::core::constants::BOHR_TO_ANGSTROM;
use crate::core::models::molecule::Molecule;
use nalgebra::{DMatrix, DVector, Point3, Vector3};

/// Debye per elementary charge times angstrom.
const DEBYE_PER_E_ANGSTROM: f64 = 4.80320425;

/// Off-diagonal coupling strength in Hartree.
const COUPLING: f64 = 0.2;

/// Spring constant of the pair potential in Hartree/Bohr².
const SPRING_K: f64 = 0.1;

/// Finite-difference step in Bohr.
const FD_STEP: f64 = 1e-3;

#[derive(Debug, Clone, Copy, Default)]
pub struct ModelSolver;

#[derive(Debug, Clone)]
pub struct ModelContext {
    positions_bohr: Vec<Point3<f64>>,
    masses_amu: Vec<f64>,
    atomic_numbers: Vec<u8>,
    charge: i32,
}

impl SolverContext for ModelContext {
    fn num_atoms(&self) -> usize {
        self.positions_bohr.len()
    }

    fn positions_bohr(&self) -> &[Point3<f64>] {
        &self.positions_bohr
    }

    fn masses_amu(&self) -> &[f64] {
        &self.masses_amu
    }

    fn num_orbitals(&self) -> usize {
        self.positions_bohr.len()
    }
}

impl ModelContext {
    fn with_positions(&self, positions_bohr: Vec<Point3<f64>>) -> Self {
        Self {
            positions_bohr,
            masses_amu: self.masses_amu.clone(),
            atomic_numbers: self.atomic_numbers.clone(),
            charge: self.charge,
        }
    }

    fn electron_count(&self) -> i64 {
        let nuclear: i64 = self.atomic_numbers.iter().map(|&z| z as i64).sum();
        nuclear - self.charge as i64
    }

    /// Equilibrium separation of the pair potential, loosely scaling
    /// with element size.
    fn rest_length(&self, i: usize, j: usize) -> f64 {
        let zi = self.atomic_numbers[i] as f64;
        let zj = self.atomic_numbers[j] as f64;
        1.5 + 0.4 * (zi.cbrt() + zj.cbrt())
    }

    /// Total pair-spring energy of an arbitrary geometry, in Hartree.
    fn pair_energy(&self, positions: &[Point3<f64>]) -> f64 {
        let n = positions.len();
        let mut energy = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let r = (positions[i] - positions[j]).norm();
                let d = r - self.rest_length(i, j);
                energy += 0.5 * SPRING_K * d * d;
            }
        }
        energy
    }

    /// Central-difference gradient of the pair energy, flattened 3N.
    fn pair_gradient(&self, positions: &[Point3<f64>]) -> Vec<f64> {
        let mut grad = vec![0.0; 3 * positions.len()];
        let mut work = positions.to_vec();
        for (k, g) in grad.iter_mut().enumerate() {
            let (atom, axis) = (k / 3, k % 3);
            let original = work[atom][axis];
            work[atom][axis] = original + FD_STEP;
            let plus = self.pair_energy(&work);
            work[atom][axis] = original - FD_STEP;
            let minus = self.pair_energy(&work);
            work[atom][axis] = original;
            *g = (plus - minus) / (2.0 * FD_STEP);
        }
        grad
    }
}

impl ScfSolver for ModelSolver {
    type Context = ModelContext;

    fn build(
        &self,
        molecule: &Molecule,
        settings: &SolverSettings,
    ) -> Result<Self::Context, SolverError> {
        if molecule.num_atoms() == 0 {
            return Err(SolverError::Build("molecule has no atoms".to_string()));
        }

        let positions_bohr = molecule
            .atoms()
            .iter()
            .map(|a| a.position / BOHR_TO_ANGSTROM)
            .collect();

        let context = ModelContext {
            positions_bohr,
            masses_amu: molecule.masses_amu(),
            atomic_numbers: molecule.atoms().iter().map(|a| a.atomic_number).collect(),
            charge: settings.charge,
        };

        if context.electron_count() < 0 {
            return Err(SolverError::Build(format!(
                "charge {} exceeds the nuclear charge",
                settings.charge
            )));
        }
        Ok(context)
    }

    fn solve(&self, context: &Self::Context, _functional: &str) -> Result<ScfSolution, SolverError> {
        let n = context.num_orbitals();
        let positions = context.positions_bohr();

        let mut hamiltonian = DMatrix::zeros(n, n);
        for i in 0..n {
            hamiltonian[(i, i)] = -0.5 * context.atomic_numbers[i] as f64;
            for j in (i + 1)..n {
                let r = (positions[i] - positions[j]).norm();
                if r < 1e-6 {
                    return Err(SolverError::Scf(format!(
                        "atoms {i} and {j} are coincident"
                    )));
                }
                let coupling = -COUPLING * (-r / 2.0).exp();
                hamiltonian[(i, j)] = coupling;
                hamiltonian[(j, i)] = coupling;
            }
        }

        let eigen = hamiltonian.symmetric_eigen();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| {
            eigen.eigenvalues[a]
                .partial_cmp(&eigen.eigenvalues[b])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let orbital_energies = DVector::from_fn(n, |k, _| eigen.eigenvalues[order[k]]);
        let orbital_coeffs =
            DMatrix::from_fn(n, n, |row, col| eigen.eigenvectors[(row, order[col])]);

        // Aufbau filling, two electrons per orbital.
        let mut remaining = context.electron_count();
        let occupations = DVector::from_fn(n, |_, _| {
            let filled = remaining.min(2).max(0);
            remaining -= filled;
            filled as f64
        });

        let mut density_matrix = DMatrix::zeros(n, n);
        for k in 0..n {
            if occupations[k] > 0.0 {
                let column = orbital_coeffs.column(k).clone_owned();
                density_matrix += (&column * column.transpose()) * occupations[k];
            }
        }

        let mulliken_charges =
            DVector::from_fn(n, |i, _| context.atomic_numbers[i] as f64 - density_matrix[(i, i)]);

        let mut dipole_debye = Vector3::zeros();
        for i in 0..n {
            let pos_ang = positions[i] * BOHR_TO_ANGSTROM;
            dipole_debye += DEBYE_PER_E_ANGSTROM * mulliken_charges[i] * pos_ang.coords;
        }

        let electronic: f64 = (0..n).map(|k| occupations[k] * orbital_energies[k]).sum();
        let mut repulsion = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                let r = (positions[i] - positions[j]).norm();
                repulsion += context.atomic_numbers[i] as f64 * context.atomic_numbers[j] as f64
                    / r.max(1e-6)
                    * 0.1;
            }
        }

        Ok(ScfSolution {
            energy: electronic + repulsion,
            orbital_energies,
            occupations,
            orbital_coeffs,
            density_matrix,
            dipole_debye,
            mulliken_charges,
        })
    }

    fn hessian(&self, context: &Self::Context) -> Result<HessianTensor, SolverError> {
        let natoms = context.num_atoms();
        let n = 3 * natoms;
        let mut work = context.positions_bohr().to_vec();
        let mut data = vec![0.0; n * n];

        // Central second differences of the pair energy.
        for a in 0..n {
            for b in a..n {
                let (ai, ax) = (a / 3, a % 3);
                let (bi, bx) = (b / 3, b % 3);
                let orig_a = work[ai][ax];
                let orig_b = work[bi][bx];

                let mut displaced = |da: f64, db: f64| {
                    work[ai][ax] = orig_a + da;
                    work[bi][bx] += db;
                    let e = context.pair_energy(&work);
                    work[ai][ax] = orig_a;
                    work[bi][bx] = orig_b;
                    e
                };

                let pp = displaced(FD_STEP, FD_STEP);
                let pm = displaced(FD_STEP, -FD_STEP);
                let mp = displaced(-FD_STEP, FD_STEP);
                let mm = displaced(-FD_STEP, -FD_STEP);
                let value = (pp - pm - mp + mm) / (4.0 * FD_STEP * FD_STEP);

                data[a * n + b] = value;
                data[b * n + a] = value;
            }
        }

        Ok(HessianTensor::new(natoms, data))
    }

    fn evaluate_basis(
        &self,
        context: &Self::Context,
        points_bohr: &[Point3<f64>],
    ) -> Result<DMatrix<f64>, SolverError> {
        let nao = context.num_orbitals();
        let centers = context.positions_bohr();
        Ok(DMatrix::from_fn(points_bohr.len(), nao, |p, i| {
            let alpha = 0.3 + 0.05 * context.atomic_numbers[i] as f64;
            let r2 = (points_bohr[p] - centers[i]).norm_squared();
            (-alpha * r2).exp()
        }))
    }

    fn optimize(
        &self,
        context: &Self::Context,
        policy: &OptimizationPolicy,
        on_iteration: &mut dyn FnMut(IterationSnapshot<'_>),
    ) -> Result<RelaxationOutcome<Self::Context>, SolverError> {
        if policy.max_iterations == 0 {
            return Err(SolverError::Optimization(
                "max_iterations must be positive".to_string(),
            ));
        }

        const STEP_SIZE: f64 = 1.0;

        let mut positions = context.positions_bohr().to_vec();
        let mut converged = false;
        let mut iterations = 0;
        let mut grad_norm = 0.0;

        for iteration in 1..=policy.max_iterations {
            let gradient = context.pair_gradient(&positions);
            grad_norm = gradient.iter().map(|g| g * g).sum::<f64>().sqrt();
            iterations = iteration;

            let flat: Vec<f64> = positions
                .iter()
                .flat_map(|p| [p.x, p.y, p.z])
                .collect();
            on_iteration(IterationSnapshot {
                iteration,
                energy: context.pair_energy(&positions),
                gradient: &gradient,
                positions_bohr: &flat,
            });

            if grad_norm < policy.grad_tolerance {
                converged = true;
                break;
            }

            for (k, g) in gradient.iter().enumerate() {
                positions[k / 3][k % 3] -= STEP_SIZE * g;
            }
        }

        Ok(RelaxationOutcome {
            context: context.with_positions(positions),
            converged,
            iterations,
            final_grad_norm: grad_norm,
        })
    }
}
