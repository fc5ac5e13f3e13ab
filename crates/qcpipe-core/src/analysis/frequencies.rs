//! Harmonic vibrational analysis of a nuclear Hessian.

use crate::core::constants::{AMU_TO_KG, BOHR_TO_METER, HARTREE_TO_JOULE, SPEED_OF_LIGHT_CM_S};
use crate::solver::HessianTensor;
use nalgebra::DMatrix;
use serde::Serialize;
use std::f64::consts::PI;
use tracing::instrument;

/// Converts mass-weighted Hessian eigenvalues from hartree/(bohr^2 amu)
/// to angular frequency squared in SI (s^-2).
const EIGENVALUE_TO_SI: f64 = HARTREE_TO_JOULE / (BOHR_TO_METER * BOHR_TO_METER * AMU_TO_KG);

/// All 3N harmonic modes of a structure, in ascending frequency order.
/// Imaginary modes are reported as negative wavenumbers.
#[derive(Debug, Clone, Serialize)]
pub struct FrequencyAnalysis {
    /// Wavenumbers in cm^-1, ascending. Rigid-body translations and
    /// rotations appear as near-zero entries; they are not projected
    /// out.
    pub frequencies_cm1: Vec<f64>,
    pub num_frequencies: usize,
    pub num_imaginary: usize,
    /// Cartesian displacement vectors, one per frequency, each of
    /// length 3N and normalized.
    pub normal_modes: Vec<Vec<f64>>,
}

/// Diagonalizes the mass-weighted Hessian and converts eigenvalues to
/// wavenumbers.
///
/// A negative eigenvalue means the geometry sits at a saddle point
/// along that mode; its wavenumber is reported with a negative sign so
/// callers can count imaginary modes directly.
#[instrument(skip_all, fields(num_atoms = hessian.num_atoms()))]
pub fn analyze(hessian: &HessianTensor, masses_amu: &[f64]) -> FrequencyAnalysis {
    let num_atoms = hessian.num_atoms();
    debug_assert_eq!(masses_amu.len(), num_atoms);
    let dim = 3 * num_atoms;

    let cartesian = hessian.to_matrix();
    let mut weighted = DMatrix::zeros(dim, dim);
    for i in 0..dim {
        for j in 0..dim {
            let weight = (masses_amu[i / 3] * masses_amu[j / 3]).sqrt();
            weighted[(i, j)] = cartesian[(i, j)] / weight;
        }
    }

    let eigen = weighted.symmetric_eigen();

    // Eigenpairs come back unordered; sort them ascending by eigenvalue.
    let mut order: Vec<usize> = (0..dim).collect();
    order.sort_by(|&a, &b| {
        eigen.eigenvalues[a]
            .partial_cmp(&eigen.eigenvalues[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut frequencies_cm1 = Vec::with_capacity(dim);
    let mut normal_modes = Vec::with_capacity(dim);
    for &k in &order {
        let eigenvalue = eigen.eigenvalues[k];
        let omega = (eigenvalue.abs() * EIGENVALUE_TO_SI).sqrt();
        let wavenumber = eigenvalue.signum() * omega / (2.0 * PI * SPEED_OF_LIGHT_CM_S);
        frequencies_cm1.push(wavenumber);

        // Back to Cartesian displacements, then renormalize.
        let column = eigen.eigenvectors.column(k);
        let mut mode: Vec<f64> = (0..dim)
            .map(|i| column[i] / masses_amu[i / 3].sqrt())
            .collect();
        let norm = mode.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm >= 1e-10 {
            for x in &mut mode {
                *x /= norm;
            }
        }
        normal_modes.push(mode);
    }

    let num_imaginary = frequencies_cm1.iter().filter(|f| **f < 0.0).count();
    FrequencyAnalysis {
        frequencies_cm1,
        num_frequencies: dim,
        num_imaginary,
        normal_modes,
    }
}
