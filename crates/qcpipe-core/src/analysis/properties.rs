//! Electronic properties derived from a converged SCF solution.

use crate::core::constants::HARTREE_TO_EV;
use crate::solver::ScfSolution;
use serde::Serialize;
use tracing::instrument;

/// Orbital-level summary of a converged solution. Energies are in eV;
/// the raw solver works in hartree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectronicProperties {
    pub orbital_energies_ev: Vec<f64>,
    pub homo_index: usize,
    pub lumo_index: usize,
    pub homo_lumo_gap_ev: f64,
    pub mulliken_charges: Vec<f64>,
    pub dipole_debye: [f64; 3],
    pub dipole_magnitude: f64,
}

/// Extracts frontier-orbital data, charges, and the dipole from a
/// solution.
///
/// The HOMO is the highest orbital with nonzero occupation and the LUMO
/// the lowest with zero occupation. For degenerate edge cases (no
/// occupied orbital, or a fully occupied set) the indices fall back to
/// the first and last orbital respectively, so the gap is always
/// defined.
#[instrument(skip_all, fields(num_orbitals = solution.orbital_energies.len()))]
pub fn extract(solution: &ScfSolution) -> ElectronicProperties {
    let energies_ev: Vec<f64> = solution
        .orbital_energies
        .iter()
        .map(|e| e * HARTREE_TO_EV)
        .collect();

    let occupations = &solution.occupations;
    let homo_index = (0..occupations.len())
        .rev()
        .find(|&i| occupations[i] > 0.0)
        .unwrap_or(0);
    let lumo_index = (0..occupations.len())
        .find(|&i| occupations[i] == 0.0)
        .unwrap_or(energies_ev.len().saturating_sub(1));

    let homo_lumo_gap_ev = energies_ev[lumo_index] - energies_ev[homo_index];

    let dipole = solution.dipole_debye;
    ElectronicProperties {
        orbital_energies_ev: energies_ev,
        homo_index,
        lumo_index,
        homo_lumo_gap_ev,
        mulliken_charges: solution.mulliken_charges.iter().copied().collect(),
        dipole_debye: [dipole.x, dipole.y, dipole.z],
        dipole_magnitude: dipole.norm(),
    }
}
