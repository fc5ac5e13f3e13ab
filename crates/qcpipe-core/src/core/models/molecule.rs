use super::atom::{Atom, Bond};
use nalgebra::Point3;

/// An immutable molecular structure: atoms with positions in angstrom
/// and optional connectivity.
///
/// The pipeline never mutates a stored molecule; geometry changes
/// produced by optimization are reported as flattened coordinate
/// vectors alongside the calculation result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Molecule {
    pub name: String,
    pub comment: String,
    atoms: Vec<Atom>,
    bonds: Vec<Bond>,
}

impl Molecule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_atom(&mut self, atom: Atom) {
        self.atoms.push(atom);
    }

    pub fn add_bond(&mut self, bond: Bond) {
        self.bonds.push(bond);
    }

    pub fn num_atoms(&self) -> usize {
        self.atoms.len()
    }

    pub fn num_bonds(&self) -> usize {
        self.bonds.len()
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    /// Per-atom positions in angstrom.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.atoms.iter().map(|a| a.position).collect()
    }

    /// Positions flattened to `[x0, y0, z0, x1, ...]` in angstrom.
    pub fn positions_flat(&self) -> Vec<f64> {
        self.atoms
            .iter()
            .flat_map(|a| [a.position.x, a.position.y, a.position.z])
            .collect()
    }

    /// Per-atom masses in amu, in atom order.
    pub fn masses_amu(&self) -> Vec<f64> {
        self.atoms.iter().map(|a| a.mass_amu).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water() -> Molecule {
        let mut mol = Molecule::new("water");
        mol.add_atom(Atom::from_symbol("O", Point3::new(0.0, 0.0, 0.117)).unwrap());
        mol.add_atom(Atom::from_symbol("H", Point3::new(0.0, 0.757, -0.467)).unwrap());
        mol.add_atom(Atom::from_symbol("H", Point3::new(0.0, -0.757, -0.467)).unwrap());
        mol
    }

    #[test]
    fn positions_flat_is_row_major_per_atom() {
        let mol = water();
        let flat = mol.positions_flat();
        assert_eq!(flat.len(), 9);
        assert_eq!(flat[2], 0.117);
        assert_eq!(flat[4], 0.757);
    }

    #[test]
    fn masses_follow_atom_order() {
        let masses = water().masses_amu();
        assert!((masses[0] - 15.999).abs() < 1e-12);
        assert!((masses[1] - 1.008).abs() < 1e-12);
    }
}
