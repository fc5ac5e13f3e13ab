use crate::core::elements::{Element, element_by_symbol};
use nalgebra::Point3;

/// Represents a single atom of a molecular structure.
///
/// Positions are Cartesian coordinates in angstrom; the mass is carried
/// alongside the symbol because the frequency kernel needs per-atom
/// masses without re-resolving element data on every access.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Element symbol (e.g., "O", "H").
    pub symbol: String,
    /// Atomic number of the element.
    pub atomic_number: u8,
    /// Position in angstrom.
    pub position: Point3<f64>,
    /// Atomic mass in amu.
    pub mass_amu: f64,
}

impl Atom {
    /// Creates an atom from element data and a position in angstrom.
    pub fn new(element: &Element, position: Point3<f64>) -> Self {
        Self {
            symbol: element.symbol.to_string(),
            atomic_number: element.atomic_number,
            position,
            mass_amu: element.mass_amu,
        }
    }

    /// Creates an atom from an element symbol, resolving mass and
    /// atomic number from the element table. Returns `None` for an
    /// unknown symbol.
    pub fn from_symbol(symbol: &str, position: Point3<f64>) -> Option<Self> {
        element_by_symbol(symbol).map(|element| Self::new(element, position))
    }
}

/// A covalent bond between two atoms, by index into the atom list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bond {
    pub atom_i: usize,
    pub atom_j: usize,
    /// Bond order as stored in the input (4 denotes aromatic).
    pub order: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_symbol_resolves_element_data() {
        let atom = Atom::from_symbol("C", Point3::new(0.0, 0.0, 0.0)).unwrap();
        assert_eq!(atom.symbol, "C");
        assert_eq!(atom.atomic_number, 6);
        assert!((atom.mass_amu - 12.011).abs() < 1e-12);
    }

    #[test]
    fn from_symbol_rejects_unknown_element() {
        assert!(Atom::from_symbol("Qq", Point3::origin()).is_none());
    }
}
