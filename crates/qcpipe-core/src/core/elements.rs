//! Static element data for the elements the pipeline accepts (H–Xe).
//!
//! Masses are in unified atomic mass units and feed directly into the
//! mass-weighting of the Hessian, so they must stay consistent with the
//! constants in [`super::constants`].

/// Properties of a chemical element relevant to the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Element {
    /// Atomic number (nuclear charge).
    pub atomic_number: u8,
    /// Standard one- or two-letter symbol.
    pub symbol: &'static str,
    /// English element name.
    pub name: &'static str,
    /// Standard atomic weight in amu.
    pub mass_amu: f64,
}

macro_rules! element {
    ($z:expr, $sym:expr, $name:expr, $mass:expr) => {
        Element {
            atomic_number: $z,
            symbol: $sym,
            name: $name,
            mass_amu: $mass,
        }
    };
}

static ELEMENTS: phf::Map<&'static str, Element> = phf::phf_map! {
    "H"  => element!(1,  "H",  "Hydrogen",   1.008),
    "He" => element!(2,  "He", "Helium",     4.003),
    "Li" => element!(3,  "Li", "Lithium",    6.941),
    "Be" => element!(4,  "Be", "Beryllium",  9.012),
    "B"  => element!(5,  "B",  "Boron",      10.811),
    "C"  => element!(6,  "C",  "Carbon",     12.011),
    "N"  => element!(7,  "N",  "Nitrogen",   14.007),
    "O"  => element!(8,  "O",  "Oxygen",     15.999),
    "F"  => element!(9,  "F",  "Fluorine",   18.998),
    "Ne" => element!(10, "Ne", "Neon",       20.180),
    "Na" => element!(11, "Na", "Sodium",     22.990),
    "Mg" => element!(12, "Mg", "Magnesium",  24.305),
    "Al" => element!(13, "Al", "Aluminum",   26.982),
    "Si" => element!(14, "Si", "Silicon",    28.086),
    "P"  => element!(15, "P",  "Phosphorus", 30.974),
    "S"  => element!(16, "S",  "Sulfur",     32.065),
    "Cl" => element!(17, "Cl", "Chlorine",   35.453),
    "Ar" => element!(18, "Ar", "Argon",      39.948),
    "K"  => element!(19, "K",  "Potassium",  39.098),
    "Ca" => element!(20, "Ca", "Calcium",    40.078),
    "Sc" => element!(21, "Sc", "Scandium",   44.956),
    "Ti" => element!(22, "Ti", "Titanium",   47.867),
    "V"  => element!(23, "V",  "Vanadium",   50.942),
    "Cr" => element!(24, "Cr", "Chromium",   51.996),
    "Mn" => element!(25, "Mn", "Manganese",  54.938),
    "Fe" => element!(26, "Fe", "Iron",       55.845),
    "Co" => element!(27, "Co", "Cobalt",     58.933),
    "Ni" => element!(28, "Ni", "Nickel",     58.693),
    "Cu" => element!(29, "Cu", "Copper",     63.546),
    "Zn" => element!(30, "Zn", "Zinc",       65.380),
    "Ga" => element!(31, "Ga", "Gallium",    69.723),
    "Ge" => element!(32, "Ge", "Germanium",  72.640),
    "As" => element!(33, "As", "Arsenic",    74.922),
    "Se" => element!(34, "Se", "Selenium",   78.960),
    "Br" => element!(35, "Br", "Bromine",    79.904),
    "Kr" => element!(36, "Kr", "Krypton",    83.798),
    "Rb" => element!(37, "Rb", "Rubidium",   85.468),
    "Sr" => element!(38, "Sr", "Strontium",  87.620),
    "Y"  => element!(39, "Y",  "Yttrium",    88.906),
    "Zr" => element!(40, "Zr", "Zirconium",  91.224),
    "Nb" => element!(41, "Nb", "Niobium",    92.906),
    "Mo" => element!(42, "Mo", "Molybdenum", 95.960),
    "Tc" => element!(43, "Tc", "Technetium", 98.000),
    "Ru" => element!(44, "Ru", "Ruthenium",  101.070),
    "Rh" => element!(45, "Rh", "Rhodium",    102.906),
    "Pd" => element!(46, "Pd", "Palladium",  106.420),
    "Ag" => element!(47, "Ag", "Silver",     107.868),
    "Cd" => element!(48, "Cd", "Cadmium",    112.411),
    "In" => element!(49, "In", "Indium",     114.818),
    "Sn" => element!(50, "Sn", "Tin",        118.710),
    "Sb" => element!(51, "Sb", "Antimony",   121.760),
    "Te" => element!(52, "Te", "Tellurium",  127.600),
    "I"  => element!(53, "I",  "Iodine",     126.905),
    "Xe" => element!(54, "Xe", "Xenon",      131.293),
};

/// Looks up an element by its case-sensitive symbol.
pub fn element_by_symbol(symbol: &str) -> Option<&'static Element> {
    ELEMENTS.get(symbol)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_common_elements() {
        let oxygen = element_by_symbol("O").unwrap();
        assert_eq!(oxygen.atomic_number, 8);
        assert_eq!(oxygen.name, "Oxygen");
        assert!((oxygen.mass_amu - 15.999).abs() < 1e-12);

        let hydrogen = element_by_symbol("H").unwrap();
        assert_eq!(hydrogen.atomic_number, 1);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        assert!(element_by_symbol("cl").is_none());
        assert!(element_by_symbol("Cl").is_some());
    }

    #[test]
    fn unknown_symbol_returns_none() {
        assert!(element_by_symbol("Zz").is_none());
        assert!(element_by_symbol("").is_none());
    }
}
