use crate::core::models::atom::{Atom, Bond};
use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdfParseError {
    #[error("SDF: empty input")]
    Empty,

    #[error("SDF: missing counts line")]
    MissingCountsLine,

    #[error("SDF: invalid counts line: '{0}'")]
    InvalidCountsLine(String),

    #[error("SDF: expected {expected} atoms, got {found}")]
    TruncatedAtomBlock { expected: usize, found: usize },

    #[error("SDF: atom line too short: '{0}'")]
    AtomLineTooShort(String),

    #[error("SDF: malformed atom line: '{0}'")]
    MalformedAtomLine(String),

    #[error("SDF: unknown element symbol: '{0}'")]
    UnknownElement(String),

    #[error("SDF: expected {expected} bonds, got {found}")]
    TruncatedBondBlock { expected: usize, found: usize },

    #[error("SDF: malformed bond line: '{0}'")]
    MalformedBondLine(String),
}

fn fixed_field(line: &str, start: usize, width: usize) -> Option<&str> {
    if start >= line.len() {
        return None;
    }
    let end = (start + width).min(line.len());
    // `get` rejects offsets inside a multibyte character, which surfaces
    // as a malformed-line error at the caller.
    line.get(start..end).map(str::trim)
}

/// Parses the V2000 connection-table format (.sdf/.mol): three header
/// lines, a fixed-column counts line, then fixed-column atom and bond
/// blocks. Bond indices in the file are 1-based and converted to
/// 0-based here.
pub fn parse_sdf(content: &str) -> Result<Molecule, SdfParseError> {
    let mut lines = content.lines();

    let name = lines.next().ok_or(SdfParseError::Empty)?;
    let mut mol = Molecule::new(name.trim());

    // Header lines 2 and 3: program stamp and comment.
    lines.next();
    if let Some(comment) = lines.next() {
        mol.comment = comment.to_string();
    }

    let counts_line = lines.next().ok_or(SdfParseError::MissingCountsLine)?;
    if counts_line.len() < 6 {
        return Err(SdfParseError::InvalidCountsLine(counts_line.to_string()));
    }
    let parse_count = |start: usize| -> Result<usize, SdfParseError> {
        fixed_field(counts_line, start, 3)
            .and_then(|f| f.parse().ok())
            .ok_or_else(|| SdfParseError::InvalidCountsLine(counts_line.to_string()))
    };
    let num_atoms = parse_count(0)?;
    let num_bonds = parse_count(3)?;

    for i in 0..num_atoms {
        let line = lines.next().ok_or(SdfParseError::TruncatedAtomBlock {
            expected: num_atoms,
            found: i,
        })?;
        if line.len() < 34 {
            return Err(SdfParseError::AtomLineTooShort(line.to_string()));
        }

        let parse_coord = |start: usize| -> Result<f64, SdfParseError> {
            fixed_field(line, start, 10)
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| SdfParseError::MalformedAtomLine(line.to_string()))
        };
        let x = parse_coord(0)?;
        let y = parse_coord(10)?;
        let z = parse_coord(20)?;
        let symbol =
            fixed_field(line, 31, 3).ok_or_else(|| SdfParseError::AtomLineTooShort(line.to_string()))?;

        let atom = Atom::from_symbol(symbol, Point3::new(x, y, z))
            .ok_or_else(|| SdfParseError::UnknownElement(symbol.to_string()))?;
        mol.add_atom(atom);
    }

    for i in 0..num_bonds {
        let line = lines.next().ok_or(SdfParseError::TruncatedBondBlock {
            expected: num_bonds,
            found: i,
        })?;

        let parse_index = |start: usize| -> Result<usize, SdfParseError> {
            fixed_field(line, start, 3)
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| SdfParseError::MalformedBondLine(line.to_string()))
        };
        let a1: usize = parse_index(0)?;
        let a2: usize = parse_index(3)?;
        let order: usize = parse_index(6)?;
        if a1 == 0 || a2 == 0 || a1 > num_atoms || a2 > num_atoms {
            return Err(SdfParseError::MalformedBondLine(line.to_string()));
        }

        mol.add_bond(Bond {
            atom_i: a1 - 1,
            atom_j: a2 - 1,
            order: order as u8,
        });
    }

    Ok(mol)
}

#[cfg(test)]
mod tests {
    use super::*;

    const METHANOL: &str = "\
methanol
  qcpipe
test comment
  6  5  0  0  0  0  0  0  0  0999 V2000
   -0.0482    0.6624    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
    1.2345    1.4100    0.0000 O   0  0  0  0  0  0  0  0  0  0  0  0
   -0.9304    1.2995    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
   -0.0482   -0.0482    0.8662 H   0  0  0  0  0  0  0  0  0  0  0  0
   -0.0482   -0.0482   -0.8662 H   0  0  0  0  0  0  0  0  0  0  0  0
    1.9104    0.7233    0.0000 H   0  0  0  0  0  0  0  0  0  0  0  0
  1  2  1  0
  1  3  1  0
  1  4  1  0
  1  5  1  0
  2  6  1  0
M  END
";

    #[test]
    fn parses_v2000_connection_table() {
        let mol = parse_sdf(METHANOL).unwrap();
        assert_eq!(mol.name, "methanol");
        assert_eq!(mol.comment, "test comment");
        assert_eq!(mol.num_atoms(), 6);
        assert_eq!(mol.num_bonds(), 5);
        assert_eq!(mol.atoms()[1].symbol, "O");
        assert!((mol.atoms()[0].position.y - 0.6624).abs() < 1e-12);
    }

    #[test]
    fn bond_indices_become_zero_based() {
        let mol = parse_sdf(METHANOL).unwrap();
        let bond = mol.bonds()[0];
        assert_eq!((bond.atom_i, bond.atom_j, bond.order), (0, 1, 1));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(parse_sdf(""), Err(SdfParseError::Empty)));
    }

    #[test]
    fn short_counts_line_is_rejected() {
        let err = parse_sdf("name\nprog\ncomment\n  6\n").unwrap_err();
        assert!(matches!(err, SdfParseError::InvalidCountsLine(_)));
    }

    #[test]
    fn multibyte_character_across_a_field_boundary_is_rejected() {
        // The e-acute occupies bytes 9..11, so the first coordinate
        // field's byte range 0..10 ends inside it.
        let input = "\
m
p
c
  1  0  0  0  0  0  0  0  0  0999 V2000
   -0.048é   1.4100    0.0000 C   0  0
";
        let err = parse_sdf(input).unwrap_err();
        assert!(matches!(err, SdfParseError::MalformedAtomLine(_)));
    }

    #[test]
    fn out_of_range_bond_index_is_rejected() {
        let input = "\
m
p
c
  1  1  0  0  0  0  0  0  0  0999 V2000
    0.0000    0.0000    0.0000 C   0  0  0  0  0  0  0  0  0  0  0  0
  1  9  1  0
";
        let err = parse_sdf(input).unwrap_err();
        assert!(matches!(err, SdfParseError::MalformedBondLine(_)));
    }
}
