use crate::core::models::atom::Atom;
use crate::core::models::molecule::Molecule;
use nalgebra::Point3;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzParseError {
    #[error("XYZ: empty input")]
    Empty,

    #[error("XYZ: invalid atom count: '{0}'")]
    InvalidAtomCount(String),

    #[error("XYZ: missing comment line")]
    MissingComment,

    #[error("XYZ: expected {expected} atoms, got {found}")]
    TruncatedAtomBlock { expected: usize, found: usize },

    #[error("XYZ: malformed atom line: '{0}'")]
    MalformedAtomLine(String),

    #[error("XYZ: unknown element symbol: '{0}'")]
    UnknownElement(String),
}

/// Parses the minimal XYZ format: an atom count line, a free-form
/// comment line, then one `symbol x y z` line per atom (coordinates in
/// angstrom).
pub fn parse_xyz(content: &str) -> Result<Molecule, XyzParseError> {
    let mut lines = content.lines();

    let count_line = lines.next().ok_or(XyzParseError::Empty)?;
    let num_atoms: usize = count_line
        .trim()
        .parse()
        .map_err(|_| XyzParseError::InvalidAtomCount(count_line.to_string()))?;

    let comment = lines.next().ok_or(XyzParseError::MissingComment)?;

    let mut mol = Molecule::new("");
    mol.comment = comment.to_string();

    for i in 0..num_atoms {
        let line = lines.next().ok_or(XyzParseError::TruncatedAtomBlock {
            expected: num_atoms,
            found: i,
        })?;

        let mut fields = line.split_whitespace();
        let symbol = fields
            .next()
            .ok_or_else(|| XyzParseError::MalformedAtomLine(line.to_string()))?;
        let mut coord = || -> Result<f64, XyzParseError> {
            fields
                .next()
                .and_then(|f| f.parse().ok())
                .ok_or_else(|| XyzParseError::MalformedAtomLine(line.to_string()))
        };
        let x = coord()?;
        let y = coord()?;
        let z = coord()?;

        let atom = Atom::from_symbol(symbol, Point3::new(x, y, z))
            .ok_or_else(|| XyzParseError::UnknownElement(symbol.to_string()))?;
        mol.add_atom(atom);
    }

    Ok(mol)
}

/// Writes a molecule back to XYZ text.
pub fn write_xyz(mol: &Molecule) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n{}\n", mol.num_atoms(), mol.comment));
    for atom in mol.atoms() {
        out.push_str(&format!(
            "{} {} {} {}\n",
            atom.symbol, atom.position.x, atom.position.y, atom.position.z
        ));
    }
    out
}
