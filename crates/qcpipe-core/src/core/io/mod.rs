//! Plain-text structure input.
//!
//! Two formats are accepted: minimal XYZ (count/comment/atom lines) and
//! the richer V2000 connection table carried by .sdf/.mol files.

pub mod sdf;
pub mod xyz;

use crate::core::models::molecule::Molecule;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StructureParseError {
    #[error(transparent)]
    Xyz(#[from] xyz::XyzParseError),

    #[error(transparent)]
    Sdf(#[from] sdf::SdfParseError),
}

/// Parses a structure file, picking the format from the file name
/// extension: `.sdf` and `.mol` are read as connection tables, anything
/// else as XYZ.
pub fn parse_structure(filename: &str, content: &str) -> Result<Molecule, StructureParseError> {
    let lower = filename.to_ascii_lowercase();
    let mut mol = if lower.ends_with(".sdf") || lower.ends_with(".mol") {
        sdf::parse_sdf(content)?
    } else {
        xyz::parse_xyz(content)?
    };

    if mol.name.is_empty() {
        let stem = filename.rsplit('/').next().unwrap_or(filename);
        mol.name = stem.rsplit_once('.').map(|(s, _)| s).unwrap_or(stem).to_string();
    }
    Ok(mol)
}
