//! Stateless data models for molecular structures and identifiers.

pub mod atom;
pub mod ids;
pub mod molecule;
