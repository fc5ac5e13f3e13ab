//! Post-processing of converged solver results: electronic properties
//! and harmonic frequency analysis.

pub mod frequencies;
pub mod properties;
