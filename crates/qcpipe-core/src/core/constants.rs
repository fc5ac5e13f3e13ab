//! Physical constants used by the post-processing kernels.
//!
//! These are fixed literals shared between the property-extraction and
//! frequency-analysis kernels so that results are reproducible across
//! runs and platforms. Do not replace them with values computed at
//! runtime or pulled from an external data source.

/// Hartree to electron-volt.
pub const HARTREE_TO_EV: f64 = 27.211386245988;

/// Bohr radius to angstrom.
pub const BOHR_TO_ANGSTROM: f64 = 0.529177249;

/// Hartree to joule.
pub const HARTREE_TO_JOULE: f64 = 4.3597447222071e-18;

/// Bohr radius to meter.
pub const BOHR_TO_METER: f64 = 5.29177210903e-11;

/// Unified atomic mass unit to kilogram.
pub const AMU_TO_KG: f64 = 1.66053906660e-27;

/// Speed of light in cm/s, for wavenumber conversion.
pub const SPEED_OF_LIGHT_CM_S: f64 = 2.99792458e10;
