//! Volumetric visualization: sampling grids and the orbital/density
//! field kernels that fill them.

pub mod grid;
pub mod sampler;
