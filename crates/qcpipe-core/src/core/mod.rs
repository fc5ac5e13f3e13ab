//! The foundation layer: element data, physical constants, molecular
//! models, and plain-text structure I/O. Everything here is stateless
//! and free of concurrency concerns.

pub mod constants;
pub mod elements;
pub mod io;
pub mod models;
