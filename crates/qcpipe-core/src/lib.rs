//! # qcpipe Core Library
//!
//! An orchestration and post-processing library for electronic-structure
//! calculations: it drives an external SCF solver through single-point,
//! geometry-optimization, and vibrational-frequency pipelines, tracks
//! each calculation through a strict lifecycle, streams per-iteration
//! progress, and serves volumetric orbital/density fields from cached
//! solver state.
//!
//! ## Architectural Philosophy
//!
//! The library keeps a strict three-layer architecture so the numeric
//! kernels, the concurrent state machinery, and the user-facing flows
//! stay independently testable.
//!
//! - **[`core`]: The Foundation.** Stateless data models (molecules,
//!   atoms, identifiers), structure-file parsing, element data, and the
//!   shared physical constants.
//!
//! - **[`engine`]: The Logic Core.** The stateful layer: the
//!   calculation registry and its lifecycle state machine, per-
//!   calculation progress channels, bounded worker pools, and the
//!   molecule/result stores.
//!
//! - **[`workflows`]: The Public API.** Ties `engine`, [`solver`],
//!   [`analysis`], and [`viz`] together into complete calculation
//!   pipelines behind [`workflows::service::CalculationService`], the
//!   entry point for embedders.
//!
//! The [`solver`] module is the seam to the external electronic-
//! structure engine; [`solver::model`] ships a deterministic model
//! implementation used by the test suite and the bundled CLI.

pub mod analysis;
pub mod core;
pub mod engine;
pub mod solver;
pub mod viz;
pub mod workflows;
