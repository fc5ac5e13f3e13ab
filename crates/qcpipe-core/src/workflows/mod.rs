//! Calculation pipelines and the service that dispatches them.

pub mod energy;
pub mod frequency;
pub mod optimize;
pub mod service;
