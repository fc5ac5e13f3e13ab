//! The logic core: calculation lifecycle state, progress streaming,
//! worker pools, and the process-wide stores shared by the pipeline
//! stages.

pub mod cache;
pub mod error;
pub mod pool;
pub mod progress;
pub mod registry;
pub mod store;
