//! Schema module - Configuration and observability types for the engine.

mod config;
mod snapshot;

pub use config::*;
pub use snapshot::*;
