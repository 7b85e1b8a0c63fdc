//! CLI command implementations.

pub mod clean;
pub mod dump;
pub mod stats;
