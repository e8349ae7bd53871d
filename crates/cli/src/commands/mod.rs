//! CLI command implementations

pub mod decisions;
pub mod status;
