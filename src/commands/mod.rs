//! Command handlers for the planner

pub mod astronomy;
pub mod targets;

// Re-export all commands
pub use astronomy::*;
pub use targets::*;
