//! Small helpers shared across subsystems.

pub mod datetime;
pub mod filename;
