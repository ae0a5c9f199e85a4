//! Compute module - The evolution engine and the built-in synthetic objective.

pub mod evolution;
pub mod synthetic;
