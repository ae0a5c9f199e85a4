//! Schema module - Configuration, candidate programs and store records.

mod config;
mod evolution;
mod program;
mod records;

pub use config::*;
pub use evolution::*;
pub use program::*;
pub use records::*;
