//! Regevo - Regularized evolution of programs with hurdles, quality-diversity
//! and map-elites, and migration between concurrent runs.
//!
//! # Architecture
//!
//! The crate is split into three modules:
//!
//! - `schema`: Configuration types, candidate programs and store records
//! - `compute`: The evolution engine and a synthetic objective to drive it
//! - `store`: Persistence used for migration and run logging (in-memory or SQLite)
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use regevo::{
//!     compute::synthetic::{HistogramEvaluator, InstructionMutator, RandomProgramGenerator},
//!     schema::{EvolutionConfig, RunMode, SyntheticConfig},
//!     store::SqliteStore,
//!     RegularizedEvolution,
//! };
//!
//! let config = EvolutionConfig {
//!     mode: RunMode::Hurdles,
//!     random_seed: Some(7),
//!     ..Default::default()
//! };
//! let synthetic = SyntheticConfig::default();
//! let store = SqliteStore::open("runs.db3").unwrap();
//!
//! let mut engine = RegularizedEvolution::new(
//!     config,
//!     RandomProgramGenerator::new(synthetic.clone()),
//!     InstructionMutator::new(synthetic.clone()),
//!     HistogramEvaluator::new(&synthetic),
//!     store,
//! )
//! .unwrap();
//!
//! engine.init();
//! engine.run(100_000, Duration::from_secs(600));
//! engine.record_final().unwrap();
//! ```

pub mod compute;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use compute::evolution::{Evaluator, Generator, Mutator, RandomSource, RegularizedEvolution};
pub use schema::{Algorithm, CandidateRef, EvolutionConfig, ExperimentConfig, RunMode};
pub use store::{EvolutionStore, MemoryStore, SqliteStore, StoreError};
