//! Shared persistent store used for migration and run logging.
//!
//! Independent engine instances coordinate only through this store. Each
//! call is atomic on its own; callers treat any error as a skipped cycle.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::schema::{Algorithm, CandidateRef, DiversityRecord, ProgressRecord};

/// Error type for store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Persistence collaborator keyed by run id.
pub trait EvolutionStore {
    /// Remove every population row published under `run_id`.
    fn delete_run(&mut self, run_id: i64) -> Result<(), StoreError>;

    /// Publish a population snapshot. Returns the number of rows written.
    fn insert_population(
        &mut self,
        run_id: i64,
        members: &[(CandidateRef, f64)],
    ) -> Result<usize, StoreError>;

    /// Up to `count` rows published by other runs, in random order.
    fn fetch_foreign_sample(
        &mut self,
        run_id: i64,
        count: usize,
    ) -> Result<Vec<(Algorithm, f64)>, StoreError>;

    fn log_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError>;

    fn log_diversity(&mut self, records: &[DiversityRecord]) -> Result<(), StoreError>;

    /// Record the final result of a run.
    fn log_final(&mut self, run_id: i64, algorithm: &Algorithm, fitness: f64)
    -> Result<(), StoreError>;

    /// Best persisted candidate, from one run or from all runs.
    fn fetch_best(&mut self, run_id: Option<i64>) -> Result<Option<(Algorithm, f64)>, StoreError>;
}

impl<S: EvolutionStore + ?Sized> EvolutionStore for Box<S> {
    fn delete_run(&mut self, run_id: i64) -> Result<(), StoreError> {
        (**self).delete_run(run_id)
    }

    fn insert_population(
        &mut self,
        run_id: i64,
        members: &[(CandidateRef, f64)],
    ) -> Result<usize, StoreError> {
        (**self).insert_population(run_id, members)
    }

    fn fetch_foreign_sample(
        &mut self,
        run_id: i64,
        count: usize,
    ) -> Result<Vec<(Algorithm, f64)>, StoreError> {
        (**self).fetch_foreign_sample(run_id, count)
    }

    fn log_progress(&mut self, record: &ProgressRecord) -> Result<(), StoreError> {
        (**self).log_progress(record)
    }

    fn log_diversity(&mut self, records: &[DiversityRecord]) -> Result<(), StoreError> {
        (**self).log_diversity(records)
    }

    fn log_final(
        &mut self,
        run_id: i64,
        algorithm: &Algorithm,
        fitness: f64,
    ) -> Result<(), StoreError> {
        (**self).log_final(run_id, algorithm, fitness)
    }

    fn fetch_best(&mut self, run_id: Option<i64>) -> Result<Option<(Algorithm, f64)>, StoreError> {
        (**self).fetch_best(run_id)
    }
}
