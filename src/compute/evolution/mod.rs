//! Regularized evolution over program candidates.
//!
//! # Overview
//!
//! The engine keeps a fixed-size population and, each generation, keeps the
//! best slot as an elite and refills every other slot with a mutated
//! tournament winner. Around that loop sit a few optional strategies:
//!
//! - **Hurdles** (`hurdle`): a cheap early evaluation gates the full one
//! - **Quality-diversity** (`diversity`): tournaments score fitness plus a
//!   normalised structural diversity
//! - **Map-elites** (`map_elites`): the population is filtered through an
//!   archive of the best candidate per feature cell
//! - **Migration** (`migration`): independent runs exchange candidates
//!   through a shared [`EvolutionStore`](crate::store::EvolutionStore)
//!
//! Program generation, mutation and evaluation are supplied by the caller
//! through the traits in `operators`.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use regevo::compute::evolution::RegularizedEvolution;
//! use regevo::compute::synthetic::{HistogramEvaluator, InstructionMutator, RandomProgramGenerator};
//! use regevo::schema::{EvolutionConfig, SyntheticConfig};
//! use regevo::store::MemoryStore;
//!
//! let synthetic = SyntheticConfig::default();
//! let mut engine = RegularizedEvolution::new(
//!     EvolutionConfig::default(),
//!     RandomProgramGenerator::new(synthetic.clone()),
//!     InstructionMutator::new(synthetic.clone()),
//!     HistogramEvaluator::new(&synthetic),
//!     MemoryStore::default(),
//! )
//! .unwrap();
//!
//! engine.init();
//! engine.run(10_000, Duration::from_secs(60));
//! if let Some((best, fitness)) = engine.best() {
//!     println!("{:.4}\n{}", fitness, best.to_readable());
//! }
//! ```

mod diversity;
mod hurdle;
mod map_elites;
mod migration;
mod operators;
mod population;
mod progress;
mod random;
mod search;

pub use diversity::{Features, normalized_diversity, raw_diversity, score_population};
pub use hurdle::{Evaluation, HurdleController, percentile_threshold};
pub use map_elites::{ArchiveUpdate, Elite, MapElitesArchive};
pub use migration::{MigrationController, MigrationOutcome, splice};
pub use operators::{Evaluator, Generator, MutationIntensity, Mutator};
pub use population::{Population, Slot, TournamentScore};
pub use progress::{PopulationStats, ProgressReporter, diversity_records};
pub use random::RandomSource;
pub use search::RegularizedEvolution;
