//! Probabilistic exchange of population members through the shared store.

use std::sync::Arc;

use log::{info, warn};

use crate::schema::{Algorithm, MigrationConfig, SplicePolicy};
use crate::store::{EvolutionStore, StoreError};

use super::population::Population;
use super::random::RandomSource;

/// Result of one migration opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The probability draw said no (or migration is disabled).
    Skipped,
    /// Exchange completed; this many migrants were spliced in.
    Migrated(usize),
    /// A store call failed; the population is unchanged.
    Failed,
}

/// Runs the publish / withdraw / fetch protocol for one run id.
#[derive(Debug, Clone)]
pub struct MigrationController {
    config: MigrationConfig,
}

impl MigrationController {
    /// Controller for one run's migration settings.
    pub fn new(config: MigrationConfig) -> Self {
        Self { config }
    }

    /// Id this run publishes under.
    pub fn run_id(&self) -> i64 {
        self.config.run_id
    }

    /// Draw against `migrate_prob` and, on success, exchange with peers.
    ///
    /// Consumes one probability draw when `migrate_prob > 0` and none otherwise.
    pub fn maybe_migrate(
        &self,
        rng: &mut RandomSource,
        store: &mut dyn EvolutionStore,
        population: &mut Population,
    ) -> MigrationOutcome {
        if self.config.migrate_prob <= 0.0 {
            return MigrationOutcome::Skipped;
        }
        if rng.uniform_probability() >= self.config.migrate_prob {
            return MigrationOutcome::Skipped;
        }

        match self.exchange(store, population) {
            Ok(count) => {
                info!(
                    "run {}: {} candidates migrated ({:?})",
                    self.config.run_id, count, self.config.splice
                );
                MigrationOutcome::Migrated(count)
            }
            Err(e) => {
                warn!("run {}: migration skipped: {}", self.config.run_id, e);
                MigrationOutcome::Failed
            }
        }
    }

    /// Withdraw old rows, publish the current population, fetch and splice
    /// foreign members. Nothing local changes unless every call succeeds.
    fn exchange(
        &self,
        store: &mut dyn EvolutionStore,
        population: &mut Population,
    ) -> Result<usize, StoreError> {
        let run_id = self.config.run_id;
        store.delete_run(run_id)?;
        store.insert_population(run_id, &population.members())?;
        let migrants = store.fetch_foreign_sample(run_id, population.len() / 2)?;
        Ok(splice(self.config.splice, population, migrants))
    }
}

/// Write migrants into the slots chosen by `policy`. Returns how many landed.
///
/// At most `len / 2` migrants are used. Migrants keep their persisted
/// fitness and start with no early fitness or diversity.
pub fn splice(
    policy: SplicePolicy,
    population: &mut Population,
    migrants: Vec<(Algorithm, f64)>,
) -> usize {
    let half = population.len() / 2;
    let targets: Vec<usize> = match policy {
        SplicePolicy::ReplaceTopHalf => (0..half).collect(),
        SplicePolicy::ReplaceBottomHalf => (half..population.len()).collect(),
        SplicePolicy::ReplaceWorst => {
            let mut order: Vec<usize> = (0..population.len()).collect();
            // NaN sorts first so it is replaced before any real score.
            order.sort_by(|&a, &b| {
                let fa = population.slot(a).fitness;
                let fb = population.slot(b).fitness;
                match (fa.is_nan(), fb.is_nan()) {
                    (true, true) => std::cmp::Ordering::Equal,
                    (true, false) => std::cmp::Ordering::Less,
                    (false, true) => std::cmp::Ordering::Greater,
                    (false, false) => fa.total_cmp(&fb),
                }
            });
            order
        }
    };

    let mut count = 0;
    for (index, (algorithm, fitness)) in targets.into_iter().zip(migrants).take(half) {
        population.replace(index, Arc::new(algorithm), fitness, None);
        count += 1;
    }
    count
}
