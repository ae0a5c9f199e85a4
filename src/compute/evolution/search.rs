//! Regularized evolution engine.

use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::schema::{CandidateRef, EvolutionConfig, EvolutionConfigError, RunMode};
use crate::store::{EvolutionStore, StoreError};

use super::diversity::score_population;
use super::hurdle::{Evaluation, HurdleController};
use super::map_elites::MapElitesArchive;
use super::migration::{MigrationController, MigrationOutcome};
use super::operators::{Evaluator, Generator, MutationIntensity, Mutator};
use super::population::{Population, TournamentScore, beats};
use super::progress::{PopulationStats, ProgressReporter, diversity_records};
use super::random::RandomSource;

/// Per-generation strategy, fixed at construction.
#[derive(Debug)]
enum Strategy {
    Standard,
    Hurdles(HurdleController),
    QualityDiversity,
    MapElites(MapElitesArchive),
}

impl Strategy {
    fn from_mode(mode: &RunMode) -> Result<Self, EvolutionConfigError> {
        Ok(match mode {
            RunMode::Standard => Strategy::Standard,
            RunMode::Hurdles => Strategy::Hurdles(HurdleController::new()),
            RunMode::QualityDiversity => Strategy::QualityDiversity,
            RunMode::MapElites { grid } => Strategy::MapElites(MapElitesArchive::new(grid)?),
        })
    }

    fn tournament_score(&self) -> TournamentScore {
        match self {
            Strategy::QualityDiversity => TournamentScore::FitnessPlusDiversity,
            _ => TournamentScore::Fitness,
        }
    }
}

/// Single-threaded regularized evolution over a fixed-size population.
///
/// Call [`init`](Self::init) once, then [`run`](Self::run) any number of times.
pub struct RegularizedEvolution {
    config: EvolutionConfig,
    rng: RandomSource,
    generator: Box<dyn Generator>,
    mutator: Box<dyn Mutator>,
    evaluator: Box<dyn Evaluator>,
    store: Box<dyn EvolutionStore>,
    population: Population,
    strategy: Strategy,
    migration: MigrationController,
    reporter: ProgressReporter,
    best: Option<(CandidateRef, f64)>,
    /// Early fitnesses computed since the last hurdle update.
    early_observed: Vec<f64>,
    num_individuals: u64,
    generation: u64,
    initialized: bool,
}

impl RegularizedEvolution {
    /// Validate the configuration and build an engine with placeholder slots.
    pub fn new(
        config: EvolutionConfig,
        generator: impl Generator + 'static,
        mutator: impl Mutator + 'static,
        evaluator: impl Evaluator + 'static,
        store: impl EvolutionStore + 'static,
    ) -> Result<Self, EvolutionConfigError> {
        config.validate()?;
        let rng = match config.random_seed {
            Some(seed) => RandomSource::new(seed),
            None => RandomSource::from_entropy(),
        };
        let strategy = Strategy::from_mode(&config.mode)?;

        Ok(Self {
            population: Population::new(config.population_size),
            migration: MigrationController::new(config.migration.clone()),
            reporter: ProgressReporter::new(config.progress_every),
            rng,
            generator: Box::new(generator),
            mutator: Box::new(mutator),
            evaluator: Box::new(evaluator),
            store: Box::new(store),
            strategy,
            config,
            best: None,
            early_observed: Vec::new(),
            num_individuals: 0,
            generation: 0,
            initialized: false,
        })
    }

    /// Fill every slot with a freshly generated, evaluated seed program.
    ///
    /// Both evaluation tiers run for every seed; the full result is its fitness.
    /// In hurdles mode the seeds' early fitnesses feed the first hurdle update,
    /// so the first generation runs ungated.
    pub fn init(&mut self) {
        let hurdles = matches!(self.strategy, Strategy::Hurdles(_));
        for index in 0..self.population.len() {
            let seed = Arc::new(self.generator.new_seed_candidate(&mut self.rng));
            let candidate = self
                .mutator
                .mutate(MutationIntensity::Neutral, &seed, &mut self.rng);
            let fitness = self.evaluator.evaluate(&candidate);
            let early = self.evaluator.early_evaluate(&candidate);
            self.population.replace(index, candidate, fitness, Some(early));
            if hurdles {
                self.early_observed.push(early);
            }
            self.num_individuals += 1;
        }

        self.initialized = true;
        self.update_best();
        info!(
            "run {}: initialized {} individuals, best fitness {:.6}",
            self.migration.run_id(),
            self.population.len(),
            self.best_fitness()
        );
        self.maybe_report();
    }

    /// Evolve until `max_train_steps` further evaluation steps or `max_time`
    /// have elapsed. Budgets are checked at the start of each generation.
    ///
    /// Returns the number of generations completed by this call.
    pub fn run(&mut self, max_train_steps: u64, max_time: Duration) -> u64 {
        assert!(self.initialized, "run() called before init()");
        let start_steps = self.evaluator.num_train_steps_completed();
        let start = Instant::now();
        let mut generations = 0;

        while self.evaluator.num_train_steps_completed() - start_steps < max_train_steps
            && start.elapsed() < max_time
        {
            let before = self.evaluator.num_train_steps_completed();
            self.step();
            generations += 1;
            if self.evaluator.num_train_steps_completed() == before {
                warn!(
                    "run {}: generation consumed no train steps, stopping",
                    self.migration.run_id()
                );
                break;
            }
        }

        info!(
            "run {}: stopped after {} generations, {} individuals, best fitness {:.6}",
            self.migration.run_id(),
            generations,
            self.num_individuals,
            self.best_fitness()
        );
        generations
    }

    /// One full generation.
    fn step(&mut self) {
        let best = self.population.best_index();
        if best != 0 {
            let elite = self.population.slot(best).clone();
            *self.population.slot_mut(0) = elite;
        }

        let score = self.strategy.tournament_score();
        for index in 1..self.population.len() {
            let parent =
                self.population
                    .best_fitness_tournament(&mut self.rng, self.config.tournament_size, score);
            let child = self
                .mutator
                .mutate(MutationIntensity::Full, &parent, &mut self.rng);
            let evaluation = match &self.strategy {
                Strategy::Hurdles(hurdle) => hurdle.evaluate(self.evaluator.as_mut(), &child),
                _ => Evaluation::full(self.evaluator.as_mut(), &child),
            };
            if let Some(early) = evaluation.early_fitness {
                self.early_observed.push(early);
            }
            self.population
                .replace(index, child, evaluation.fitness, evaluation.early_fitness);
            self.num_individuals += 1;
        }

        match &mut self.strategy {
            Strategy::Standard => {}
            Strategy::QualityDiversity => score_population(&mut self.population),
            Strategy::MapElites(archive) => {
                let update = archive.apply(&mut self.population, &mut self.rng);
                debug!(
                    "archive: {} accepted, {} resampled, {} kept, {}/{} cells occupied",
                    update.accepted,
                    update.resampled,
                    update.kept,
                    archive.occupied(),
                    archive.capacity()
                );
            }
            Strategy::Hurdles(hurdle) => {
                let value = hurdle.recompute(self.early_observed.drain(..));
                debug!("hurdle {:.6}", value);
            }
        }

        if let MigrationOutcome::Migrated(count) =
            self.migration
                .maybe_migrate(&mut self.rng, self.store.as_mut(), &mut self.population)
        {
            debug!("generation {}: {} migrants", self.generation, count);
        }

        self.generation += 1;
        self.update_best();
        self.maybe_report();
    }

    /// Best-ever only moves on a strictly greater population best.
    fn update_best(&mut self) {
        let (candidate, fitness) = self.population.get_best();
        if self
            .best
            .as_ref()
            .is_none_or(|(_, current)| beats(fitness, *current))
        {
            self.best = Some((candidate, fitness));
        }
    }

    fn best_fitness(&self) -> f64 {
        self.best.as_ref().map_or(f64::NAN, |(_, f)| *f)
    }

    fn maybe_report(&mut self) {
        if !self.reporter.is_due(self.num_individuals) {
            return;
        }
        let run_id = self.migration.run_id();
        let stats = PopulationStats::of(&self.population);

        let records = diversity_records(run_id, self.num_individuals, &self.population);
        if let Err(e) = self.store.log_diversity(&records) {
            warn!("run {}: diversity log failed: {}", run_id, e);
        }

        let record = self.reporter.progress_record(
            run_id,
            self.num_individuals,
            &stats,
            self.best_fitness(),
            &self.population,
        );
        if let Err(e) = self.store.log_progress(&record) {
            warn!("run {}: progress log failed: {}", run_id, e);
        }

        info!(
            "run {}: indivs={} elapsed={}s mean={:.6} stdev={:.6} best={:.6} best_overall={:.6} mean_div={:.4}",
            run_id,
            record.num_individuals,
            record.elapsed_secs,
            record.mean,
            record.stdev,
            record.best_fitness,
            record.best_overall,
            record.mean_diversity
        );
        self.reporter.mark(self.num_individuals);
    }

    /// Persist the best-ever candidate as this run's final result.
    pub fn record_final(&mut self) -> Result<(), StoreError> {
        let Some((candidate, fitness)) = self.best.clone() else {
            return Ok(());
        };
        self.store
            .log_final(self.migration.run_id(), &candidate, fitness)
    }

    /// Candidates evaluated so far, seeds included.
    pub fn num_individuals(&self) -> u64 {
        self.num_individuals
    }

    /// Number of population slots.
    pub fn population_size(&self) -> usize {
        self.population.len()
    }

    /// Evaluation steps reported by the evaluator.
    pub fn num_train_steps(&self) -> u64 {
        self.evaluator.num_train_steps_completed()
    }

    /// Generations completed across all `run` calls.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Best-ever candidate and fitness.
    pub fn best(&self) -> Option<(&CandidateRef, f64)> {
        self.best.as_ref().map(|(c, f)| (c, *f))
    }

    /// Current population.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Map-elites archive, in map-elites mode.
    pub fn archive(&self) -> Option<&MapElitesArchive> {
        match &self.strategy {
            Strategy::MapElites(archive) => Some(archive),
            _ => None,
        }
    }

    /// Current hurdle, in hurdles mode.
    pub fn hurdle(&self) -> Option<f64> {
        match &self.strategy {
            Strategy::Hurdles(hurdle) => Some(hurdle.value()),
            _ => None,
        }
    }
}
