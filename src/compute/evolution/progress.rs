//! Population statistics and periodic report scheduling.

use std::time::{Duration, Instant};

use crate::schema::{DiversityRecord, ProgressRecord};

use super::population::Population;

/// Summary statistics of the current population.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopulationStats {
    pub mean: f64,
    /// Population (not sample) standard deviation.
    pub stdev: f64,
    pub best_index: usize,
    pub best_fitness: f64,
    pub best_diversity: f64,
    pub mean_diversity: f64,
}

impl PopulationStats {
    /// Compute over finite fitnesses only; mean and stdev are 0 when none are finite.
    pub fn of(population: &Population) -> Self {
        let finite: Vec<f64> = population.fitnesses().filter(|f| f.is_finite()).collect();
        let (mean, stdev) = match finite.first() {
            None => (0.0, 0.0),
            Some(&shift) => {
                // Two passes, shifted by the first value so equal inputs give exactly 0.
                let n = finite.len() as f64;
                let mean = shift + finite.iter().map(|f| f - shift).sum::<f64>() / n;
                let variance = (finite.iter().map(|f| (f - mean).powi(2)).sum::<f64>() / n).max(0.0);
                (mean, variance.sqrt())
            }
        };

        let best_index = population.best_index();
        let best = population.slot(best_index);
        let mean_diversity = if population.is_empty() {
            0.0
        } else {
            population.slots().iter().map(|s| s.diversity).sum::<f64>() / population.len() as f64
        };

        Self {
            mean,
            stdev,
            best_index,
            best_fitness: best.fitness,
            best_diversity: best.diversity,
            mean_diversity,
        }
    }
}

/// Decides when a report is due, counted in individuals evaluated.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    progress_every: u64,
    /// `None` until the first report, which is always due.
    last_report: Option<u64>,
    start: Instant,
}

impl ProgressReporter {
    /// Create a reporter; the wall clock starts now.
    pub fn new(progress_every: u64) -> Self {
        Self {
            progress_every,
            last_report: None,
            start: Instant::now(),
        }
    }

    /// True before the first report and once `progress_every` individuals
    /// have been evaluated since the last one.
    pub fn is_due(&self, num_individuals: u64) -> bool {
        self.last_report
            .is_none_or(|last| num_individuals.saturating_sub(last) >= self.progress_every)
    }

    /// Record that a report was emitted at `num_individuals`.
    pub fn mark(&mut self, num_individuals: u64) {
        self.last_report = Some(num_individuals);
    }

    /// Wall-clock time since construction.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Build the progress record for the current population.
    pub fn progress_record(
        &self,
        run_id: i64,
        num_individuals: u64,
        stats: &PopulationStats,
        best_overall: f64,
        population: &Population,
    ) -> ProgressRecord {
        ProgressRecord {
            run_id,
            num_individuals,
            elapsed_secs: self.elapsed().as_secs(),
            mean: stats.mean,
            stdev: stats.stdev,
            best_fitness: stats.best_fitness,
            best_overall,
            best_diversity: stats.best_diversity,
            mean_diversity: stats.mean_diversity,
            best_program: population.slot(stats.best_index).candidate.to_readable(),
        }
    }
}

/// One diagnostic record per slot, in slot order.
pub fn diversity_records(
    run_id: i64,
    num_individuals: u64,
    population: &Population,
) -> Vec<DiversityRecord> {
    population
        .slots()
        .iter()
        .map(|s| DiversityRecord::describe(run_id, num_individuals, &s.candidate, s.diversity, s.fitness))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Address, Algorithm, Instruction, Op};
    use std::sync::Arc;

    fn population(fitnesses: &[f64]) -> Population {
        let mut population = Population::new(fitnesses.len());
        for (i, &f) in fitnesses.iter().enumerate() {
            let program = Algorithm::new(
                vec![],
                vec![Instruction::new(Op(i as u8), Address::Scalar(0), vec![])],
                vec![],
            );
            population.replace(i, Arc::new(program), f, None);
        }
        population
    }

    #[test]
    fn test_population_stdev() {
        let mut pop = population(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        pop.slot_mut(7).diversity = 0.8;
        let stats = PopulationStats::of(&pop);
        assert!((stats.mean - 5.0).abs() < 1e-12);
        assert!((stats.stdev - 2.0).abs() < 1e-12);
        assert_eq!(stats.best_index, 7);
        assert_eq!(stats.best_fitness, 9.0);
        assert_eq!(stats.best_diversity, 0.8);
        assert!((stats.mean_diversity - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_constant_population_has_zero_stdev() {
        let stats = PopulationStats::of(&population(&[0.1; 7]));
        assert_eq!(stats.stdev, 0.0);
    }

    #[test]
    fn test_constant_large_population_has_zero_stdev() {
        let stats = PopulationStats::of(&population(&[0.7315; 100]));
        assert_eq!(stats.stdev, 0.0);
        assert_eq!(stats.mean, 0.7315);
    }

    #[test]
    fn test_non_finite_excluded_from_moments() {
        let stats = PopulationStats::of(&population(&[1.0, f64::NAN, 3.0, f64::INFINITY]));
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.stdev, 1.0);
        assert!(stats.stdev.is_finite());
    }

    #[test]
    fn test_reporter_interval() {
        let mut reporter = ProgressReporter::new(10);
        // The baseline report is due regardless of the interval.
        assert!(reporter.is_due(0));
        assert!(reporter.is_due(3));
        reporter.mark(2);
        assert!(!reporter.is_due(11));
        assert!(reporter.is_due(12));
        reporter.mark(12);
        assert!(!reporter.is_due(21));
        assert!(reporter.is_due(22));
    }

    #[test]
    fn test_records_cover_population() {
        let pop = population(&[0.3, 0.6]);
        let stats = PopulationStats::of(&pop);
        let record = ProgressReporter::new(1).progress_record(4, 20, &stats, 0.9, &pop);
        assert_eq!(record.best_fitness, 0.6);
        assert_eq!(record.best_overall, 0.9);
        assert_eq!(record.best_program, pop.slot(1).candidate.to_readable());

        let records = diversity_records(4, 20, &pop);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fitness, 0.3);
        assert_eq!(records[1].predict_ops, 1);
    }
}
