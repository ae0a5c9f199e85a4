//! Records emitted to the store: progress lines and per-candidate diagnostics.

use serde::{Deserialize, Serialize};

use super::{Algorithm, CategoryHistogram, Section, VariableCounts};

/// One periodic progress report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub run_id: i64,
    /// Individuals evaluated so far.
    pub num_individuals: u64,
    pub elapsed_secs: u64,
    pub mean: f64,
    pub stdev: f64,
    /// Best fitness in the current population.
    pub best_fitness: f64,
    /// Best fitness seen at any point in the run.
    pub best_overall: f64,
    /// Diversity score of the current best candidate.
    pub best_diversity: f64,
    pub mean_diversity: f64,
    /// Readable text of the current best candidate.
    pub best_program: String,
}

/// Structural diagnostics for one population member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversityRecord {
    pub run_id: i64,
    pub num_individuals: u64,
    pub total_ops: usize,
    pub setup_ops: usize,
    pub predict_ops: usize,
    pub learn_ops: usize,
    pub variables: VariableCounts,
    pub categories: CategoryHistogram,
    pub diversity: f64,
    pub fitness: f64,
    pub program: String,
}

impl DiversityRecord {
    /// Describe one candidate.
    pub fn describe(
        run_id: i64,
        num_individuals: u64,
        algorithm: &Algorithm,
        diversity: f64,
        fitness: f64,
    ) -> Self {
        Self {
            run_id,
            num_individuals,
            total_ops: algorithm.total_ops(),
            setup_ops: algorithm.section(Section::Setup).len(),
            predict_ops: algorithm.section(Section::Predict).len(),
            learn_ops: algorithm.section(Section::Learn).len(),
            variables: algorithm.variable_counts(),
            categories: algorithm.category_histogram(),
            diversity,
            fitness,
            program: algorithm.to_readable(),
        }
    }
}
