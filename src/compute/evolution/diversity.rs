//! Structural diversity scoring over (operations, variables) features.

use crate::schema::Algorithm;

use super::population::Population;

/// Integer phenotype features of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Features {
    /// Total instruction count.
    pub ops: usize,
    /// Sum of highest declared scalar, vector and matrix indices.
    pub vars: usize,
}

impl Features {
    pub fn of(algorithm: &Algorithm) -> Self {
        Self {
            ops: algorithm.total_ops(),
            vars: algorithm.variable_counts().total(),
        }
    }

    /// L1 distance in feature space.
    pub fn distance(&self, other: &Features) -> u64 {
        (self.ops.abs_diff(other.ops) + self.vars.abs_diff(other.vars)) as u64
    }
}

/// Sum of distances from each candidate to every candidate (self included).
pub fn raw_diversity(features: &[Features]) -> Vec<f64> {
    features
        .iter()
        .map(|a| features.iter().map(|b| a.distance(b)).sum::<u64>() as f64)
        .collect()
}

/// Min-max normalised raw diversity; all zeros when every raw score is equal.
pub fn normalized_diversity(features: &[Features]) -> Vec<f64> {
    let raw = raw_diversity(features);
    let min = raw.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = raw.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    if range <= 0.0 {
        return vec![0.0; raw.len()];
    }
    raw.into_iter().map(|r| (r - min) / range).collect()
}

/// Recompute every slot's diversity score.
pub fn score_population(population: &mut Population) {
    let features: Vec<Features> = population
        .slots()
        .iter()
        .map(|s| Features::of(&s.candidate))
        .collect();
    for (index, score) in normalized_diversity(&features).into_iter().enumerate() {
        population.slot_mut(index).diversity = score;
    }
}
