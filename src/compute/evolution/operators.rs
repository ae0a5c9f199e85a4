//! Collaborator interfaces the engine drives: generation, mutation, evaluation.
//!
//! Program representation and execution live behind these traits. The engine
//! only needs fresh seed programs, mutated copies, and two tiers of fitness.

use crate::schema::{Algorithm, CandidateRef};

use super::random::RandomSource;

/// Produces seed programs for `init`.
pub trait Generator {
    fn new_seed_candidate(&mut self, rng: &mut RandomSource) -> Algorithm;
}

/// Mutation strength requested by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationIntensity {
    /// Used once per seed in `init`; consumes randomness but may leave the
    /// program unchanged.
    Neutral,
    /// Regular per-generation mutation.
    Full,
}

/// Produces a new program from a parent. Never modifies the parent.
pub trait Mutator {
    fn mutate(
        &mut self,
        intensity: MutationIntensity,
        parent: &CandidateRef,
        rng: &mut RandomSource,
    ) -> CandidateRef;
}

/// Scores programs.
///
/// Each call to `evaluate` or `early_evaluate` advances
/// `num_train_steps_completed`, which is the run loop's budget counter.
pub trait Evaluator {
    /// Canonical (expensive) fitness.
    fn evaluate(&mut self, algorithm: &Algorithm) -> f64;
    /// Cheap approximate fitness used for hurdle gating.
    fn early_evaluate(&mut self, algorithm: &Algorithm) -> f64;
    /// Monotonic count of train steps consumed so far.
    fn num_train_steps_completed(&self) -> u64;
}
