//! Fixed-size population store and tournament selection.

use std::sync::Arc;

use crate::schema::{Algorithm, CandidateRef};

use super::random::RandomSource;

/// One population slot.
#[derive(Debug, Clone)]
pub struct Slot {
    pub candidate: CandidateRef,
    /// Final fitness (full evaluation, or early evaluation when gated out).
    pub fitness: f64,
    /// Cheap-tier fitness, when it was computed for this occupant.
    pub early_fitness: Option<f64>,
    /// Normalised structural diversity, 0 until scored.
    pub diversity: f64,
}

/// How a tournament ranks sampled slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TournamentScore {
    Fitness,
    FitnessPlusDiversity,
}

/// Fixed-length array of slots.
#[derive(Debug, Clone)]
pub struct Population {
    slots: Vec<Slot>,
}

/// Whether `challenger` should replace `incumbent` as the best so far.
///
/// Strictly greater wins, and any number beats NaN.
pub(crate) fn beats(challenger: f64, incumbent: f64) -> bool {
    challenger > incumbent || (incumbent.is_nan() && !challenger.is_nan())
}

impl Population {
    /// Create `size` slots all aliasing one empty placeholder program.
    pub fn new(size: usize) -> Self {
        let placeholder: CandidateRef = Arc::new(Algorithm::default());
        let slots = (0..size)
            .map(|_| Slot {
                candidate: Arc::clone(&placeholder),
                fitness: 0.0,
                early_fitness: None,
                diversity: 0.0,
            })
            .collect();
        Self { slots }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when there are no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// All slots in index order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Slot at `index`. Panics when out of range.
    pub fn slot(&self, index: usize) -> &Slot {
        &self.slots[index]
    }

    /// Mutable slot at `index`. Panics when out of range.
    pub fn slot_mut(&mut self, index: usize) -> &mut Slot {
        &mut self.slots[index]
    }

    /// Overwrite a slot with a newly evaluated candidate. Diversity restarts at 0.
    pub fn replace(
        &mut self,
        index: usize,
        candidate: CandidateRef,
        fitness: f64,
        early_fitness: Option<f64>,
    ) {
        self.slots[index] = Slot {
            candidate,
            fitness,
            early_fitness,
            diversity: 0.0,
        };
    }

    /// Full-tier fitness of every slot, in slot order.
    pub fn fitnesses(&self) -> impl Iterator<Item = f64> + '_ {
        self.slots.iter().map(|s| s.fitness)
    }

    /// Early-tier fitnesses of the slots that have one.
    pub fn early_fitnesses(&self) -> impl Iterator<Item = f64> + '_ {
        self.slots.iter().filter_map(|s| s.early_fitness)
    }

    /// Snapshot of `(candidate, fitness)` pairs, e.g. for publishing.
    pub fn members(&self) -> Vec<(CandidateRef, f64)> {
        self.slots
            .iter()
            .map(|s| (Arc::clone(&s.candidate), s.fitness))
            .collect()
    }

    /// A uniformly random slot's candidate and fitness.
    pub fn get(&self, rng: &mut RandomSource) -> (CandidateRef, f64) {
        let slot = &self.slots[rng.uniform_index(self.slots.len())];
        (Arc::clone(&slot.candidate), slot.fitness)
    }

    /// Index of the maximum-fitness slot; ties go to the lowest index.
    pub fn best_index(&self) -> usize {
        let mut best: Option<(usize, f64)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            match best {
                Some((_, fitness)) if !beats(slot.fitness, fitness) => {}
                _ => best = Some((index, slot.fitness)),
            }
        }
        best.map(|(index, _)| index)
            .expect("best-index search over an empty population")
    }

    /// Maximum-fitness candidate and its fitness.
    pub fn get_best(&self) -> (CandidateRef, f64) {
        let slot = &self.slots[self.best_index()];
        (Arc::clone(&slot.candidate), slot.fitness)
    }

    /// Sample `k` slots with replacement and return the index of the best.
    ///
    /// Draws exactly `k` indices. Ties go to the first sampled slot.
    pub fn tournament(&self, rng: &mut RandomSource, k: usize, score: TournamentScore) -> usize {
        assert!(k >= 1, "tournament size must be at least 1");
        let mut best: Option<(usize, f64)> = None;
        for _ in 0..k {
            let index = rng.uniform_index(self.slots.len());
            let slot = &self.slots[index];
            let value = match score {
                TournamentScore::Fitness => slot.fitness,
                TournamentScore::FitnessPlusDiversity => slot.fitness + slot.diversity,
            };
            match best {
                Some((_, current)) if !beats(value, current) => {}
                _ => best = Some((index, value)),
            }
        }
        best.map(|(index, _)| index)
            .expect("tournament found no candidate")
    }

    /// Candidate chosen by tournament.
    pub fn best_fitness_tournament(
        &self,
        rng: &mut RandomSource,
        k: usize,
        score: TournamentScore,
    ) -> CandidateRef {
        Arc::clone(&self.slots[self.tournament(rng, k, score)].candidate)
    }
}
