//! Map-elites archive: best known candidate per discretised feature cell.

use std::sync::Arc;

use log::debug;

use crate::schema::{CandidateRef, EvolutionConfigError, validate_grid};

use super::diversity::Features;
use super::population::{Population, beats};
use super::random::RandomSource;

/// Occupant of an archive cell.
#[derive(Debug, Clone)]
pub struct Elite {
    pub candidate: CandidateRef,
    pub fitness: f64,
}

/// Fixed-size k-dimensional grid of elites, stored row-major.
#[derive(Debug, Clone)]
pub struct MapElitesArchive {
    dims: Vec<usize>,
    cells: Vec<Option<Elite>>,
}

/// What happened to one population slot during [`MapElitesArchive::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveUpdate {
    /// Candidates that took over a cell.
    pub accepted: usize,
    /// Candidates discarded and replaced by a resampled elite.
    pub resampled: usize,
    /// Rejected candidates left in place because the archive had no elite to copy.
    pub kept: usize,
}

impl MapElitesArchive {
    /// Create an empty archive with the given per-dimension sizes.
    pub fn new(dims: &[usize]) -> Result<Self, EvolutionConfigError> {
        validate_grid(dims)?;
        let capacity = dims.iter().product();
        Ok(Self {
            dims: dims.to_vec(),
            cells: vec![None; capacity],
        })
    }

    /// Per-dimension sizes, major axis first.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Number of cells.
    pub fn capacity(&self) -> usize {
        self.cells.len()
    }

    /// Number of occupied cells.
    pub fn occupied(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Occupant of a cell, if any.
    pub fn cell(&self, index: usize) -> Option<&Elite> {
        self.cells[index].as_ref()
    }

    /// Mixed-radix cell index. Coordinates past the edge land in the last cell
    /// of their dimension.
    pub fn cell_index(&self, coords: &[usize]) -> usize {
        debug_assert_eq!(coords.len(), self.dims.len());
        coords
            .iter()
            .zip(&self.dims)
            .fold(0, |index, (&c, &d)| index * d + c.min(d - 1))
    }

    /// Cell for a candidate's features: `vars` is the major axis, `ops` the minor.
    pub fn index_of(&self, features: Features) -> usize {
        self.cell_index(&[features.vars, features.ops])
    }

    /// Offer a candidate to a cell. The incoming candidate wins when its
    /// fitness is at least the occupant's; empty cells count as fitness 0.
    pub fn offer(&mut self, index: usize, candidate: CandidateRef, fitness: f64) -> bool {
        let cell = &mut self.cells[index];
        let accept = match cell {
            None => fitness >= 0.0,
            Some(elite) => !beats(elite.fitness, fitness),
        };
        if accept {
            *cell = Some(Elite { candidate, fitness });
        }
        accept
    }

    /// Uniformly sample cells until an occupied one turns up.
    ///
    /// Returns `None` for an empty archive instead of sampling forever.
    pub fn sample_occupied(&self, rng: &mut RandomSource) -> Option<&Elite> {
        if self.cells.iter().all(|c| c.is_none()) {
            return None;
        }
        loop {
            if let Some(elite) = &self.cells[rng.uniform_index(self.cells.len())] {
                return Some(elite);
            }
        }
    }

    /// Push the population through the archive.
    ///
    /// Every slot is offered to its cell in index order; slots that lose are
    /// then refilled, in index order, with a copy of a randomly sampled elite.
    /// While the archive is still empty a losing slot keeps its candidate.
    pub fn apply(&mut self, population: &mut Population, rng: &mut RandomSource) -> ArchiveUpdate {
        let mut discarded = Vec::new();
        for index in 0..population.len() {
            let slot = population.slot(index);
            let cell = self.index_of(Features::of(&slot.candidate));
            if !self.offer(cell, Arc::clone(&slot.candidate), slot.fitness) {
                discarded.push(index);
            }
        }

        let mut update = ArchiveUpdate {
            accepted: population.len() - discarded.len(),
            ..Default::default()
        };
        for &index in &discarded {
            match self.sample_occupied(rng) {
                Some(elite) => {
                    population.replace(index, Arc::clone(&elite.candidate), elite.fitness, None);
                    update.resampled += 1;
                }
                None => {
                    debug!("archive empty, slot {} keeps its rejected candidate", index);
                    update.kept += 1;
                }
            }
        }
        update
    }
}
