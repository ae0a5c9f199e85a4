//! The single sequential random stream consumed by selection, mutation,
//! archive resampling and migration.

use rand::prelude::*;

/// Seeded random number generator handle.
///
/// The engine owns exactly one of these and passes `&mut` access to every
/// consumer in a fixed order, so a run is reproducible for a given seed.
#[derive(Debug)]
pub struct RandomSource {
    rng: StdRng,
}

impl RandomSource {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Uniform real in `[0, 1)`.
    pub fn uniform_probability(&mut self) -> f64 {
        self.rng.r#gen::<f64>()
    }

    /// Uniform integer in `[0, n)`. Panics if `n == 0`.
    pub fn uniform_index(&mut self, n: usize) -> usize {
        assert!(n > 0, "uniform_index requires a non-empty range");
        self.rng.gen_range(0..n)
    }

    /// Uniform integer in `[lo, hi]`.
    pub fn uniform_between(&mut self, lo: usize, hi: usize) -> usize {
        self.rng.gen_range(lo..=hi)
    }

    /// A fresh seed, e.g. for a derived stream.
    pub fn uniform_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}
