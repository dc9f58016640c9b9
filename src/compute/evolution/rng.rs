//! Random generation and mutation of candidate configurations.

use rand::prelude::*;

use crate::schema::{
    Individual, MIN_BATCH_SIZE, MIN_MICRO_BATCH_SIZE, MIN_STREAMING_THRESHOLD,
};

/// Initialization range for `batch_size`.
const BATCH_SIZE_INIT: (u32, u32) = (1_000, 100_000);
/// Discrete candidate set for `micro_batch_size`.
const MICRO_BATCH_CANDIDATES: [u32; 8] = [64, 128, 256, 512, 1_024, 2_048, 4_096, 8_192];
/// Initialization range for `streaming_threshold`.
const STREAMING_INIT: (u32, u32) = (5_000, 50_000);

/// Mutation delta bound for `batch_size` and `streaming_threshold`.
const COARSE_DELTA: i64 = 5_000;
/// Mutation delta bound for `micro_batch_size`.
const MICRO_DELTA: i64 = 1_024;

/// Random number generator wrapper for candidate operations.
pub struct TunerRng {
    rng: StdRng,
}

impl TunerRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with an entropy seed.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Generate a random unevaluated individual.
    pub fn random_individual(&mut self) -> Individual {
        Individual {
            batch_size: self.rng.gen_range(BATCH_SIZE_INIT.0..=BATCH_SIZE_INIT.1),
            micro_batch_size: *MICRO_BATCH_CANDIDATES
                .choose(&mut self.rng)
                .unwrap_or(&MICRO_BATCH_CANDIDATES[0]),
            streaming_threshold: self.rng.gen_range(STREAMING_INIT.0..=STREAMING_INIT.1),
            fitness: 0.0,
        }
    }

    /// Create a mutated child of `parent`.
    ///
    /// Each field gets a bounded uniform perturbation and is re-clamped to
    /// its minimum; the child's fitness is reset until re-evaluated.
    pub fn mutate(&mut self, parent: &Individual) -> Individual {
        Individual {
            batch_size: self.perturb(parent.batch_size, COARSE_DELTA, MIN_BATCH_SIZE),
            micro_batch_size: self.perturb(parent.micro_batch_size, MICRO_DELTA, MIN_MICRO_BATCH_SIZE),
            streaming_threshold: self.perturb(
                parent.streaming_threshold,
                COARSE_DELTA,
                MIN_STREAMING_THRESHOLD,
            ),
            fitness: 0.0,
        }
    }

    /// Pick a uniformly random element.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.rng)
    }

    fn perturb(&mut self, value: u32, delta: i64, min: u32) -> u32 {
        let jitter = self.rng.gen_range(-delta..=delta);
        // Clamp both ends: the low end enforces the field minimum, the high
        // end keeps a near-u32::MAX parent from wrapping through the cast.
        (value as i64 + jitter).clamp(min as i64, u32::MAX as i64) as u32
    }
}
