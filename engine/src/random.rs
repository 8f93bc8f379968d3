//! Randomness source for city selection.

use rand::Rng;

/// Supplies uniform indices for the engine's only non-deterministic step.
pub trait RandomSource: Send + Sync {
    /// Return a uniformly distributed index in `0..upper`. `upper` is never 0.
    fn pick(&self, upper: usize) -> usize;
}

/// Thread-local CSPRNG from `rand`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}
