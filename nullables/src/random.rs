//! Nullable random: deterministic index selection.

use std::sync::Mutex;
use visarun_engine::RandomSource;

/// A deterministic randomness source for testing.
///
/// Returns pre-configured picks in order, cycling when exhausted. Each pick
/// is reduced modulo the requested bound so scripts stay valid as the set of
/// hidden cities shrinks.
pub struct NullRandom {
    picks: Vec<usize>,
    index: Mutex<usize>,
}

impl NullRandom {
    /// Create with a sequence of deterministic picks.
    pub fn new(picks: Vec<usize>) -> Self {
        assert!(!picks.is_empty(), "NullRandom needs at least one pick");
        Self {
            picks,
            index: Mutex::new(0),
        }
    }

    /// Create with a single pick returned for every call.
    pub fn constant(pick: usize) -> Self {
        Self::new(vec![pick])
    }

    /// Number of picks handed out so far.
    pub fn calls(&self) -> usize {
        *self.index.lock().unwrap()
    }
}

impl RandomSource for NullRandom {
    fn pick(&self, upper: usize) -> usize {
        let mut idx = self.index.lock().unwrap();
        let current = self.picks[*idx % self.picks.len()];
        *idx += 1;
        current % upper
    }
}
