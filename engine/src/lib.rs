//! Reward engine: the state transitions of the game.
//!
//! Three transitions, each idempotent against replay of an already-applied
//! effect:
//! - task completion (optionally gated on an external check)
//! - random city reveal (spends one key, earns one ticket)
//! - referral credit
//!
//! The engine never touches storage. Randomness and the external check are
//! injected so every transition is deterministic under test.

pub mod check;
pub mod engine;
pub mod error;
pub mod random;

pub use check::{CheckError, ExternalCheck};
pub use engine::{CityOutcome, RewardEngine, TaskOutcome, DEFAULT_CHECK_TIMEOUT};
pub use error::{CityError, TaskError};
pub use random::{RandomSource, ThreadRandom};
