//! Nullable infrastructure for deterministic testing.
//!
//! The engine's non-deterministic dependencies (randomness, external checks)
//! are abstracted behind traits. This crate provides test-friendly
//! implementations that:
//! - Return scripted values
//! - Record how often they were called
//! - Never touch the network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod check;
pub mod random;

pub use check::NullCheck;
pub use random::NullRandom;
