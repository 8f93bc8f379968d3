//! Fundamental types for the VisaRun bingo game.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! user identifiers, reward bundles, per-user progression state, the static
//! task/city catalog, and timestamps.

pub mod catalog;
pub mod error;
pub mod reward;
pub mod state;
pub mod time;
pub mod user;

pub use catalog::{Catalog, TaskDefinition, GRID_SIZE};
pub use error::CatalogError;
pub use reward::Reward;
pub use state::{CityTile, ProgressSummary, TaskMeta, TaskProgress, UserState};
pub use time::Timestamp;
pub use user::UserId;
