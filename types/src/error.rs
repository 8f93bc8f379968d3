//! Catalog validation errors.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog must define exactly {expected} cities, found {found}")]
    CityCount { expected: usize, found: usize },

    #[error("duplicate city name: {0}")]
    DuplicateCity(String),

    #[error("duplicate task id: {0}")]
    DuplicateTask(String),

    #[error("task id must not be empty")]
    EmptyTaskId,
}
