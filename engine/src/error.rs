//! Engine errors. All of them leave the user state untouched.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("unknown task: {0}")]
    UnknownTask(String),

    #[error("external check did not pass")]
    CheckFailed,

    #[error("external check unavailable: {0}")]
    CheckUnavailable(String),
}

impl TaskError {
    pub fn code(&self) -> &'static str {
        match self {
            TaskError::UnknownTask(_) => "unknown_task",
            TaskError::CheckFailed => "check_failed",
            TaskError::CheckUnavailable(_) => "check_unavailable",
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CityError {
    #[error("not enough keys to open a city")]
    InsufficientKeys,
}

impl CityError {
    pub fn code(&self) -> &'static str {
        match self {
            CityError::InsufficientKeys => "insufficient_keys",
        }
    }
}
