//! Nullable external check: scripted answers with call counting.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use visarun_engine::{CheckError, ExternalCheck};
use visarun_types::UserId;

/// An external check that answers from a script instead of the network.
pub struct NullCheck {
    answer: Mutex<Result<bool, CheckError>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl NullCheck {
    fn with_answer(answer: Result<bool, CheckError>) -> Self {
        Self {
            answer: Mutex::new(answer),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Every user passes.
    pub fn passing() -> Self {
        Self::with_answer(Ok(true))
    }

    /// Every user fails.
    pub fn failing() -> Self {
        Self::with_answer(Ok(false))
    }

    /// The check cannot run because it lacks configuration.
    pub fn unconfigured() -> Self {
        Self::with_answer(Err(CheckError::NotConfigured("null check".into())))
    }

    /// The check cannot reach its backend.
    pub fn unavailable() -> Self {
        Self::with_answer(Err(CheckError::Unavailable("null backend down".into())))
    }

    /// Sleep before answering, to exercise timeouts.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Change the scripted answer.
    pub fn set_answer(&self, answer: Result<bool, CheckError>) {
        *self.answer.lock().unwrap() = answer;
    }

    /// How many times the check has been invoked.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExternalCheck for NullCheck {
    async fn is_satisfied(&self, _user: UserId) -> Result<bool, CheckError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.answer.lock().unwrap().clone()
    }

    fn name(&self) -> &str {
        "null-check"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn answers_from_script() {
        let check = NullCheck::failing();
        assert_eq!(check.is_satisfied(UserId::new(1)).await, Ok(false));
        check.set_answer(Ok(true));
        assert_eq!(check.is_satisfied(UserId::new(1)).await, Ok(true));
        assert_eq!(check.calls(), 2);
    }

    #[tokio::test]
    async fn unconfigured_reports_error() {
        let check = NullCheck::unconfigured();
        assert!(matches!(
            check.is_satisfied(UserId::new(1)).await,
            Err(CheckError::NotConfigured(_))
        ));
    }
}
