//! External completion checks (e.g. "is this user subscribed to the channel").

use async_trait::async_trait;
use thiserror::Error;
use visarun_types::UserId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckError {
    #[error("check is not configured: {0}")]
    NotConfigured(String),

    #[error("check could not be performed: {0}")]
    Unavailable(String),
}

/// A capability that answers whether a user satisfied an out-of-band
/// condition.
///
/// `Ok(false)` means the check ran and the user did not pass; any failure to
/// run the check at all must be reported as an error, never as `false`.
#[async_trait]
pub trait ExternalCheck: Send + Sync {
    async fn is_satisfied(&self, user: UserId) -> Result<bool, CheckError>;

    /// Human-readable name for logs.
    fn name(&self) -> &str;
}
