//! Unix-seconds timestamps for init-data freshness.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch. The default is zero, which is what a
/// payload without `auth_date` counts as.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Wall clock; a clock before 1970 reads as zero.
    pub fn now() -> Self {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| Self(d.as_secs()))
            .unwrap_or_default()
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Age of this timestamp at `now`; zero for timestamps in the future.
    pub fn age_at(&self, now: Timestamp) -> u64 {
        now.0.saturating_sub(self.0)
    }

    /// Strictly more than `max_age_secs` old at `now`. A payload exactly
    /// `max_age_secs` old is still fresh.
    pub fn is_older_than(&self, max_age_secs: u64, now: Timestamp) -> bool {
        self.age_at(now) > max_age_secs
    }
}
