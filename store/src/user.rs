//! User state storage trait.

use crate::StoreError;
use visarun_types::{UserId, UserState};

/// Keyed mapping from user id to progression record.
///
/// Callers serialize read-modify-write cycles per user themselves; a store
/// only has to make each individual call atomic.
pub trait UserStore: Send + Sync {
    /// Return the stored record, or create, persist and return a fresh one
    /// built from the catalog.
    fn get_or_create(&self, user: UserId) -> Result<UserState, StoreError>;

    /// Replace the record for `state.user_id()`.
    fn put(&self, state: &UserState) -> Result<(), StoreError>;

    /// Whether a record exists for `user`.
    fn exists(&self, user: UserId) -> Result<bool, StoreError>;

    /// Number of stored records.
    fn user_count(&self) -> Result<u64, StoreError>;
}
