//! In-memory user store. Records live for the lifetime of the process.

use crate::{StoreError, UserStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use visarun_types::{Catalog, UserId, UserState};

/// Thread-safe `HashMap`-backed store seeded from a shared catalog.
pub struct MemoryUserStore {
    catalog: Arc<Catalog>,
    users: Mutex<HashMap<UserId, UserState>>,
}

impl MemoryUserStore {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            users: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch a record without creating it.
    pub fn get(&self, user: UserId) -> Result<UserState, StoreError> {
        self.lock()?
            .get(&user)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(user.to_string()))
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<UserId, UserState>>, StoreError> {
        self.users
            .lock()
            .map_err(|_| StoreError::Backend("user map mutex poisoned".into()))
    }
}

impl UserStore for MemoryUserStore {
    fn get_or_create(&self, user: UserId) -> Result<UserState, StoreError> {
        let mut users = self.lock()?;
        let state = users.entry(user).or_insert_with(|| {
            tracing::debug!(%user, "creating user record");
            self.catalog.new_user(user)
        });
        Ok(state.clone())
    }

    fn put(&self, state: &UserState) -> Result<(), StoreError> {
        self.lock()?.insert(state.user_id(), state.clone());
        Ok(())
    }

    fn exists(&self, user: UserId) -> Result<bool, StoreError> {
        Ok(self.lock()?.contains_key(&user))
    }

    fn user_count(&self) -> Result<u64, StoreError> {
        Ok(self.lock()?.len() as u64)
    }
}
