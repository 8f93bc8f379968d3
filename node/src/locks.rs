//! Per-user mutual exclusion for read-modify-write cycles on user records.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use visarun_types::UserId;

/// Held while a user's record is being read, mutated and written back.
pub type UserGuard = OwnedMutexGuard<()>;

/// Registry of one async mutex per user.
///
/// Guards are owned, so they can be held across `.await` points (the
/// external task check runs while the user's guard is held). Entries are
/// kept for the lifetime of the process, like the records they protect.
#[derive(Default)]
pub struct UserLocks {
    slots: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user: UserId) -> Arc<AsyncMutex<()>> {
        let mut slots = self
            .slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(slots.entry(user).or_default())
    }

    /// Wait for exclusive access to `user`.
    pub async fn lock(&self, user: UserId) -> UserGuard {
        self.slot(user).lock_owned().await
    }

    /// Lock two users in ascending id order.
    ///
    /// Returns the guards in the same order as the arguments. When both ids
    /// are equal only one guard is taken and the second slot is `None`.
    pub async fn lock_pair(&self, a: UserId, b: UserId) -> (UserGuard, Option<UserGuard>) {
        if a == b {
            return (self.lock(a).await, None);
        }
        let (low, high) = if a < b { (a, b) } else { (b, a) };
        let low_guard = self.lock(low).await;
        let high_guard = self.lock(high).await;
        if a < b {
            (low_guard, Some(high_guard))
        } else {
            (high_guard, Some(low_guard))
        }
    }

    /// Number of users that have ever been locked.
    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_user_is_exclusive() {
        let locks = Arc::new(UserLocks::new());
        let user = UserId::new(1);
        let guard = locks.lock(user).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _g = locks.lock(user).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_users_do_not_block() {
        let locks = UserLocks::new();
        let _a = locks.lock(UserId::new(1)).await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.lock(UserId::new(2)))
            .await
            .expect("distinct users must not contend");
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn pair_with_equal_ids_takes_one_guard() {
        let locks = UserLocks::new();
        let (_first, second) = locks.lock_pair(UserId::new(5), UserId::new(5)).await;
        assert!(second.is_none());
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn opposite_order_pairs_do_not_deadlock() {
        let locks = Arc::new(UserLocks::new());
        let mut handles = Vec::new();
        for i in 0..50 {
            let locks = Arc::clone(&locks);
            handles.push(tokio::spawn(async move {
                let (a, b) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
                let _guards = locks.lock_pair(UserId::new(a), UserId::new(b)).await;
                tokio::task::yield_now().await;
            }));
        }
        let all = async {
            for h in handles {
                h.await.unwrap();
            }
        };
        tokio::time::timeout(Duration::from_secs(5), all)
            .await
            .expect("lock_pair deadlocked");
    }
}
