//! Per-user serialization of quota-affecting operations.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Interval between prunes of idle locks.
const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Registry of one async mutex per user.
///
/// Holding a user's guard makes check-then-act sequences (list, count,
/// upload) atomic with respect to other requests of the same user in this
/// process.
#[derive(Debug, Default)]
pub struct UserLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl UserLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, user_id: &str) -> Arc<Mutex<()>> {
        {
            let read_guard = self.locks.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(lock) = read_guard.get(user_id) {
                return lock.clone();
            }
        }

        let mut write_guard = self.locks.write().unwrap_or_else(PoisonError::into_inner);
        write_guard
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `user_id`'s namespace.
    pub async fn acquire(&self, user_id: &str) -> OwnedMutexGuard<()> {
        self.lock_for(user_id).lock_owned().await
    }

    /// Number of users with a registered lock.
    pub fn len(&self) -> usize {
        self.locks.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no locks are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop locks nobody is holding or waiting on.
    pub fn cleanup(&self) {
        let mut guard = self.locks.write().unwrap_or_else(PoisonError::into_inner);
        guard.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Start a background task to periodically prune idle locks.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(CLEANUP_INTERVAL_SECS)).await;
                self.cleanup();
            }
        });
    }
}
