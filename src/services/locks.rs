//! Per-account critical sections.
//!
//! Every read-check-write on an account balance happens while holding that
//! account's lock. Operations touching several accounts take the locks in
//! ascending id order, so two transfers in opposite directions between the
//! same pair of accounts cannot deadlock.
//!
//! A mutex lives in the map only while some task holds or waits for it.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = DashMap<Uuid, Arc<Mutex<()>>>;

#[derive(Default)]
pub struct AccountLocks {
    locks: Arc<LockMap>,
}

/// Held locks; released on drop.
#[must_use = "the accounts are unlocked as soon as the guard is dropped"]
pub struct AccountGuard {
    locks: Arc<LockMap>,
    guards: Vec<(Uuid, OwnedMutexGuard<()>)>,
}

impl Drop for AccountGuard {
    fn drop(&mut self) {
        for (account_id, guard) in self.guards.drain(..) {
            drop(guard);
            // Cloning a mutex out of the map happens under the same shard
            // lock, so a count of one means nobody holds or awaits it.
            self.locks
                .remove_if(&account_id, |_, mutex| Arc::strong_count(mutex) == 1);
        }
    }
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, account_id: Uuid) -> AccountGuard {
        self.lock_all(&[account_id]).await
    }

    /// Lock every account in `account_ids`, in ascending id order.
    /// Duplicates are locked once.
    pub async fn lock_all(&self, account_ids: &[Uuid]) -> AccountGuard {
        let mut ordered = account_ids.to_vec();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for account_id in ordered {
            // Clone the mutex out so the map shard is not held across the await
            let mutex = self.locks.entry(account_id).or_default().clone();
            guards.push((account_id, mutex.lock_owned().await));
            tracing::debug!(%account_id, "account lock acquired");
        }

        AccountGuard {
            locks: self.locks.clone(),
            guards,
        }
    }

    /// Accounts with a live mutex.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
