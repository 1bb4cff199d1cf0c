//! Lock Manager
//!
//! Per-key exclusive locks with a time-to-live. Acquisition never waits:
//! a held, unexpired key simply reports `false` and the caller decides
//! whether to retry. Expired entries are reclaimed on the next acquire of
//! the same key or by the periodic sweep in [`crate::jobs`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::domain::CancellationSignal;

use super::LockError;

#[derive(Debug, Clone, Copy)]
struct LockEntry {
    owner: Uuid,
    expires_at: Instant,
}

impl LockEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}

/// TTL lock table keyed by resource id
#[derive(Debug, Default)]
pub struct LockManager {
    locks: Mutex<HashMap<String, LockEntry>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the table. A panic while holding the mutex leaves the map
    /// consistent (every critical section is a single map operation), so a
    /// poisoned lock is recovered rather than propagated.
    fn table(&self) -> MutexGuard<'_, HashMap<String, LockEntry>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Acquisition
    // =========================================================================

    /// Try to take the lock on `key` for `ttl`.
    ///
    /// Returns `Ok(false)` when another holder has an unexpired lock.
    pub fn acquire(
        &self,
        key: &str,
        ttl: Duration,
        cancel: &CancellationSignal,
    ) -> Result<bool, LockError> {
        Ok(self.acquire_owned(key, ttl, cancel)?.is_some())
    }

    /// Like [`acquire`](Self::acquire), returning the owner token on success
    pub fn acquire_owned(
        &self,
        key: &str,
        ttl: Duration,
        cancel: &CancellationSignal,
    ) -> Result<Option<Uuid>, LockError> {
        if cancel.is_cancelled() {
            return Err(LockError::Cancelled(key.to_string()));
        }

        let now = Instant::now();
        let mut table = self.table();

        if let Some(entry) = table.get(key) {
            if !entry.is_expired(now) {
                tracing::trace!(key, "Lock held by another owner");
                return Ok(None);
            }
            tracing::debug!(key, "Reclaiming expired lock");
        }

        let owner = Uuid::new_v4();
        table.insert(
            key.to_string(),
            LockEntry {
                owner,
                expires_at: now + ttl,
            },
        );
        tracing::trace!(key, %owner, ttl_ms = ttl.as_millis() as u64, "Lock acquired");

        Ok(Some(owner))
    }

    /// Scoped acquisition; the returned guard releases the lock when dropped
    pub fn try_lock(
        self: &Arc<Self>,
        key: &str,
        ttl: Duration,
        cancel: &CancellationSignal,
    ) -> Result<Option<LockGuard>, LockError> {
        Ok(self.acquire_owned(key, ttl, cancel)?.map(|owner| LockGuard {
            manager: Arc::clone(self),
            key: key.to_string(),
            owner,
        }))
    }

    // =========================================================================
    // Release & refresh
    // =========================================================================

    /// Remove the lock on `key` regardless of owner. Idempotent.
    pub fn release(&self, key: &str) {
        self.table().remove(key);
    }

    /// Remove the lock on `key` only if `owner` still holds it
    pub fn release_if_owner(&self, key: &str, owner: Uuid) -> bool {
        let mut table = self.table();
        match table.get(key) {
            Some(entry) if entry.owner == owner => {
                table.remove(key);
                true
            }
            _ => false,
        }
    }

    /// Push the expiry of an existing lock to `now + ttl`.
    /// Returns `false` when no lock is present.
    pub fn refresh(&self, key: &str, ttl: Duration) -> bool {
        match self.table().get_mut(key) {
            Some(entry) => {
                entry.expires_at = Instant::now() + ttl;
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Maintenance & inspection
    // =========================================================================

    /// Drop every expired entry, returning how many were removed
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut table = self.table();
        let before = table.len();
        table.retain(|_, entry| !entry.is_expired(now));
        before - table.len()
    }

    /// Whether `key` currently has an unexpired lock
    pub fn is_locked(&self, key: &str) -> bool {
        let now = Instant::now();
        self.table()
            .get(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Number of entries in the table, including expired ones not yet swept
    pub fn active_locks(&self) -> usize {
        self.table().len()
    }
}

/// Held lock; released (owner-checked) when dropped
#[derive(Debug)]
pub struct LockGuard {
    manager: Arc<LockManager>,
    key: String,
    owner: Uuid,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn owner(&self) -> Uuid {
        self.owner
    }

    /// Extend the lock while it is still ours
    pub fn refresh(&self, ttl: Duration) -> bool {
        let mut table = self.manager.table();
        match table.get_mut(&self.key) {
            Some(entry) if entry.owner == self.owner => {
                entry.expires_at = Instant::now() + ttl;
                true
            }
            _ => false,
        }
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // After a TTL lapse someone else may own the key now
        if !self.manager.release_if_owner(&self.key, self.owner) {
            tracing::warn!(key = %self.key, "Lock expired before release");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(10);

    fn live() -> CancellationSignal {
        CancellationSignal::new()
    }

    #[test]
    fn test_acquire_is_exclusive() {
        let manager = LockManager::new();

        assert_eq!(manager.acquire("product:1", TTL, &live()), Ok(true));
        assert_eq!(manager.acquire("product:1", TTL, &live()), Ok(false));
        assert_eq!(manager.acquire("product:2", TTL, &live()), Ok(true));
        assert!(manager.is_locked("product:1"));
        assert_eq!(manager.active_locks(), 2);
    }

    #[test]
    fn test_release_is_idempotent() {
        let manager = LockManager::new();
        manager.acquire("product:1", TTL, &live()).unwrap();

        manager.release("product:1");
        manager.release("product:1");
        manager.release("product:never");

        assert!(!manager.is_locked("product:1"));
        assert_eq!(manager.acquire("product:1", TTL, &live()), Ok(true));
    }

    #[test]
    fn test_cancelled_acquire_fails() {
        let manager = LockManager::new();
        let cancel = CancellationSignal::new();
        cancel.cancel();

        assert_eq!(
            manager.acquire("product:1", TTL, &cancel),
            Err(LockError::Cancelled("product:1".to_string()))
        );
        assert!(!manager.is_locked("product:1"));
    }

    #[test]
    fn test_release_if_owner() {
        let manager = LockManager::new();
        let owner = manager
            .acquire_owned("product:1", TTL, &live())
            .unwrap()
            .unwrap();

        assert!(!manager.release_if_owner("product:1", Uuid::new_v4()));
        assert!(manager.is_locked("product:1"));
        assert!(manager.release_if_owner("product:1", owner));
        assert!(!manager.is_locked("product:1"));
    }

    #[test]
    fn test_refresh_requires_existing_lock() {
        let manager = LockManager::new();
        assert!(!manager.refresh("product:1", TTL));

        manager.acquire("product:1", TTL, &live()).unwrap();
        assert!(manager.refresh("product:1", TTL));
    }

    #[tokio::test]
    async fn test_expired_lock_can_be_reacquired() {
        let manager = LockManager::new();

        assert_eq!(
            manager.acquire("product:1", Duration::from_millis(100), &live()),
            Ok(true)
        );
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!manager.is_locked("product:1"));
        assert_eq!(manager.acquire("product:1", TTL, &live()), Ok(true));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_extends_expiry() {
        let manager = LockManager::new();
        manager
            .acquire("product:1", Duration::from_millis(100), &live())
            .unwrap();

        tokio::time::advance(Duration::from_millis(80)).await;
        assert!(manager.refresh("product:1", Duration::from_millis(100)));
        tokio::time::advance(Duration::from_millis(80)).await;

        assert!(manager.is_locked("product:1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let manager = LockManager::new();
        manager
            .acquire("product:short", Duration::from_millis(50), &live())
            .unwrap();
        manager.acquire("product:long", TTL, &live()).unwrap();

        tokio::time::advance(Duration::from_millis(100)).await;

        assert_eq!(manager.sweep_expired(), 1);
        assert_eq!(manager.active_locks(), 1);
        assert!(manager.is_locked("product:long"));
        assert_eq!(manager.sweep_expired(), 0);
    }

    #[test]
    fn test_guard_releases_on_drop() {
        let manager = Arc::new(LockManager::new());
        {
            let guard = manager.try_lock("product:1", TTL, &live()).unwrap().unwrap();
            assert_eq!(guard.key(), "product:1");
            assert!(manager.try_lock("product:1", TTL, &live()).unwrap().is_none());
        }
        assert!(!manager.is_locked("product:1"));
    }

    #[test]
    fn test_guard_releases_on_error_path() {
        fn failing(manager: &Arc<LockManager>) -> Result<(), String> {
            let _guard = manager
                .try_lock("product:1", TTL, &CancellationSignal::new())
                .map_err(|e| e.to_string())?
                .ok_or("contended")?;
            Err("validation failed".to_string())
        }

        let manager = Arc::new(LockManager::new());
        assert!(failing(&manager).is_err());
        assert!(!manager.is_locked("product:1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_guard_does_not_release_new_owner() {
        let manager = Arc::new(LockManager::new());
        let stale = manager
            .try_lock("product:1", Duration::from_millis(50), &live())
            .unwrap()
            .unwrap();

        tokio::time::advance(Duration::from_millis(100)).await;
        let fresh = manager.try_lock("product:1", TTL, &live()).unwrap().unwrap();

        assert!(!stale.refresh(TTL));
        drop(stale);
        assert!(manager.is_locked("product:1"));
        assert!(fresh.refresh(TTL));
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let manager = Arc::new(LockManager::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let manager = Arc::clone(&manager);
                std::thread::spawn(move || {
                    manager
                        .acquire("product:hot", TTL, &CancellationSignal::new())
                        .unwrap()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
