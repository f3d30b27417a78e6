//! Per-session exclusive locks.
//!
//! Writers to the same session queue on a shared async mutex; writers to
//! different sessions never contend. Entries are dropped from the map once
//! the last holder or waiter is gone.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

type LockMap = HashMap<Uuid, Arc<AsyncMutex<()>>>;

/// A registry of per-session locks. Cheap to clone; clones share the map.
#[derive(Debug, Clone, Default)]
pub struct SessionLocks {
    locks: Arc<Mutex<LockMap>>,
}

/// Exclusive access to one session until dropped.
#[derive(Debug)]
pub struct SessionGuard {
    session_id: Uuid,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<Mutex<LockMap>>,
}

impl SessionLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `session_id`.
    pub async fn acquire(&self, session_id: Uuid) -> SessionGuard {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(session_id)
            .or_default()
            .clone();
        let guard = lock.clone().lock_owned().await;
        SessionGuard {
            session_id,
            lock,
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of sessions currently locked or awaited.
    #[must_use]
    pub fn active(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference is the map's, one is ours; anything more is a waiter.
        if Arc::strong_count(&self.lock) <= 2 {
            locks.remove(&self.session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[tokio::test]
    async fn test_same_session_is_exclusive() {
        let locks = SessionLocks::new();
        let session_id = Uuid::new_v4();

        let first = locks.acquire(session_id).await;
        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.acquire(session_id)).await;
        assert!(blocked.is_err());

        drop(first);
        let second = tokio::time::timeout(Duration::from_millis(50), locks.acquire(session_id)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_contend() {
        let locks = SessionLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;

        let b = tokio::time::timeout(Duration::from_millis(50), locks.acquire(Uuid::new_v4())).await;

        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }

    #[tokio::test]
    async fn test_entry_removed_after_last_guard_drops() {
        let locks = SessionLocks::new();
        let guard = locks.acquire(Uuid::new_v4()).await;
        assert_eq!(locks.active(), 1);

        drop(guard);

        assert_eq!(locks.active(), 0);
    }
}
