//! Per-scope serialization of graph updates.
//!
//! Graph updates are read-modify-write sequences over the nodes of one
//! `(owner, genre)` scope. [`ScopeLocks`] hands out one mutex per scope so
//! updates within a scope run one at a time while updates to unrelated
//! scopes proceed in parallel.
//!
//! Entries are created on first use and dropped by [`ScopeLocks::evict`]
//! once a scope has been purged, so the registry is bounded by the number
//! of live `(owner, genre)` scopes.

use crate::models::{GenreId, UserId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

type ScopeKey = (UserId, GenreId);

/// Registry of per-`(owner, genre)` locks.
///
/// The registry mutex is only held while looking up a scope's lock,
/// never while the scope's work runs.
#[derive(Debug, Default)]
pub struct ScopeLocks {
    locks: Mutex<HashMap<ScopeKey, Arc<Mutex<()>>>>,
}

impl ScopeLocks {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` while holding the lock for `(owner, genre)`.
    ///
    /// A poisoned scope lock is recovered: the protected data lives in
    /// storage, not in the mutex.
    pub fn with_scope<T>(&self, owner: &UserId, genre: &GenreId, f: impl FnOnce() -> T) -> T {
        let scope = self.scope_lock(owner, genre);
        let _guard = scope.lock().unwrap_or_else(PoisonError::into_inner);
        f()
    }

    /// Drops the lock for `(owner, genre)` if no caller holds or waits on it.
    ///
    /// Returns true if the entry was removed. Lock handles are only cloned
    /// under the registry mutex, so a handle count of one observed here
    /// cannot grow before the entry is gone.
    pub fn evict(&self, owner: &UserId, genre: &GenreId) -> bool {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let key = (owner.clone(), genre.clone());
        let idle = locks
            .get(&key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            locks.remove(&key);
        }
        idle
    }

    /// Number of scopes currently registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true if no scope has been locked yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn scope_lock(&self, owner: &UserId, genre: &GenreId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            locks
                .entry((owner.clone(), genre.clone()))
                .or_default(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_same_scope_is_serialized() {
        let locks = Arc::new(ScopeLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    locks.with_scope(&UserId::new("u1"), &GenreId::new("g1"), || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_distinct_scopes_get_distinct_locks() {
        let locks = ScopeLocks::new();
        let u1 = UserId::new("u1");
        let (g1, g2) = (GenreId::new("g1"), GenreId::new("g2"));

        // Nested acquisition of a different scope must not deadlock.
        let value = locks.with_scope(&u1, &g1, || locks.with_scope(&u1, &g2, || 42));
        assert_eq!(value, 42);
        assert_eq!(locks.len(), 2);
    }

    #[test]
    fn test_evict_skips_held_scope() {
        let locks = ScopeLocks::new();
        let (u1, g1) = (UserId::new("u1"), GenreId::new("g1"));

        let evicted_while_held = locks.with_scope(&u1, &g1, || locks.evict(&u1, &g1));
        assert!(!evicted_while_held);
        assert_eq!(locks.len(), 1);

        assert!(locks.evict(&u1, &g1));
        assert!(locks.is_empty());
        assert!(!locks.evict(&u1, &g1));
    }

    #[test]
    #[allow(clippy::panic)]
    fn test_recovers_from_panicked_scope() {
        let locks = Arc::new(ScopeLocks::new());
        let poisoner = Arc::clone(&locks);
        let _ = thread::spawn(move || {
            poisoner.with_scope(&UserId::new("u1"), &GenreId::new("g1"), || {
                panic!("poison the scope");
            });
        })
        .join();

        let ran = locks.with_scope(&UserId::new("u1"), &GenreId::new("g1"), || true);
        assert!(ran);
    }
}
