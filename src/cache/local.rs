//! Scope-local first tier.
//!
//! Each request or task gets its own [`LocalStore`] through
//! `tokio::task_local!`, so concurrent scopes never share entries and no
//! locking is needed. Outside a scope there is no store: reads see nothing and
//! writes are dropped.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;

use tracing::warn;

use super::external::CacheValue;

tokio::task_local! {
    static LOCAL_STORE: RefCell<LocalStore>;
}

/// Key/value entries for one scope plus the scope's override flag.
///
/// The `force_external_cache_miss` flag is control state, kept apart from the
/// cached entries so no cache key can shadow it.
#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    entries: HashMap<String, CacheValue>,
    force_external_cache_miss: bool,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_force_external_cache_miss(force: bool) -> Self {
        Self {
            entries: HashMap::new(),
            force_external_cache_miss: force,
        }
    }

    pub fn get(&self, key: &str) -> Option<&CacheValue> {
        self.entries.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: CacheValue) {
        self.entries.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn force_external_cache_miss(&self) -> bool {
        self.force_external_cache_miss
    }

    pub fn set_force_external_cache_miss(&mut self, force: bool) {
        self.force_external_cache_miss = force;
    }

    /// Drop every entry and reset the override flag.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.force_external_cache_miss = false;
    }
}

/// Run `f` with `store` installed as the current scope's local tier.
///
/// The store is dropped when `f` completes, panics, or is cancelled.
pub async fn scope<F>(store: LocalStore, f: F) -> F::Output
where
    F: Future,
{
    LOCAL_STORE.scope(RefCell::new(store), f).await
}

/// Whether a scope is active on the current task.
pub fn is_active() -> bool {
    LOCAL_STORE.try_with(|_| ()).is_ok()
}

/// Read the active store. Returns `None` outside a scope.
///
/// The store stays borrowed while `f` runs: cache writes and scope exits made
/// from inside `f` see no store and do nothing.
pub fn inspect<R>(f: impl FnOnce(&LocalStore) -> R) -> Option<R> {
    LOCAL_STORE
        .try_with(|store| store.try_borrow().ok().map(|store| f(&store)))
        .ok()
        .flatten()
}

pub(crate) fn with_active<R>(f: impl FnOnce(&mut LocalStore) -> R) -> Option<R> {
    LOCAL_STORE
        .try_with(|store| match store.try_borrow_mut() {
            Ok(mut store) => Some(f(&mut store)),
            Err(_) => {
                warn!("local cache store already borrowed; skipping re-entrant access");
                None
            }
        })
        .ok()
        .flatten()
}
