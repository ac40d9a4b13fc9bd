//! Scope boundaries for the local tier.
//!
//! The local tier is reset when a request or task starts and again on every
//! way out, successful or not. The incoming parameters decide whether the
//! scope bypasses the external tier on reads.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::hash::BuildHasher;

use tracing::debug;

use super::local::{self, LocalStore};

/// Incoming parameter that forces external cache misses for one scope.
///
/// `?force_external_cache_miss=true` (case-insensitive) enables it; any other
/// value, or no value, leaves it off.
pub const FORCE_EXTERNAL_CACHE_MISS_PARAM: &str = "force_external_cache_miss";

/// String-keyed parameter bag read at scope entry.
pub trait ScopeParams {
    fn param(&self, name: &str) -> Option<&str>;
}

impl<S: BuildHasher> ScopeParams for HashMap<String, String, S> {
    fn param(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl ScopeParams for BTreeMap<String, String> {
    fn param(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Repeated names resolve to the last occurrence.
impl<K, V> ScopeParams for [(K, V)]
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn param(&self, name: &str) -> Option<&str> {
        self.iter()
            .rev()
            .find(|(key, _)| AsRef::<str>::as_ref(key) == name)
            .map(|(_, value)| AsRef::<str>::as_ref(value))
    }
}

impl<K, V> ScopeParams for Vec<(K, V)>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    fn param(&self, name: &str) -> Option<&str> {
        self.as_slice().param(name)
    }
}

impl<P: ScopeParams + ?Sized> ScopeParams for &P {
    fn param(&self, name: &str) -> Option<&str> {
        (**self).param(name)
    }
}

pub fn parse_force_external_cache_miss<P: ScopeParams + ?Sized>(params: &P) -> bool {
    params
        .param(FORCE_EXTERNAL_CACHE_MISS_PARAM)
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

/// Lifecycle hook around one unit of work.
///
/// Hosts either call [`within_scope`](Self::within_scope) / [`run`](Self::run),
/// or drive the three boundary operations themselves and install the store
/// with [`local::scope`](super::local::scope).
#[derive(Debug, Clone, Copy, Default)]
pub struct ScopeBoundaryHook;

impl ScopeBoundaryHook {
    /// Reset the local tier for a new unit of work.
    ///
    /// When a scope is already active its store is cleared in place and takes
    /// the override flag parsed from `params`. The returned store carries the
    /// same state, ready for [`local::scope`](super::local::scope).
    #[must_use]
    pub fn on_scope_enter<P: ScopeParams + ?Sized>(&self, params: &P) -> LocalStore {
        let force = parse_force_external_cache_miss(params);
        let reset = local::with_active(|store| {
            store.clear();
            store.set_force_external_cache_miss(force);
        });
        debug!(
            force_external_cache_miss = force,
            in_place = reset.is_some(),
            "entering cache scope"
        );
        LocalStore::with_force_external_cache_miss(force)
    }

    /// Store for a nested scope; the enclosing store stays untouched.
    fn fresh_store<P: ScopeParams + ?Sized>(&self, params: &P) -> LocalStore {
        let force = parse_force_external_cache_miss(params);
        debug!(force_external_cache_miss = force, "entering cache scope");
        LocalStore::with_force_external_cache_miss(force)
    }

    /// Clear the active local store and hand `result` back untouched.
    pub fn on_scope_exit_success<T>(&self, result: T) -> T {
        let cleared = clear_active();
        debug!(outcome = "success", cleared = ?cleared, "leaving cache scope");
        result
    }

    /// Clear the active local store and hand `error` back for propagation.
    pub fn on_scope_exit_failure<E>(&self, error: E) -> E {
        let cleared = clear_active();
        debug!(outcome = "failure", cleared = ?cleared, "leaving cache scope");
        error
    }

    /// Run `fut` in a fresh scope; `Err` takes the failure exit.
    ///
    /// An enclosing scope is shadowed, not cleared.
    pub async fn within_scope<P, F, T, E>(&self, params: &P, fut: F) -> Result<T, E>
    where
        P: ScopeParams + ?Sized,
        F: Future<Output = Result<T, E>>,
    {
        let store = self.fresh_store(params);
        local::scope(store, async move {
            match fut.await {
                Ok(value) => Ok(self.on_scope_exit_success(value)),
                Err(error) => Err(self.on_scope_exit_failure(error)),
            }
        })
        .await
    }

    /// Run an infallible `fut` in a fresh scope.
    pub async fn run<P, F>(&self, params: &P, fut: F) -> F::Output
    where
        P: ScopeParams + ?Sized,
        F: Future,
    {
        let store = self.fresh_store(params);
        local::scope(store, async move { self.on_scope_exit_success(fut.await) }).await
    }
}

/// Returns the number of entries dropped, or `None` outside a scope.
fn clear_active() -> Option<usize> {
    local::with_active(|store| {
        let dropped = store.len();
        store.clear();
        dropped
    })
}
