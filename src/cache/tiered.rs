//! Read-through / write-through façade over both tiers.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, trace};

use super::cached::Cached;
use super::error::BackendError;
use super::external::{CacheValue, ExternalCache, ExternalTtl};
use super::local;

const METRIC_LOCAL_HIT_TOTAL: &str = "tiercache_local_hit_total";
const METRIC_EXTERNAL_HIT_TOTAL: &str = "tiercache_external_hit_total";
const METRIC_EXTERNAL_MISS_TOTAL: &str = "tiercache_external_miss_total";
const METRIC_FORCED_MISS_TOTAL: &str = "tiercache_forced_miss_total";
const METRIC_EXTERNAL_SET_TOTAL: &str = "tiercache_external_set_total";

/// Two-tier cache: the current scope's [`LocalStore`](super::LocalStore) in
/// front of a shared [`ExternalCache`].
///
/// Treat keys as a global namespace. The local tier lives for one scope and
/// ignores timeouts; the external tier applies them. A zero timeout therefore
/// caches a value for the rest of the scope only.
///
/// Cloning is cheap; clones share the external backend.
pub struct TieredCache<E: ?Sized> {
    external: Arc<E>,
}

impl<E: ?Sized> Clone for TieredCache<E> {
    fn clone(&self) -> Self {
        Self {
            external: Arc::clone(&self.external),
        }
    }
}

impl<E: ExternalCache> TieredCache<E> {
    pub fn new(external: E) -> Self {
        Self {
            external: Arc::new(external),
        }
    }
}

impl<E: ExternalCache + ?Sized> TieredCache<E> {
    pub fn from_arc(external: Arc<E>) -> Self {
        Self { external }
    }

    pub fn external(&self) -> &E {
        &self.external
    }

    /// Look `key` up in the local tier, then the external tier.
    ///
    /// External hits are mirrored into the local tier. External misses are
    /// not remembered, so a later call in the same scope asks again. When the
    /// scope forces external misses, the external tier is never consulted.
    pub async fn get_or_miss(&self, key: &str) -> Result<Cached<CacheValue>, BackendError> {
        if let Some(value) = local::with_active(|store| store.get(key).cloned()).flatten() {
            debug!(cache = "local", outcome = "hit", key, "serving scope-local value");
            counter!(METRIC_LOCAL_HIT_TOTAL).increment(1);
            return Ok(Cached::Hit(value));
        }

        if self.force_external_cache_miss() {
            debug!(
                cache = "external",
                outcome = "forced_miss",
                key,
                "external tier bypassed for this scope"
            );
            counter!(METRIC_FORCED_MISS_TOTAL).increment(1);
            return Ok(Cached::Miss);
        }

        match self.external.get(key).await? {
            Some(value) => {
                debug!(
                    cache = "external",
                    outcome = "hit",
                    backend = self.external.name(),
                    key,
                    "mirroring external value"
                );
                counter!(METRIC_EXTERNAL_HIT_TOTAL).increment(1);
                if local::with_active(|store| store.insert(key, value.clone())).is_none() {
                    trace!(key, "no active cache scope; external hit not mirrored");
                }
                Ok(Cached::Hit(value))
            }
            None => {
                debug!(
                    cache = "external",
                    outcome = "miss",
                    backend = self.external.name(),
                    key,
                    "cache miss"
                );
                counter!(METRIC_EXTERNAL_MISS_TOTAL).increment(1);
                Ok(Cached::Miss)
            }
        }
    }

    /// Store `value` in the local tier and forward it to the external tier
    /// with `external_ttl`.
    ///
    /// The local write happens first and stays in place if the backend fails.
    pub async fn set_all_tiers(
        &self,
        key: &str,
        value: CacheValue,
        external_ttl: ExternalTtl,
    ) -> Result<(), BackendError> {
        if local::with_active(|store| store.insert(key, value.clone())).is_none() {
            trace!(key, "no active cache scope; writing external tier only");
        }

        debug!(
            cache = "external",
            op = "set",
            backend = self.external.name(),
            ephemeral = external_ttl.is_ephemeral(),
            key,
            "writing all tiers"
        );
        counter!(METRIC_EXTERNAL_SET_TOTAL).increment(1);
        self.external.set(key, value, external_ttl).await
    }

    /// [`set_all_tiers`](Self::set_all_tiers) with the backend's default timeout.
    pub async fn set_all_tiers_default(
        &self,
        key: &str,
        value: CacheValue,
    ) -> Result<(), BackendError> {
        self.set_all_tiers(key, value, ExternalTtl::BackendDefault).await
    }

    /// The current scope's override flag; `false` outside a scope.
    pub(crate) fn force_external_cache_miss(&self) -> bool {
        local::with_active(|store| store.force_external_cache_miss()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::cache::{CacheConfig, LocalStore, MemoryCache};

    /// Memory backend that counts calls and can be told to fail.
    struct Recording {
        inner: MemoryCache,
        gets: AtomicUsize,
        sets: Mutex<Vec<(String, CacheValue, ExternalTtl)>>,
        fail: bool,
    }

    impl Recording {
        fn new() -> Self {
            Self {
                inner: MemoryCache::new(&CacheConfig::default()),
                gets: AtomicUsize::new(0),
                sets: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        fn gets(&self) -> usize {
            self.gets.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ExternalCache for Recording {
        async fn get(&self, key: &str) -> Result<Option<CacheValue>, BackendError> {
            self.gets.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(BackendError::get("recording", "backend down"));
            }
            self.inner.get(key).await
        }

        async fn set(
            &self,
            key: &str,
            value: CacheValue,
            ttl: ExternalTtl,
        ) -> Result<(), BackendError> {
            self.sets
                .lock()
                .expect("sets lock")
                .push((key.to_owned(), value.clone(), ttl));
            if self.fail {
                return Err(BackendError::set("recording", "backend down"));
            }
            self.inner.set(key, value, ttl).await
        }

        fn name(&self) -> &'static str {
            "recording"
        }
    }

    const TEST_KEY: &str = "clobert";

    fn expected() -> CacheValue {
        json!("bertclob")
    }

    #[tokio::test]
    async fn unwritten_key_is_a_miss() {
        let cache = TieredCache::new(Recording::new());
        let got = local::scope(LocalStore::new(), cache.get_or_miss(TEST_KEY)).await;
        assert!(got.expect("get").is_miss());
    }

    #[tokio::test]
    async fn local_hit_skips_external() {
        let cache = TieredCache::new(Recording::new());
        let mut store = LocalStore::new();
        store.insert(TEST_KEY, expected());

        let got = local::scope(store, cache.get_or_miss(TEST_KEY)).await;

        assert_eq!(got.expect("get"), Cached::Hit(expected()));
        assert_eq!(cache.external().gets(), 0);
    }

    #[tokio::test]
    async fn external_hit_is_mirrored_locally() {
        let cache = TieredCache::new(Recording::new());
        cache
            .external()
            .inner
            .set(TEST_KEY, expected(), ExternalTtl::Persistent)
            .await
            .expect("seed");

        local::scope(LocalStore::new(), async {
            assert_eq!(
                cache.get_or_miss(TEST_KEY).await.expect("get"),
                Cached::Hit(expected())
            );
            assert_eq!(
                local::inspect(|store| store.get(TEST_KEY).cloned()).flatten(),
                Some(expected())
            );
            assert_eq!(
                cache.get_or_miss(TEST_KEY).await.expect("get"),
                Cached::Hit(expected())
            );
        })
        .await;

        assert_eq!(cache.external().gets(), 1);
    }

    #[tokio::test]
    async fn falsy_external_value_is_a_hit() {
        let cache = TieredCache::new(Recording::new());
        cache
            .external()
            .inner
            .set(TEST_KEY, json!(0), ExternalTtl::Persistent)
            .await
            .expect("seed");

        let got = local::scope(LocalStore::new(), cache.get_or_miss(TEST_KEY)).await;
        assert_eq!(got.expect("get"), Cached::Hit(json!(0)));
    }

    #[tokio::test]
    async fn external_misses_are_not_remembered() {
        let cache = TieredCache::new(Recording::new());

        local::scope(LocalStore::new(), async {
            assert!(cache.get_or_miss(TEST_KEY).await.expect("get").is_miss());
            cache
                .external()
                .inner
                .set(TEST_KEY, expected(), ExternalTtl::Persistent)
                .await
                .expect("concurrent write");
            assert_eq!(
                cache.get_or_miss(TEST_KEY).await.expect("get"),
                Cached::Hit(expected())
            );
        })
        .await;

        assert_eq!(cache.external().gets(), 2);
    }

    #[tokio::test]
    async fn forced_miss_bypasses_external() {
        let cache = TieredCache::new(Recording::new());
        cache
            .external()
            .inner
            .set(TEST_KEY, expected(), ExternalTtl::Persistent)
            .await
            .expect("seed");

        local::scope(LocalStore::with_force_external_cache_miss(true), async {
            assert!(cache.force_external_cache_miss());
            assert!(cache.get_or_miss(TEST_KEY).await.expect("get").is_miss());
            assert_eq!(local::inspect(|store| store.contains_key(TEST_KEY)), Some(false));
        })
        .await;

        assert_eq!(cache.external().gets(), 0);
    }

    #[tokio::test]
    async fn forced_miss_still_serves_local_writes() {
        let cache = TieredCache::new(Recording::new());

        local::scope(LocalStore::with_force_external_cache_miss(true), async {
            cache
                .set_all_tiers(TEST_KEY, expected(), ExternalTtl::from_secs(1))
                .await
                .expect("set");
            assert_eq!(
                cache.get_or_miss(TEST_KEY).await.expect("get"),
                Cached::Hit(expected())
            );
        })
        .await;
    }

    #[tokio::test]
    async fn set_all_tiers_writes_both_tiers() {
        let cache = TieredCache::new(Recording::new());

        local::scope(LocalStore::new(), async {
            cache
                .set_all_tiers(TEST_KEY, expected(), ExternalTtl::from_secs(1))
                .await
                .expect("set");
            assert_eq!(
                local::inspect(|store| store.get(TEST_KEY).cloned()).flatten(),
                Some(expected())
            );
            assert_eq!(
                cache.get_or_miss(TEST_KEY).await.expect("get"),
                Cached::Hit(expected())
            );
        })
        .await;

        let sets = cache.external().sets.lock().expect("sets lock").clone();
        assert_eq!(
            sets,
            vec![(TEST_KEY.to_owned(), expected(), ExternalTtl::from_secs(1))]
        );
        assert_eq!(cache.external().gets(), 0);
    }

    #[tokio::test]
    async fn default_ttl_is_forwarded() {
        let cache = TieredCache::new(Recording::new());
        local::scope(LocalStore::new(), cache.set_all_tiers_default(TEST_KEY, expected()))
            .await
            .expect("set");

        let sets = cache.external().sets.lock().expect("sets lock").clone();
        assert_eq!(sets[0].2, ExternalTtl::BackendDefault);
    }

    #[tokio::test]
    async fn zero_ttl_stays_in_scope() {
        let cache = TieredCache::new(Recording::new());

        local::scope(LocalStore::new(), async {
            cache
                .set_all_tiers(TEST_KEY, expected(), ExternalTtl::EPHEMERAL)
                .await
                .expect("set");
            assert_eq!(
                cache.get_or_miss(TEST_KEY).await.expect("get"),
                Cached::Hit(expected())
            );
        })
        .await;

        // Forwarded, but the backend does not persist it.
        assert_eq!(cache.external().sets.lock().expect("sets lock").len(), 1);
        let next = local::scope(LocalStore::new(), cache.get_or_miss(TEST_KEY)).await;
        assert!(next.expect("get").is_miss());
    }

    #[tokio::test]
    async fn backend_get_failure_propagates() {
        let cache = TieredCache::new(Recording::failing());
        let err = local::scope(LocalStore::new(), cache.get_or_miss(TEST_KEY))
            .await
            .expect_err("backend failure");
        assert_eq!(err.backend(), "recording");
    }

    #[tokio::test]
    async fn backend_set_failure_propagates_after_local_write() {
        let cache = TieredCache::new(Recording::failing());

        local::scope(LocalStore::new(), async {
            let err = cache
                .set_all_tiers(TEST_KEY, expected(), ExternalTtl::BackendDefault)
                .await
                .expect_err("backend failure");
            assert_eq!(err.op(), crate::cache::BackendOp::Set);
            assert_eq!(
                local::inspect(|store| store.get(TEST_KEY).cloned()).flatten(),
                Some(expected())
            );
        })
        .await;
    }

    #[tokio::test]
    async fn outside_scope_reads_and_writes_external_only() {
        let cache = TieredCache::new(Recording::new());
        assert!(!cache.force_external_cache_miss());

        cache
            .set_all_tiers(TEST_KEY, expected(), ExternalTtl::Persistent)
            .await
            .expect("set");
        assert_eq!(
            cache.get_or_miss(TEST_KEY).await.expect("get"),
            Cached::Hit(expected())
        );
        assert_eq!(
            cache.get_or_miss(TEST_KEY).await.expect("get"),
            Cached::Hit(expected())
        );
        assert_eq!(cache.external().gets(), 2);
    }
}
