//! In-process external cache.
//!
//! LRU-bounded map with per-entry expiry. Useful as the shared tier for a
//! single process and as a stand-in for a networked backend in tests.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use metrics::counter;
use tracing::debug;

use super::config::CacheConfig;
use super::error::BackendError;
use super::external::{CacheValue, ExternalCache, ExternalTtl};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::memory";
const METRIC_MEMORY_EVICT_TOTAL: &str = "tiercache_memory_evict_total";

#[derive(Debug, Clone)]
struct Entry {
    value: CacheValue,
    /// `None` never expires.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| deadline <= now)
    }
}

/// Shared in-memory cache with LRU eviction and TTL expiry.
///
/// A zero TTL removes any existing entry and stores nothing, so the write
/// only lives in the caller's local tier.
pub struct MemoryCache {
    default_ttl: Duration,
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCache {
    /// Create a new memory cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            default_ttl: config.default_ttl(),
            entries: RwLock::new(LruCache::new(config.memory_capacity)),
        }
    }

    /// Number of stored entries, expired ones included until they are read.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        rw_write(&self.entries, SOURCE, "clear").clear();
    }

    fn lookup(&self, key: &str) -> Option<CacheValue> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        let now = Instant::now();

        let expired = match entries.get(key) {
            Some(entry) if !entry.is_expired(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!(cache = "memory", key, "dropping expired entry");
            entries.pop(key);
        }
        None
    }

    fn store(&self, key: &str, value: CacheValue, ttl: ExternalTtl) {
        let mut entries = rw_write(&self.entries, SOURCE, "set");

        let lifetime = ttl.resolve(self.default_ttl);
        if lifetime.is_some_and(|ttl| ttl.is_zero()) {
            debug!(cache = "memory", key, "ephemeral ttl, not persisting");
            entries.pop(key);
            return;
        }

        let expires_at = lifetime.and_then(|ttl| Instant::now().checked_add(ttl));
        let evicted = entries.push(key.to_owned(), Entry { value, expires_at });

        // `push` also hands back the old value when `key` was overwritten.
        if let Some((evicted_key, _)) = evicted.filter(|(evicted_key, _)| evicted_key != key) {
            debug!(cache = "memory", key = %evicted_key, "evicting least recently used entry");
            counter!(METRIC_MEMORY_EVICT_TOTAL).increment(1);
        }
    }
}

#[async_trait]
impl ExternalCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>, BackendError> {
        Ok(self.lookup(key))
    }

    async fn set(
        &self,
        key: &str,
        value: CacheValue,
        ttl: ExternalTtl,
    ) -> Result<(), BackendError> {
        self.store(key, value, ttl);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "MemoryCache"
    }
}
