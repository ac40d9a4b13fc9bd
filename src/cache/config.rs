//! Cache configuration.
//!
//! Built by the settings loader from the `[cache]` table; hosts wiring a
//! backend by hand construct it directly.

use std::num::NonZeroUsize;
use std::time::Duration;

const DEFAULT_TTL_SECS: u64 = 300;
const DEFAULT_MEMORY_CAPACITY: NonZeroUsize = match NonZeroUsize::new(1000) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Timeout applied when writers pass `ExternalTtl::BackendDefault`.
    pub default_ttl_secs: u64,
    /// Maximum entries held by the in-process external cache.
    pub memory_capacity: NonZeroUsize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: DEFAULT_TTL_SECS,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }
}
