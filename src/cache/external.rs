//! Second tier: the shared external cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::error::BackendError;

/// Payload stored in either tier. Byte-level encoding is the backend's concern.
pub type CacheValue = serde_json::Value;

/// Timeout passed to the external cache on writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExternalTtl {
    /// The backend's configured default timeout.
    #[default]
    BackendDefault,
    /// Never expires.
    Persistent,
    /// Expires after the given duration. Zero means "do not persist": the value
    /// lives only in the local tier for the rest of the scope.
    Expires(Duration),
}

impl ExternalTtl {
    pub const EPHEMERAL: Self = Self::Expires(Duration::ZERO);

    pub fn from_secs(secs: u64) -> Self {
        Self::Expires(Duration::from_secs(secs))
    }

    pub fn is_ephemeral(&self) -> bool {
        matches!(self, Self::Expires(ttl) if ttl.is_zero())
    }

    /// Concrete lifetime given the backend default; `None` means no expiry.
    pub fn resolve(self, default: Duration) -> Option<Duration> {
        match self {
            Self::BackendDefault => Some(default),
            Self::Persistent => None,
            Self::Expires(ttl) => Some(ttl),
        }
    }
}

impl From<Duration> for ExternalTtl {
    fn from(ttl: Duration) -> Self {
        Self::Expires(ttl)
    }
}

/// Shared key/value store with per-entry TTL.
///
/// Implementations are shared by every scope and must synchronize themselves.
/// Failures are reported as [`BackendError`] and propagate to the caller
/// unchanged.
#[async_trait]
pub trait ExternalCache: Send + Sync {
    /// Value stored under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<CacheValue>, BackendError>;

    /// Store `value` under `key` for `ttl`. An ephemeral TTL must not leave a
    /// readable entry behind.
    async fn set(&self, key: &str, value: CacheValue, ttl: ExternalTtl)
    -> Result<(), BackendError>;

    /// Backend name for logs and errors.
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T> ExternalCache for Arc<T>
where
    T: ExternalCache + ?Sized,
{
    async fn get(&self, key: &str) -> Result<Option<CacheValue>, BackendError> {
        (**self).get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: CacheValue,
        ttl: ExternalTtl,
    ) -> Result<(), BackendError> {
        (**self).set(key, value, ttl).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}
