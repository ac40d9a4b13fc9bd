//! Errors surfaced by the tiered cache.

use std::{error::Error as StdError, fmt};

use thiserror::Error;

/// Fixed hint carried by every [`MisuseError`].
pub const USAGE_MESSAGE: &str =
    r#"Proper usage: "if value.is_miss() { value = DEFAULT; ... }"."#;

/// Returned when a value is pulled out of [`Cached::Miss`](super::Cached::Miss).
///
/// A miss only answers "is this a miss?". Reading, indexing, iterating or
/// probing it is a bug in the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{}", USAGE_MESSAGE)]
pub struct MisuseError;

pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// External cache call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOp {
    Get,
    Set,
}

impl fmt::Display for BackendOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("get"),
            Self::Set => f.write_str("set"),
        }
    }
}

/// Failure reported by an [`ExternalCache`](super::ExternalCache) backend.
///
/// The tiered cache never retries or translates these; they reach the caller
/// of `get_or_miss` / `set_all_tiers` as-is.
#[derive(Debug, Error)]
#[error("external cache `{backend}` failed during {op}: {source}")]
pub struct BackendError {
    backend: &'static str,
    op: BackendOp,
    #[source]
    source: BoxError,
}

impl BackendError {
    pub fn new(backend: &'static str, op: BackendOp, source: impl Into<BoxError>) -> Self {
        Self {
            backend,
            op,
            source: source.into(),
        }
    }

    pub fn get(backend: &'static str, source: impl Into<BoxError>) -> Self {
        Self::new(backend, BackendOp::Get, source)
    }

    pub fn set(backend: &'static str, source: impl Into<BoxError>) -> Self {
        Self::new(backend, BackendOp::Set, source)
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn op(&self) -> BackendOp {
        self.op
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misuse_error_carries_usage_hint() {
        insta::assert_snapshot!(
            MisuseError.to_string(),
            @r#"Proper usage: "if value.is_miss() { value = DEFAULT; ... }"."#
        );
    }

    #[test]
    fn backend_error_names_backend_and_op() {
        let err = BackendError::set("redis", "connection reset");
        assert_eq!(err.backend(), "redis");
        assert_eq!(err.op(), BackendOp::Set);
        assert_eq!(
            err.to_string(),
            "external cache `redis` failed during set: connection reset"
        );
        assert!(err.source().is_some());
    }
}
