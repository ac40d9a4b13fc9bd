//! Request-scoped local cache layered over a shared external cache.
//!
//! See [`cache`] for the tiers and the miss marker, [`config`] for settings
//! loading and [`infra`] for process bootstrap.

pub mod cache;
pub mod config;
pub mod infra;

pub use cache::{
    BackendError, Cached, CacheConfig, CacheValue, ExternalCache, ExternalTtl, LocalStore,
    MemoryCache, MisuseError, ScopeBoundaryHook, TieredCache, cache_scope_layer,
};
