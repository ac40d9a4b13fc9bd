//! Two-tier value cache.
//!
//! - **Local tier**: a [`LocalStore`] private to one request or task, created
//!   at scope entry and cleared on every exit path.
//! - **External tier**: a shared [`ExternalCache`] with per-entry timeouts,
//!   e.g. [`MemoryCache`] or a networked store.
//!
//! Reads go through [`TieredCache::get_or_miss`], which answers with
//! [`Cached::Hit`] or [`Cached::Miss`]. A miss is never confused with a
//! stored falsy value.
//!
//! ```ignore
//! let cache = TieredCache::new(MemoryCache::new(&CacheConfig::default()));
//!
//! ScopeBoundaryHook
//!     .within_scope(&params, async {
//!         let price = match cache.get_or_miss("price:42").await? {
//!             Cached::Hit(price) => price,
//!             Cached::Miss => {
//!                 let price = load_price(42).await?;
//!                 cache.set_all_tiers("price:42", price.clone(), ExternalTtl::from_secs(300)).await?;
//!                 price
//!             }
//!         };
//!         Ok::<_, AppError>(price)
//!     })
//!     .await?;
//! ```

mod cached;
mod config;
mod error;
mod external;
pub mod local;
mod lock;
mod memory;
mod middleware;
mod scope;
mod tiered;

pub use cached::Cached;
pub use config::CacheConfig;
pub use error::{BackendError, BackendOp, BoxError, MisuseError, USAGE_MESSAGE};
pub use external::{CacheValue, ExternalCache, ExternalTtl};
pub use local::LocalStore;
pub use memory::MemoryCache;
pub use middleware::cache_scope_layer;
pub use scope::{
    FORCE_EXTERNAL_CACHE_MISS_PARAM, ScopeBoundaryHook, ScopeParams,
    parse_force_external_cache_miss,
};
pub use tiered::TieredCache;
