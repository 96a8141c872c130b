//! Response caches for static assets and API reads.

mod lifecycle;
mod storage;

pub use lifecycle::{activate, install};
pub use storage::{CacheNames, CacheStorage, CacheSummary, ResponseCache, CACHE_PREFIX};
