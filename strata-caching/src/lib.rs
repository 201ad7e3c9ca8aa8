//! Bounded retention caches for Strata
//!
//! Finished export outcomes are kept in fixed-capacity LRU caches so a
//! coordinator can poll for them after the work itself is gone.

pub mod errors;
pub mod lru_cache;
pub mod stats;

// Re-export main types
pub use errors::{CacheError, CacheResult};
pub use lru_cache::LruCache;
pub use stats::{CacheStats, StatsCollector};
