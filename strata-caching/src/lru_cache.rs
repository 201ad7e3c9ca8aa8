//! LRU (Least Recently Used) cache implementation
//!
//! Synchronous by design: the managers keep their caches inside the same
//! mutex that guards the rest of their state, so a lookup and the
//! membership transitions around it are one critical section.

use log::debug;
use std::fmt::Debug;
use std::hash::Hash;
use std::num::NonZeroUsize;

use crate::{CacheError, CacheResult, CacheStats, StatsCollector};

/// Bounded map that evicts the least recently used entry when full.
///
/// A successful [`get`](LruCache::get) counts as a use; [`peek`](LruCache::peek)
/// and [`contains`](LruCache::contains) do not.
pub struct LruCache<K, V> {
    inner: ::lru::LruCache<K, V>,
    stats: StatsCollector,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Debug,
{
    /// Create a new LRU cache with specified capacity
    pub fn new(capacity: usize) -> CacheResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            CacheError::InvalidConfiguration("LRU cache capacity must be greater than 0".to_string())
        })?;

        Ok(Self {
            inner: ::lru::LruCache::new(capacity),
            stats: StatsCollector::new(),
        })
    }

    /// Insert or replace an entry and mark it most recently used.
    ///
    /// Returns the entry pushed out to make room, if any. Replacing an
    /// existing key never evicts.
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.stats.record_put();

        if self.inner.contains(&key) {
            self.inner.put(key, value);
            return None;
        }

        let evicted = self.inner.push(key, value);
        if let Some((ref key, _)) = evicted {
            debug!("Evicted {:?} from LRU cache", key);
            self.stats.record_eviction();
        }
        evicted
    }

    /// Look up an entry, refreshing its recency on a hit
    pub fn get(&mut self, key: &K) -> Option<&V> {
        match self.inner.get(key) {
            Some(value) => {
                self.stats.record_hit();
                Some(value)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Look up an entry without touching its recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.inner.peek(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.inner.contains(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.pop(key)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.cap().get()
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.get_stats(self.inner.len())
    }
}

impl<K: Hash + Eq, V> Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.inner.len())
            .field("capacity", &self.inner.cap())
            .finish()
    }
}
