//! Warm cache layer (C8)
//!
//! Two tiers: an in-process `DashMap` of immutable reference-data derivations
//! (sub-microsecond, lock-free reads), keyed by a canonical fingerprint of
//! their inputs, and an optional LRU tier with TTLs for cross-job memoization
//! of more expensive derivations (e.g. warfare-pattern hour-weight matrices).
//! Cached values are deep-immutable; nothing is ever mutated post-insertion.

use dashmap::DashMap;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECONDS};

/// A canonical, content-hash-derived fingerprint identifying a cache entry.
/// Using a content hash (rather than a raw config struct) guarantees that a
/// config change invalidates stale entries instead of silently reusing them.
pub type Fingerprint = String;

struct TtlEntry<V> {
    value: Arc<V>,
    inserted_at: Instant,
}

/// Warm cache for reference-data derivations and cross-job memoization.
pub struct WarmCache<V> {
    hot: Arc<DashMap<Fingerprint, Arc<V>>>,
    warm: Arc<Mutex<LruCache<Fingerprint, TtlEntry<V>>>>,
    ttl: Duration,
}

impl<V> WarmCache<V> {
    /// Create a new warm cache with the default LRU capacity and TTL.
    pub fn new() -> Self {
        Self::with_capacity_and_ttl(DEFAULT_CACHE_CAPACITY, DEFAULT_CACHE_TTL_SECONDS)
    }

    /// Create a warm cache with an explicit LRU capacity and TTL (seconds).
    pub fn with_capacity_and_ttl(capacity: usize, ttl_secs: u64) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity is clamped to >= 1 above");
        Self {
            hot: Arc::new(DashMap::new()),
            warm: Arc::new(Mutex::new(LruCache::new(cap))),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    /// Look up a process-lifetime reference-data derivation by fingerprint.
    pub fn get_hot(&self, key: &str) -> Option<Arc<V>> {
        self.hot.get(key).map(|entry| entry.value().clone())
    }

    /// Insert a process-lifetime reference-data derivation. Never evicted.
    pub fn insert_hot(&self, key: Fingerprint, value: Arc<V>) {
        self.hot.insert(key, value);
    }

    /// Look up a cross-job memoized value, honoring the TTL. An expired entry
    /// is treated as a miss and removed lazily.
    pub fn get_warm(&self, key: &str) -> Option<Arc<V>> {
        let mut warm = self.warm.lock();
        if let Some(entry) = warm.get(key) {
            if entry.inserted_at.elapsed() <= self.ttl {
                return Some(entry.value.clone());
            }
            warm.pop(key);
        }
        None
    }

    /// Insert a cross-job memoized value, evicting the least-recently-used
    /// entry if the cache is at capacity.
    pub fn insert_warm(&self, key: Fingerprint, value: Arc<V>) {
        let mut warm = self.warm.lock();
        warm.put(
            key,
            TtlEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Fetch from either tier, falling back to `compute` and back-populating
    /// the warm tier on a miss.
    pub fn get_or_compute_warm<F>(&self, key: &str, compute: F) -> Arc<V>
    where
        F: FnOnce() -> V,
    {
        if let Some(hit) = self.get_warm(key) {
            return hit;
        }
        let value = Arc::new(compute());
        self.insert_warm(key.to_string(), value.clone());
        value
    }

    /// Evict a single process-lifetime entry, e.g. after its row is deleted.
    pub fn remove_hot(&self, key: &str) {
        self.hot.remove(key);
    }

    /// Current occupancy of both tiers, for observability.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hot_count: self.hot.len(),
            warm_count: self.warm.lock().len(),
        }
    }

    /// Drop all cached entries in both tiers.
    pub fn clear(&self) {
        self.hot.clear();
        self.warm.lock().clear();
    }
}

impl<V> Default for WarmCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for WarmCache<V> {
    fn clone(&self) -> Self {
        Self {
            hot: self.hot.clone(),
            warm: self.warm.clone(),
            ttl: self.ttl,
        }
    }
}

/// Cache occupancy snapshot
#[derive(Debug, Clone, Copy)]
pub struct CacheStats {
    pub hot_count: usize,
    pub warm_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hot_insert_get() {
        let cache: WarmCache<Vec<f64>> = WarmCache::new();
        cache.insert_hot("medium:sustained".to_string(), Arc::new(vec![1.0, 2.0]));
        let retrieved = cache.get_hot("medium:sustained");
        assert!(retrieved.is_some());
        assert_eq!(retrieved.unwrap().len(), 2);
    }

    #[test]
    fn test_warm_miss_then_compute() {
        let cache: WarmCache<u32> = WarmCache::new();
        let mut calls = 0;
        let v1 = cache.get_or_compute_warm("k", || {
            calls += 1;
            42
        });
        assert_eq!(*v1, 42);
        let v2 = cache.get_or_compute_warm("k", || {
            calls += 1;
            99
        });
        assert_eq!(*v2, 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache: WarmCache<u32> = WarmCache::with_capacity_and_ttl(8, 0);
        cache.insert_warm("k".to_string(), Arc::new(1));
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(cache.get_warm("k").is_none());
    }

    #[test]
    fn test_stats() {
        let cache: WarmCache<u32> = WarmCache::new();
        assert_eq!(cache.stats().hot_count, 0);
        cache.insert_hot("a".to_string(), Arc::new(1));
        assert_eq!(cache.stats().hot_count, 1);
    }
}
