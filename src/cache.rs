//! In-memory result cache with expiration and single-flight population
//!
//! The cache fronts expensive work (full index builds, search results) with
//! per-entry sliding and absolute expiration:
//! - Sliding: an entry expires when it has not been read for the sliding window
//! - Absolute: an entry expires a fixed time after it was stored, regardless of reads
//!
//! `get_or_create` guarantees that concurrent callers asking for the same
//! missing key share a single factory invocation. Each key gets its own async
//! gate; the first caller through the gate runs the factory while the others
//! wait and then read the stored value.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;

use crate::error::CacheError;

/// Expiration policy applied to stored entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Evict entries not read within this window (None = never)
    pub sliding_expiration: Option<Duration>,
    /// Evict entries this long after insertion (None = never)
    pub absolute_expiration: Option<Duration>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            sliding_expiration: Some(Duration::from_secs(30 * 60)),
            absolute_expiration: Some(Duration::from_secs(2 * 60 * 60)),
        }
    }
}

/// Point-in-time cache counters
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CacheStatistics {
    pub item_count: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    /// Rough memory footprint of keys and values (bytes)
    pub estimated_size_bytes: usize,
    /// Set by `clear()`
    pub last_cleared: Option<DateTime<Utc>>,
}

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
    last_access: Instant,
    options: CacheOptions,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        if let Some(sliding) = self.options.sliding_expiration {
            if now.duration_since(self.last_access) > sliding {
                return true;
            }
        }
        if let Some(absolute) = self.options.absolute_expiration {
            if now.duration_since(self.created_at) > absolute {
                return true;
            }
        }
        false
    }
}

type Gate = Arc<tokio::sync::Mutex<()>>;

/// A per-key gate and the number of callers currently holding a handle to it
struct GateSlot {
    gate: Gate,
    users: usize,
}

/// Gives a caller's gate handle back when dropped, including when the
/// `get_or_create` future is dropped mid-flight.
struct GateRelease<'a, V> {
    cache: &'a MemoryCache<V>,
    key: &'a str,
}

impl<V> Drop for GateRelease<'_, V> {
    fn drop(&mut self) {
        let mut gates = self.cache.gates.lock();
        if let Some(slot) = gates.get_mut(self.key) {
            slot.users = slot.users.saturating_sub(1);
            if slot.users == 0 {
                gates.remove(self.key);
            }
        }
    }
}

/// Thread-safe key/value cache keyed by non-empty strings
pub struct MemoryCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    gates: Mutex<HashMap<String, GateSlot>>,
    options: CacheOptions,
    hits: AtomicU64,
    misses: AtomicU64,
    last_cleared: Mutex<Option<DateTime<Utc>>>,
    disposed: AtomicBool,
}

impl<V: Clone> MemoryCache<V> {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            options,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            last_cleared: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    fn check(&self, key: &str) -> Result<(), CacheError> {
        if key.trim().is_empty() {
            return Err(CacheError::InvalidKey);
        }
        if self.disposed.load(Ordering::Acquire) {
            return Err(CacheError::Disposed);
        }
        Ok(())
    }

    /// Look up a live entry, refreshing its sliding window. Expired entries are evicted.
    fn lookup(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        match entries.get_mut(key) {
            Some(entry) if entry.is_expired(now) => {
                log::debug!("Cache entry '{}' expired", key);
                entries.remove(key);
                None
            }
            Some(entry) => {
                entry.last_access = now;
                Some(entry.value.clone())
            }
            None => None,
        }
    }

    fn record(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Return the cached value for `key`, or `None` on a miss
    pub fn get(&self, key: &str) -> Result<Option<V>, CacheError> {
        self.check(key)?;
        let value = self.lookup(key);
        self.record(value.is_some());
        Ok(value)
    }

    /// Store `value` under `key` with the cache's expiration policy.
    ///
    /// Entries that expired without being read again are swept out here.
    pub fn set(&self, key: &str, value: V) -> Result<(), CacheError> {
        self.check(key)?;
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        if entries.len() < before {
            log::debug!("Evicted {} expired cache entries", before - entries.len());
        }
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: now,
                last_access: now,
                options: self.options,
            },
        );
        Ok(())
    }

    /// Return the cached value, or run `factory` once and cache its result.
    ///
    /// Concurrent callers for the same missing key wait on a per-key gate, so
    /// `factory` runs at most once per uncached period. A factory error, or the
    /// caller's future being dropped mid-flight, leaves nothing in the cache.
    pub async fn get_or_create<F, Fut, E>(&self, key: &str, factory: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: From<CacheError>,
    {
        if let Some(value) = self.get(key)? {
            return Ok(value);
        }

        let gate = self.enter_gate(key);
        let _release = GateRelease { cache: self, key };
        let _guard = gate.lock().await;
        self.check(key)?;

        if let Some(value) = self.lookup(key) {
            self.record(true);
            return Ok(value);
        }
        let value = factory().await?;
        self.set(key, value.clone())?;
        Ok(value)
    }

    /// Take a handle to the gate for `key`, creating it on first use.
    /// Every handle is paired with a [`GateRelease`]; the last one out
    /// removes the gate.
    fn enter_gate(&self, key: &str) -> Gate {
        let mut gates = self.gates.lock();
        let slot = gates.entry(key.to_string()).or_insert_with(|| GateSlot {
            gate: Arc::new(tokio::sync::Mutex::new(())),
            users: 0,
        });
        slot.users += 1;
        Arc::clone(&slot.gate)
    }

    /// Evict `key`. Returns whether an entry was present.
    pub fn remove(&self, key: &str) -> Result<bool, CacheError> {
        self.check(key)?;
        Ok(self.entries.lock().remove(key).is_some())
    }

    /// Evict every entry whose key matches `predicate`. Returns how many were removed.
    pub fn remove_where<P>(&self, predicate: P) -> Result<usize, CacheError>
    where
        P: Fn(&str) -> bool,
    {
        if self.disposed.load(Ordering::Acquire) {
            return Err(CacheError::Disposed);
        }
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|key, _| !predicate(key));
        Ok(before - entries.len())
    }

    /// Evict all entries and reset the hit/miss counters
    pub fn clear(&self) -> Result<(), CacheError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(CacheError::Disposed);
        }
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        *self.last_cleared.lock() = Some(Utc::now());
        log::debug!("Cache cleared");
        Ok(())
    }

    pub fn statistics(&self) -> Result<CacheStatistics, CacheError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(CacheError::Disposed);
        }

        let now = Instant::now();
        let entries = self.entries.lock();
        let live: Vec<&String> = entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired(now))
            .map(|(key, _)| key)
            .collect();
        let estimated_size_bytes = live
            .iter()
            .map(|key| key.len() + std::mem::size_of::<CacheEntry<V>>())
            .sum();

        Ok(CacheStatistics {
            item_count: live.len(),
            hit_count: self.hits.load(Ordering::Relaxed),
            miss_count: self.misses.load(Ordering::Relaxed),
            estimated_size_bytes,
            last_cleared: *self.last_cleared.lock(),
        })
    }

    /// Tear the cache down. Every later operation fails with `Disposed`.
    pub fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::AcqRel) {
            self.entries.lock().clear();
            self.gates.lock().clear();
            log::debug!("Cache disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn cache() -> MemoryCache<String> {
        MemoryCache::new(CacheOptions::default())
    }

    #[test]
    fn test_get_miss_then_hit() {
        let cache = cache();
        assert_eq!(cache.get("k").unwrap(), None);

        cache.set("k", "v".to_string()).unwrap();
        assert_eq!(cache.get("k").unwrap(), Some("v".to_string()));

        let stats = cache.statistics().unwrap();
        assert_eq!(stats.item_count, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.miss_count, 1);
        assert!(stats.estimated_size_bytes > 0);
    }

    #[test]
    fn test_empty_key_rejected() {
        let cache = cache();
        assert_eq!(cache.get(""), Err(CacheError::InvalidKey));
        assert_eq!(cache.set("  ", "v".to_string()), Err(CacheError::InvalidKey));
        assert_eq!(cache.remove(""), Err(CacheError::InvalidKey));
        // Rejected before touching the counters
        assert_eq!(cache.statistics().unwrap().miss_count, 0);
    }

    #[test]
    fn test_remove() {
        let cache = cache();
        cache.set("k", "v".to_string()).unwrap();
        assert!(cache.remove("k").unwrap());
        assert!(!cache.remove("k").unwrap());
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_clear_resets_statistics() {
        let cache = cache();
        cache.set("a", "1".to_string()).unwrap();
        cache.set("b", "2".to_string()).unwrap();
        cache.get("a").unwrap();
        cache.get("missing").unwrap();

        cache.clear().unwrap();

        let stats = cache.statistics().unwrap();
        assert_eq!(stats.item_count, 0);
        assert_eq!(stats.hit_count, 0);
        assert_eq!(stats.miss_count, 0);
        assert!(stats.last_cleared.is_some());
    }

    #[test]
    fn test_sliding_expiration() {
        let cache = MemoryCache::new(CacheOptions {
            sliding_expiration: Some(Duration::from_millis(40)),
            absolute_expiration: None,
        });
        cache.set("k", "v".to_string()).unwrap();

        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(cache.get("k").unwrap(), None);
        assert_eq!(cache.statistics().unwrap().item_count, 0);
    }

    #[test]
    fn test_absolute_expiration_ignores_reads() {
        let cache = MemoryCache::new(CacheOptions {
            sliding_expiration: None,
            absolute_expiration: Some(Duration::from_millis(120)),
        });
        cache.set("k", "v".to_string()).unwrap();

        for _ in 0..3 {
            std::thread::sleep(Duration::from_millis(20));
            assert!(cache.get("k").unwrap().is_some());
        }
        std::thread::sleep(Duration::from_millis(200));
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_set_sweeps_entries_never_read_again() {
        let cache = MemoryCache::new(CacheOptions {
            sliding_expiration: Some(Duration::from_millis(10)),
            absolute_expiration: None,
        });
        for i in 0..100 {
            cache.set(&format!("search:1:{}", i), "old".to_string()).unwrap();
        }

        std::thread::sleep(Duration::from_millis(50));
        cache.set("search:2:0", "new".to_string()).unwrap();

        for i in 0..100 {
            assert!(!cache.remove(&format!("search:1:{}", i)).unwrap());
        }
        assert!(cache.remove("search:2:0").unwrap());
    }

    #[test]
    fn test_remove_where() {
        let cache = cache();
        cache.set("search:1:a", "1".to_string()).unwrap();
        cache.set("search:1:b", "2".to_string()).unwrap();
        cache.set("search:2:a", "3".to_string()).unwrap();
        cache.set("snapshot", "4".to_string()).unwrap();

        let removed = cache.remove_where(|key| key.starts_with("search:1:")).unwrap();
        assert_eq!(removed, 2);
        assert!(cache.get("search:2:a").unwrap().is_some());
        assert!(cache.get("snapshot").unwrap().is_some());
        assert_eq!(cache.statistics().unwrap().item_count, 2);
    }

    #[test]
    fn test_disposed_cache_rejects_everything() {
        let cache = cache();
        cache.set("k", "v".to_string()).unwrap();
        cache.dispose();

        assert!(cache.is_disposed());
        assert_eq!(cache.get("k"), Err(CacheError::Disposed));
        assert_eq!(cache.set("k", "v".to_string()), Err(CacheError::Disposed));
        assert_eq!(cache.remove("k"), Err(CacheError::Disposed));
        assert_eq!(cache.clear(), Err(CacheError::Disposed));
        assert_eq!(cache.statistics(), Err(CacheError::Disposed));
        assert_eq!(cache.remove_where(|_| true), Err(CacheError::Disposed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_get_or_create_single_flight() {
        let cache = Arc::new(MemoryCache::<u64>::new(CacheOptions::default()));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_create("answer", || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        Ok::<u64, CacheError>(42)
                    })
                    .await
            }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.gates.lock().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_create_error_not_cached() {
        let cache = MemoryCache::<u64>::new(CacheOptions::default());

        let result: Result<u64, crate::error::IndexError> = cache
            .get_or_create("k", || async { Err(crate::error::IndexError::Cancelled) })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.get("k").unwrap(), None);

        let value: Result<u64, CacheError> = cache.get_or_create("k", || async { Ok(7) }).await;
        assert_eq!(value.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_dropped_factory_does_not_poison() {
        let cache = Arc::new(MemoryCache::<u64>::new(CacheOptions::default()));

        let pending = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_create("k", || async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok::<u64, CacheError>(1)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        pending.abort();
        let _ = pending.await;

        assert_eq!(cache.get("k").unwrap(), None);
        let value: Result<u64, CacheError> = cache.get_or_create("k", || async { Ok(2) }).await;
        assert_eq!(value.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_aborted_callers_release_gate() {
        let cache = Arc::new(MemoryCache::<u64>::new(CacheOptions::default()));

        let mut pending = Vec::new();
        for _ in 0..3 {
            let cache = Arc::clone(&cache);
            pending.push(tokio::spawn(async move {
                cache
                    .get_or_create("k", || async {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok::<u64, CacheError>(1)
                    })
                    .await
            }));
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.gates.lock().get("k").map(|slot| slot.users), Some(3));

        for handle in pending {
            handle.abort();
            let _ = handle.await;
        }
        assert!(cache.gates.lock().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_create_rejects_empty_key() {
        let cache = MemoryCache::<u64>::new(CacheOptions::default());
        let result: Result<u64, CacheError> = cache.get_or_create("", || async { Ok(1) }).await;
        assert_eq!(result, Err(CacheError::InvalidKey));
    }
}
