//! In-memory cache with LRU eviction and lazy TTL expiry.
//!
//! Keys that belong to a family (see [`family_of_key`]) are tracked per
//! family, so purging a family pattern touches only its members instead of
//! scanning the whole store.

use std::collections::{HashMap, HashSet};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use tokio::sync::RwLock;

use mango_core::cache::{family_of_key, family_of_pattern, pattern_matches, Cache, Result};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn new(value: Vec<u8>, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|d| Instant::now() + d),
        }
    }

    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|exp| Instant::now() >= exp)
    }
}

type Tracking = HashMap<String, HashSet<String>>;

/// Thread-safe in-memory cache.
///
/// Expired entries are dropped when next read. Once `max_entries` is
/// reached the least recently used entry is evicted.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    store: Arc<RwLock<LruCache<String, CacheEntry>>>,
    /// family prefix -> member keys
    tracking: Arc<RwLock<Tracking>>,
}

impl MemoryCache {
    /// Creates a cache holding at most `max_entries` entries.
    ///
    /// # Panics
    ///
    /// Panics if `max_entries` is 0.
    pub fn new(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::new(max_entries).expect("max_entries must be > 0");
        Self {
            store: Arc::new(RwLock::new(LruCache::new(capacity))),
            tracking: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

fn track(tracking: &mut Tracking, key: &str) {
    if let Some(family) = family_of_key(key) {
        tracking
            .entry(family.to_string())
            .or_default()
            .insert(key.to_string());
    }
}

fn untrack(tracking: &mut Tracking, key: &str) {
    let Some(family) = family_of_key(key) else {
        return;
    };
    if let Some(keys) = tracking.get_mut(family) {
        keys.remove(key);
        if keys.is_empty() {
            tracking.remove(family);
        }
    }
}

// Lock order is always `store` then `tracking`, and tracking only changes
// while the store lock is held.
#[async_trait]
impl Cache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut store = self.store.write().await;
        let expired = match store.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            store.pop(key);
            untrack(&mut *self.tracking.write().await, key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut store = self.store.write().await;
        let displaced = store.push(key.to_string(), CacheEntry::new(value.to_vec(), ttl));

        let mut tracking = self.tracking.write().await;
        if let Some((evicted, _)) = displaced.filter(|(old, _)| old != key) {
            untrack(&mut tracking, &evicted);
        }
        track(&mut tracking, key);

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut store = self.store.write().await;
        store.pop(key);
        untrack(&mut *self.tracking.write().await, key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut store = self.store.write().await;
        let mut tracking = self.tracking.write().await;

        let Some(family) = family_of_pattern(pattern) else {
            // Untracked pattern: full scan.
            let doomed: Vec<String> = store
                .iter()
                .filter(|(key, _)| pattern_matches(pattern, key))
                .map(|(key, _)| key.clone())
                .collect();
            for key in &doomed {
                store.pop(key);
                untrack(&mut tracking, key);
            }
            return Ok(());
        };

        for key in tracking.remove(family).unwrap_or_default() {
            store.pop(&key);
        }

        Ok(())
    }
}
