//! Counting mocks shared by the store, service and handler tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use mango_core::cache::{pattern_matches, Cache, CacheError, Result as CacheResult};
use mango_core::document::{DocumentId, Filter, FindOptions, Projection};
use mango_core::storage::{DocumentCollection, DocumentStream, Result, UpdateResult};

use crate::storage::inmemory::InMemoryCollection;

/// Map-backed cache that counts hits and misses and can be switched to
/// fail every call, as an unreachable backend would.
#[derive(Default)]
pub struct MockCache {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    pub hits: AtomicUsize,
    pub misses: AtomicUsize,
    pub sets: AtomicUsize,
    failing: AtomicBool,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn contains(&self, key: &str) -> bool {
        self.entries.read().await.contains_key(key)
    }

    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn hit_count(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    fn check(&self) -> CacheResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(CacheError::ConnectionFailed("cache unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Cache for MockCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.check()?;
        let value = self.entries.read().await.get(key).cloned();
        match value {
            Some(_) => self.hits.fetch_add(1, Ordering::SeqCst),
            None => self.misses.fetch_add(1, Ordering::SeqCst),
        };
        Ok(value)
    }

    async fn set(&self, key: &str, value: &[u8], _ttl: Option<Duration>) -> CacheResult<()> {
        self.check()?;
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.check()?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<()> {
        self.check()?;
        self.entries
            .write()
            .await
            .retain(|key, _| !pattern_matches(pattern, key));
        Ok(())
    }
}

/// In-memory collection that counts database reads.
pub struct MockCollection {
    inner: InMemoryCollection,
    pub reads: AtomicUsize,
}

impl MockCollection {
    pub fn new(name: &str) -> Self {
        Self {
            inner: InMemoryCollection::new(name),
            reads: AtomicUsize::new(0),
        }
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Raw document as stored, bypassing the read counter.
    pub async fn raw(&self, id: DocumentId) -> Option<Value> {
        self.inner
            .find_one(&Filter::by_id(id), None)
            .await
            .ok()
            .flatten()
    }
}

#[async_trait]
impl DocumentCollection for MockCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn insert_one(&self, doc: Map<String, Value>) -> Result<DocumentId> {
        self.inner.insert_one(doc).await
    }

    async fn find_one(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find_one(filter, projection).await
    }

    async fn find(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.find(filter, options).await
    }

    async fn count(&self, filter: &Filter) -> Result<u64> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.count(filter).await
    }

    async fn update_one(&self, filter: &Filter, set: Map<String, Value>) -> Result<UpdateResult> {
        self.inner.update_one(filter, set).await
    }

    fn stream(&self, filter: Filter) -> DocumentStream {
        self.inner.stream(filter)
    }
}

/// Application state over fresh mock backends.
pub fn test_state() -> crate::state::AppState {
    let config = crate::config::Config {
        cache_ttl_seconds: 60,
        cache_max_entries: 100,
        sqlite_path: String::new(),
        redis_url: String::new(),
        rating_ranges: vec![1, 2, 3, 4, 5],
        reservation_lookup_url: None,
    };
    crate::state::AppState::from_backends(
        std::sync::Arc::new(MockCollection::new("questions")),
        std::sync::Arc::new(MockCollection::new("surveys")),
        std::sync::Arc::new(MockCache::new()),
        &config,
    )
}
