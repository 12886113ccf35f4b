//! Generic cache-aside store over one document collection.

use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_stream::{Stream, StreamExt};

use mango_core::cache::{Cache, CacheKey, CacheWrapper};
use mango_core::document::{
    normalize_payload, stamp, stamp_update, Document, DocumentId, Filter, FindOptions, Status,
    Transition,
};
use mango_core::storage::{DocumentCollection, Result, StoreError};

/// Lazy sequence of decoded documents.
pub type TypedStream<D> = Pin<Box<dyn Stream<Item = Result<D>> + Send>>;

/// Cache-aside store for one entity type.
///
/// Holds no state besides its two handles; every call is a single
/// collection operation followed by synchronous cache maintenance.
///
/// # Type Parameters
///
/// * `D` - The stored entity
/// * `R` - The collection backend
/// * `C` - The cache backend
pub struct DocumentStore<D, R = dyn DocumentCollection, C = dyn Cache>
where
    D: Document,
    R: DocumentCollection + ?Sized,
    C: Cache + ?Sized,
{
    collection: Arc<R>,
    cache: CacheWrapper<C, D::Key>,
    _entity: PhantomData<fn() -> D>,
}

impl<D, R, C> Clone for DocumentStore<D, R, C>
where
    D: Document,
    R: DocumentCollection + ?Sized,
    C: Cache + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
            cache: self.cache.clone(),
            _entity: PhantomData,
        }
    }
}

impl<D, R, C> DocumentStore<D, R, C>
where
    D: Document,
    R: DocumentCollection + ?Sized,
    C: Cache + ?Sized,
{
    /// Creates a store whose cache entries live for `ttl`.
    pub fn new(collection: Arc<R>, cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            collection,
            cache: CacheWrapper::new(cache, ttl),
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> &R {
        &self.collection
    }

    pub fn cache(&self) -> &CacheWrapper<C, D::Key> {
        &self.cache
    }

    /// Reads a cached value. Any cache failure is reported as a miss.
    pub async fn read_cache<T: serde::de::DeserializeOwned>(&self, key: &D::Key) -> Option<T> {
        match self.cache.get_cache(key).await {
            Ok(value) => {
                tracing::trace!(key = %key.render(), "Cache hit");
                Some(value)
            }
            Err(err) if err.is_miss() => {
                tracing::trace!(key = %key.render(), "Cache miss");
                None
            }
            Err(err) => {
                tracing::warn!(key = %key.render(), error = %err, "Cache read failed");
                None
            }
        }
    }

    pub async fn write_cache<T: Serialize + ?Sized>(&self, key: &D::Key, value: &T) {
        if let Err(err) = self.cache.write_cache(key, value).await {
            tracing::warn!(key = %key.render(), error = %err, "Failed to populate cache");
        }
    }

    /// Deletes each key, logging (not returning) failures.
    pub async fn invalidate(&self, keys: &[D::Key]) {
        for key in keys {
            if let Err(err) = self.cache.delete(key).await {
                tracing::warn!(key = %key.render(), error = %err, "Failed to invalidate cache");
            }
        }
    }

    pub async fn invalidate_pattern(&self, pattern: &str) {
        if let Err(err) = self.cache.delete_pattern(pattern).await {
            tracing::warn!(pattern, error = %err, "Failed to invalidate cache pattern");
        }
    }

    /// Persists a new document and returns its id.
    ///
    /// The payload is normalized first: nulls and store-managed fields are
    /// dropped, then the creation timestamps are set. Callers invalidate
    /// whatever listings the new document affects.
    ///
    /// # Errors
    ///
    /// `SaveError` when nothing savable remains or the payload carries a
    /// status that cannot be assigned on create.
    pub async fn save<P: Serialize + ?Sized>(&self, payload: &P) -> Result<DocumentId> {
        let Some(mut doc) = normalize_payload(serde_json::to_value(payload)?) else {
            tracing::error!(collection = self.collection.name(), "Refusing to save empty document");
            return Err(StoreError::SaveError(format!(
                "empty {} payload",
                D::ENTITY
            )));
        };

        if let Some(raw) = doc.get("status") {
            let status: Status = serde_json::from_value(raw.clone())
                .map_err(|e| StoreError::SaveError(format!("invalid status: {e}")))?;
            Status::check_transition(None, status, Transition::Create)?;
        }

        stamp::<D>(&mut doc, Utc::now());
        let id = self.collection.insert_one(doc).await?;

        tracing::debug!(entity = D::ENTITY, id = %id, "Document created");
        Ok(id)
    }

    /// Looks a document up by id, optionally constrained to one status.
    ///
    /// # Errors
    ///
    /// `InvalidId` for a malformed id, `DocumentNotFound` when nothing
    /// matches.
    pub async fn find_by_id(&self, id: &str, status: Option<Status>) -> Result<D> {
        let id = DocumentId::parse(id)?;
        let key = D::id_key(id, status);

        if let Some(doc) = self.read_cache::<D>(&key).await {
            if status.is_none() || doc.lifecycle_status() == status {
                return Ok(doc);
            }
        }

        tracing::debug!(entity = D::ENTITY, id = %id, "Reading directly from database");
        let mut filter = Filter::by_id(id);
        if let Some(status) = status {
            filter = filter.eq("status", status.as_str());
        }
        let raw = self
            .collection
            .find_one(&filter, None)
            .await?
            .ok_or_else(|| StoreError::not_found(D::ENTITY, id))?;
        let doc: D = serde_json::from_value(raw)?;

        let deleted = doc.lifecycle_status().is_some_and(|s| s.is_deleted());
        if status.is_none() && deleted {
            // A deleted document must not shadow the bare-id key.
            let qualified = D::id_key(id, Some(Status::Deleted));
            if qualified.render() != key.render() {
                self.write_cache(&qualified, &doc).await;
            }
        } else {
            self.write_cache(&key, &doc).await;
        }

        Ok(doc)
    }

    /// Replaces the stored fields of a document and returns the modified
    /// count.
    ///
    /// A deleted document is never matched, so updating one returns 0. On
    /// a change, the bare-id cache entry is overwritten with `doc` as given
    /// and every status-qualified entry is dropped.
    ///
    /// # Errors
    ///
    /// `InvalidId` for a malformed id, `SaveError` when `doc` is marked
    /// deleted or has no savable fields.
    pub async fn update(&self, id: &str, doc: &D) -> Result<u64> {
        let id = DocumentId::parse(id)?;
        let status = doc.lifecycle_status();
        if let Some(status) = status {
            Status::check_transition(None, status, Transition::Update)?;
        }

        let value = serde_json::to_value(doc)?;
        let Some(mut set) = normalize_payload(value.clone()) else {
            return Err(StoreError::SaveError(format!("empty {} update", D::ENTITY)));
        };
        stamp_update::<D>(&mut set, Utc::now());

        let mut filter = Filter::by_id(id);
        if status.is_some() {
            filter = filter.is_in("status", Status::LISTED.iter().map(Status::as_str));
        }
        let result = self.collection.update_one(&filter, set.clone()).await?;
        tracing::info!(
            entity = D::ENTITY,
            id = %id,
            matched = result.matched,
            modified = result.modified,
            "Document updated"
        );

        if result.modified > 0 {
            let cached = merge_fields(value, set);
            let bare = D::id_key(id, None);
            self.write_cache(&bare, &cached).await;
            let stale: Vec<D::Key> = D::id_keys(id)
                .into_iter()
                .filter(|key| key.render() != bare.render())
                .collect();
            self.invalidate(&stale).await;
        }

        Ok(result.modified)
    }

    /// Soft-deletes a document and returns the modified count (0 or 1).
    ///
    /// Every per-id cache entry is dropped, whether or not anything changed.
    pub async fn delete(&self, id: &str) -> Result<u64> {
        let id = DocumentId::parse(id)?;
        Status::check_transition(None, Status::Deleted, Transition::Delete)?;

        let mut set = Map::new();
        set.insert("status".to_string(), Value::from(Status::Deleted.as_str()));
        stamp_update::<D>(&mut set, Utc::now());
        let result = self.collection.update_one(&Filter::by_id(id), set).await?;

        self.invalidate(&D::id_keys(id)).await;

        tracing::info!(entity = D::ENTITY, id = %id, modified = result.modified, "Document deleted");
        Ok(result.modified)
    }

    /// Raw, possibly projected documents straight from the collection.
    pub async fn find_by_filter(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<Value>> {
        self.collection.find(filter, options).await
    }

    /// Decoded documents straight from the collection.
    pub async fn find_many(&self, filter: &Filter, options: &FindOptions) -> Result<Vec<D>> {
        self.collection
            .find(filter, options)
            .await?
            .into_iter()
            .map(|raw| serde_json::from_value(raw).map_err(StoreError::from))
            .collect()
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64> {
        self.collection.count(filter).await
    }

    /// Streams decoded documents in natural order, bypassing the cache.
    pub fn stream(&self, filter: Filter) -> TypedStream<D> {
        let raw = self.collection.stream(filter);
        Box::pin(raw.map(|item| {
            item.and_then(|value| serde_json::from_value(value).map_err(StoreError::from))
        }))
    }
}

/// Overlays `set` on the caller's document so the cache entry carries the
/// refreshed timestamps.
fn merge_fields(mut doc: Value, set: Map<String, Value>) -> Value {
    if let Value::Object(fields) = &mut doc {
        fields.extend(set);
    }
    doc
}
