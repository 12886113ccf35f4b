//! Cache-aside primitive scoped to one entity namespace.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{deserialize_value, serialize_value, Cache, CacheError, CacheKey, Result};

/// Typed view of a [`Cache`] that only accepts keys of one namespace.
///
/// `get_cache` turns an absent entry into [`CacheError::Miss`] so callers
/// can treat every `Err` as "go to the database".
pub struct CacheWrapper<C: Cache + ?Sized, K: CacheKey> {
    cache: Arc<C>,
    ttl: Duration,
    _key: PhantomData<fn(&K)>,
}

impl<C: Cache + ?Sized, K: CacheKey> Clone for CacheWrapper<C, K> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            ttl: self.ttl,
            _key: PhantomData,
        }
    }
}

impl<C: Cache + ?Sized, K: CacheKey> CacheWrapper<C, K> {
    pub fn new(cache: Arc<C>, ttl: Duration) -> Self {
        Self {
            cache,
            ttl,
            _key: PhantomData,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Reads and decodes an entry.
    ///
    /// # Errors
    ///
    /// `Miss` when the entry is absent or expired, `Serialization` when the
    /// stored bytes no longer decode, or the backend's own error.
    pub async fn get_cache<T: DeserializeOwned>(&self, key: &K) -> Result<T> {
        let rendered = key.render();
        match self.cache.get(&rendered).await? {
            Some(bytes) => {
                deserialize_value(&bytes).map_err(|e| CacheError::Serialization(e.to_string()))
            }
            None => Err(CacheError::Miss(rendered)),
        }
    }

    /// Encodes and writes an entry with the wrapper's TTL, overwriting any
    /// existing value.
    pub async fn write_cache<T: Serialize + ?Sized>(&self, key: &K, value: &T) -> Result<()> {
        let bytes = serialize_value(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.cache.set(&key.render(), &bytes, Some(self.ttl)).await
    }

    pub async fn delete(&self, key: &K) -> Result<()> {
        self.cache.delete(&key.render()).await
    }

    /// Deletes every key matching `pattern`.
    ///
    /// # Errors
    ///
    /// Rejects patterns that reach outside this wrapper's namespace.
    pub async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let scoped = pattern
            .strip_prefix(K::NAMESPACE)
            .is_some_and(|rest| rest.starts_with(':'));
        if !scoped {
            return Err(CacheError::OperationFailed(format!(
                "pattern {pattern:?} is outside namespace {}",
                K::NAMESPACE
            )));
        }
        self.cache.delete_pattern(pattern).await
    }
}
