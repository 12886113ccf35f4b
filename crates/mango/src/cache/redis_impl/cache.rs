//! Redis cache implementation.
//!
//! Members of a key family (the paginated survey listings) are recorded in a
//! Redis set per family, so purging the family is `SMEMBERS` + `DEL` rather
//! than a keyspace scan. Any other pattern falls back to a cursor `SCAN`.
//!
//! None of the multi-command sequences are atomic. A stale set member only
//! makes a later `DEL` a no-op, and an interrupted purge is finished by the
//! next one.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;

use mango_core::cache::{
    family_of_key, family_of_pattern, family_tracking_key, pattern_matches, Cache, Result,
};

use super::error::map_redis_error;

/// Keys requested per `SCAN` round trip.
const SCAN_BATCH: usize = 500;

/// Redis cache backend using a connection manager.
#[derive(Clone)]
pub struct RedisCache {
    conn: redis::aio::ConnectionManager,
}

impl RedisCache {
    /// Connects to Redis.
    ///
    /// # Errors
    ///
    /// Returns `CacheError::ConnectionFailed` if the connection cannot be established.
    pub async fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url).map_err(map_redis_error)?;
        let conn = redis::aio::ConnectionManager::new(client)
            .await
            .map_err(map_redis_error)?;
        Ok(Self { conn })
    }

    async fn scan_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut cursor: u64 = 0;
        let mut keys = Vec::new();
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(map_redis_error)?;
            keys.extend(batch);
            if next == 0 {
                return Ok(keys);
            }
            cursor = next;
        }
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut conn = self.conn.clone();
        let result: Option<Vec<u8>> = conn.get(key).await.map_err(map_redis_error)?;
        Ok(result)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();

        match ttl {
            Some(duration) => {
                let seconds = duration.as_secs().max(1);
                conn.set_ex::<_, _, ()>(key, value, seconds)
                    .await
                    .map_err(map_redis_error)?;
            }
            None => {
                conn.set::<_, _, ()>(key, value)
                    .await
                    .map_err(map_redis_error)?;
            }
        }

        if let Some(family) = family_of_key(key) {
            conn.sadd::<_, _, ()>(family_tracking_key(family), key)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        if let Some(family) = family_of_key(key) {
            conn.srem::<_, _, ()>(family_tracking_key(family), key)
                .await
                .map_err(map_redis_error)?;
        }

        conn.del::<_, ()>(key).await.map_err(map_redis_error)?;
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let mut conn = self.conn.clone();

        let Some(family) = family_of_pattern(pattern) else {
            let keys = self.scan_matching(pattern).await?;
            if !keys.is_empty() {
                conn.del::<_, ()>(&keys).await.map_err(map_redis_error)?;
            }
            return Ok(());
        };

        let tracking_key = family_tracking_key(family);
        let members: Vec<String> = conn
            .smembers(&tracking_key)
            .await
            .map_err(map_redis_error)?;
        let doomed: Vec<&String> = members
            .iter()
            .filter(|key| pattern_matches(pattern, key))
            .collect();

        if !doomed.is_empty() {
            conn.del::<_, ()>(&doomed).await.map_err(map_redis_error)?;
            conn.srem::<_, _, ()>(&tracking_key, &doomed)
                .await
                .map_err(map_redis_error)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn redis_url() -> String {
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string())
    }

    /// Skip test if Redis not available.
    async fn get_test_cache() -> Option<RedisCache> {
        RedisCache::new(&redis_url()).await.ok()
    }

    /// Unique namespace so parallel test runs never collide.
    fn test_key(suffix: &str) -> String {
        format!("test:redis_cache:{}:{}", Uuid::new_v4(), suffix)
    }

    #[tokio::test]
    async fn test_redis_set_and_get() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let key = test_key("set_get");

        cache.set(&key, b"hello", None).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some(b"hello".to_vec()));
        cache.delete(&key).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_get_nonexistent() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        assert_eq!(cache.get(&test_key("missing")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_redis_delete_is_idempotent() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let key = test_key("delete");

        cache.set(&key, b"x", None).await.unwrap();
        cache.delete(&key).await.unwrap();
        cache.delete(&key).await.unwrap();

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redis_ttl() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let key = test_key("ttl");

        cache
            .set(&key, b"expiring", Some(Duration::from_secs(1)))
            .await
            .unwrap();
        assert!(cache.get(&key).await.unwrap().is_some());

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(cache.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_redis_family_purge() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let ns = Uuid::new_v4();
        let items = format!("T{ns}:PAGE:aa:ITEMS");
        let count = format!("T{ns}:PAGE:aa:COUNT");
        let reservation = format!("T{ns}:RESERVATION:R-1");
        let tracking_key = family_tracking_key(&format!("T{ns}:PAGE:"));

        cache.set(&items, b"[]", None).await.unwrap();
        cache.set(&count, b"0", None).await.unwrap();
        cache.set(&reservation, b"{}", None).await.unwrap();

        let mut conn = cache.conn.clone();
        let tracked: Vec<String> = conn.smembers(&tracking_key).await.unwrap();
        assert_eq!(tracked.len(), 2);

        cache.delete_pattern(&format!("T{ns}:PAGE:*")).await.unwrap();

        assert!(cache.get(&items).await.unwrap().is_none());
        assert!(cache.get(&count).await.unwrap().is_none());
        assert!(cache.get(&reservation).await.unwrap().is_some());
        let tracked_after: Vec<String> = conn.smembers(&tracking_key).await.unwrap();
        assert!(tracked_after.is_empty());

        cache.delete(&reservation).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_untracked_pattern_scans() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };
        let ns = Uuid::new_v4();
        let a = format!("T{ns}:QUESTION:a:ACTIVE");
        let b = format!("T{ns}:QUESTION:a:DELETED");
        let other = format!("T{ns}:QUESTION:b:ACTIVE");

        cache.set(&a, b"1", None).await.unwrap();
        cache.set(&b, b"2", None).await.unwrap();
        cache.set(&other, b"3", None).await.unwrap();

        cache
            .delete_pattern(&format!("T{ns}:QUESTION:a:*"))
            .await
            .unwrap();

        assert!(cache.get(&a).await.unwrap().is_none());
        assert!(cache.get(&b).await.unwrap().is_none());
        assert!(cache.get(&other).await.unwrap().is_some());

        cache.delete(&other).await.unwrap();
    }

    #[tokio::test]
    async fn test_redis_delete_pattern_no_matches() {
        let Some(cache) = get_test_cache().await else {
            eprintln!("Skipping test: Redis not available");
            return;
        };

        let pattern = format!("T{}:PAGE:*", Uuid::new_v4());
        assert!(cache.delete_pattern(&pattern).await.is_ok());
    }
}
