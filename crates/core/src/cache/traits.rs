use std::time::Duration;

use async_trait::async_trait;

use super::Result;

/// Key/value cache client shared by every store.
///
/// Implementations must be safe to call concurrently; the stores perform no
/// locking of their own.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Gets a value by key. Absent and expired entries are `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Sets a value, overwriting any existing entry, with an optional TTL.
    async fn set(&self, key: &str, value: &[u8], ttl: Option<Duration>) -> Result<()>;

    /// Deletes a value. Deleting an absent key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Deletes every key matching a glob pattern (e.g. `"MANGO:SURVEY:PAGE:*"`).
    /// Succeeds when nothing matches.
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;
}
