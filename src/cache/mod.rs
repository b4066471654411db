//! Cache of derived listing and reservation results.
//!
//! Keys are partitioned by prefix (see [`partition`]). Eviction is by glob
//! pattern: enumerate the matching keys, then delete them as one batch. A
//! value populated between those two steps survives the sweep; that window is
//! accepted, and the next invalidation event for the partition clears it.

mod glob;
mod memory;
pub mod partition;
mod redis;

pub use glob::glob_match;
pub use memory::InMemoryCache;
pub use redis::RedisCache;

use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache connection error: {0}")]
    Connection(String),
    #[error("cache command error: {0}")]
    Command(String),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Keys matching a Redis-style glob pattern.
    async fn keys(&self, pattern: &str) -> Result<Vec<String>, CacheError>;

    /// Delete a batch of keys; returns how many existed. Absent keys are not an error.
    async fn delete_many(&self, keys: &[String]) -> Result<usize, CacheError>;

    /// Scan-then-delete every key matching `pattern`. Zero matches is `Ok(0)`.
    async fn invalidate_pattern(&self, pattern: &str) -> Result<usize, CacheError> {
        let keys = self.keys(pattern).await?;
        if keys.is_empty() {
            return Ok(0);
        }
        self.delete_many(&keys).await
    }
}
