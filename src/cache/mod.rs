//! Result cache: TTL-backed key/value storage for serialized outputs.
//!
//! Terminal results are stored under a deterministic key derived from the
//! raw task name. Writes are last-writer-wins with no cross-run locking,
//! so two runs sharing a name race on the same key and a reader observes
//! whichever finished last.
//!
//! Two backends implement the same trait:
//!
//! - [`MemoryCache`]: process-local, used when no Redis URL is configured
//! - [`RedisCache`]: shared across processes, with native key expiry

use std::time::Duration;

use async_trait::async_trait;

use crate::error::CacheError;

pub mod memory;
pub mod redis;

pub use memory::MemoryCache;
pub use redis::RedisCache;

/// Key prefix shared with the download surface.
const RESULT_KEY_PREFIX: &str = "processed_images_";

/// Cache key for a task's serialized result.
///
/// Uses the raw task name, not the timestamped result name, so a caller
/// that submitted the task can retrieve the blob without knowing when the
/// run started.
pub fn result_key(task_name: &str) -> String {
    format!("{RESULT_KEY_PREFIX}{task_name}")
}

/// TTL-backed key/value store holding serialized final outputs.
#[async_trait]
pub trait ResultCache: Send + Sync {
    /// Stores `value` under `key` for `ttl`. Overwrites silently.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Fetches the value for `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Removes `key` if present.
    async fn remove(&self, key: &str) -> Result<(), CacheError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_key_uses_raw_task_name() {
        assert_eq!(result_key("batch-7"), "processed_images_batch-7");
        assert_eq!(result_key(""), "processed_images_");
    }
}
