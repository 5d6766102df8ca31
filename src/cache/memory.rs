//! In-process result cache.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::ResultCache;
use crate::error::CacheError;

#[derive(Debug)]
struct CacheEntry {
    value: Vec<u8>,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_live(&self) -> bool {
        self.created_at.elapsed() < self.ttl
    }
}

/// TTL cache backed by a process-local map.
///
/// Thread-safe via interior mutability. Expired entries are purged
/// opportunistically on every write, so the map does not grow without
/// bound under a write-heavy load.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.read().expect("cache read lock poisoned");
        entries.values().filter(|entry| entry.is_live()).count()
    }

    /// Whether the cache holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops expired entries and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().expect("cache write lock poisoned");
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live());
        before - entries.len()
    }
}

#[async_trait]
impl ResultCache for MemoryCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().expect("cache write lock poisoned");
        entries.retain(|_, entry| entry.is_live());
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let entries = self.entries.read().expect("cache read lock poisoned");
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live())
            .map(|entry| entry.value.clone()))
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.write().expect("cache write lock poisoned");
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_then_get_returns_identical_bytes() {
        let cache = MemoryCache::new();
        let blob = b"serialized result".to_vec();

        cache
            .set("processed_images_batch", blob.clone(), Duration::from_secs(60))
            .await
            .expect("set");
        let fetched = cache.get("processed_images_batch").await.expect("get");

        assert_eq!(fetched, Some(blob));
    }

    #[tokio::test]
    async fn test_get_after_ttl_is_none() {
        let cache = MemoryCache::new();
        cache
            .set("key", b"v".to_vec(), Duration::from_millis(20))
            .await
            .expect("set");

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.get("key").await.expect("get"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_is_last_writer_wins() {
        let cache = MemoryCache::new();
        cache
            .set("key", b"first".to_vec(), Duration::from_secs(60))
            .await
            .expect("set");
        cache
            .set("key", b"second".to_vec(), Duration::from_secs(60))
            .await
            .expect("set");

        assert_eq!(
            cache.get("key").await.expect("get"),
            Some(b"second".to_vec())
        );
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_deletes_entry() {
        let cache = MemoryCache::new();
        cache
            .set("key", b"v".to_vec(), Duration::from_secs(60))
            .await
            .expect("set");
        cache.remove("key").await.expect("remove");

        assert_eq!(cache.get("key").await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_purge_expired_counts_removed() {
        let cache = MemoryCache::new();
        cache
            .set("stale", b"v".to_vec(), Duration::from_millis(10))
            .await
            .expect("set");
        cache
            .set("fresh", b"v".to_vec(), Duration::from_secs(60))
            .await
            .expect("set");

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
