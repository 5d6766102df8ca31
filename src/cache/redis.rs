//! Redis-backed result cache.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::ResultCache;
use crate::error::CacheError;

/// Result cache backed by Redis with native key expiry.
///
/// The connection manager reconnects automatically; cloning shares the
/// underlying connection, so one cache can serve every worker.
#[derive(Clone)]
pub struct RedisCache {
    redis: ConnectionManager,
}

impl RedisCache {
    /// Connects to Redis.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| CacheError::Connection(e.to_string()))?;
        let redis = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(Self { redis })
    }

    /// Wraps an existing connection manager.
    ///
    /// Useful when sharing a connection pool across components.
    pub fn from_connection(redis: ConnectionManager) -> Self {
        Self { redis }
    }
}

/// Expiry for `SET ... EX`. Redis rejects a zero expiry, so sub-second
/// durations round up to one second.
fn expiry_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl ResultCache for RedisCache {
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, value, expiry_seconds(ttl))
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.redis.clone();
        conn.get::<_, Option<Vec<u8>>>(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(())
    }
}
