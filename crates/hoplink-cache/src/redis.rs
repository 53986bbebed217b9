use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::{debug, trace, warn};

use hoplink_core::cache::Result;
use hoplink_core::{CacheError, CachedLink, LinkCache, ShortCode};

const DEFAULT_KEY_PREFIX: &str = "hl:link:";

/// A Redis implementation of [`LinkCache`].
///
/// Entries are stored as JSON strings under `SET ... EX`, so the server
/// owns the per-key expiry. A corrupt payload is logged and reported as
/// a miss rather than an error; the durable store is the source of
/// truth, the cache only has to be fast.
#[derive(Debug, Clone)]
pub struct RedisLinkCache {
    conn: redis::aio::MultiplexedConnection,
    key_prefix: String,
}

impl RedisLinkCache {
    /// Creates a new Redis link cache with the default key prefix.
    pub fn new(conn: redis::aio::MultiplexedConnection) -> Self {
        Self::with_prefix(conn, DEFAULT_KEY_PREFIX)
    }

    /// Creates a new Redis link cache with a custom key prefix
    /// (e.g. `"myapp:link:"`).
    pub fn with_prefix(
        conn: redis::aio::MultiplexedConnection,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            conn,
            key_prefix: key_prefix.into(),
        }
    }

    /// Connects to the given Redis URL and returns a cache over a
    /// multiplexed connection.
    pub async fn connect(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Unavailable(e.to_string()))?;
        Ok(Self::new(conn))
    }

    fn cache_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.key_prefix, code.as_str())
    }
}

#[async_trait]
impl LinkCache for RedisLinkCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<CachedLink>> {
        let key = self.cache_key(code);
        let mut conn = self.conn.clone();

        let cached: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;

        let Some(payload) = cached else {
            trace!(code = %code, "cache miss in Redis");
            return Ok(None);
        };

        match serde_json::from_str::<CachedLink>(&payload) {
            Ok(entry) => {
                debug!(code = %code, "cache hit in Redis");
                Ok(Some(entry))
            }
            Err(e) => {
                warn!(code = %code, error = %e, "failed to deserialize cached entry, treating as miss");
                Ok(None)
            }
        }
    }

    async fn set_with_ttl(
        &self,
        code: &ShortCode,
        entry: &CachedLink,
        ttl: Duration,
    ) -> Result<()> {
        let key = self.cache_key(code);
        let payload =
            serde_json::to_string(entry).map_err(|e| CacheError::Serialization(e.to_string()))?;

        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(&key, payload, ttl.as_secs())
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;

        trace!(code = %code, ttl_secs = ttl.as_secs(), "cached entry in Redis");
        Ok(())
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        let key = self.cache_key(code);
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(&key)
            .await
            .map_err(|e| CacheError::Operation(e.to_string()))?;

        trace!(code = %code, "removed entry from Redis cache");
        Ok(())
    }
}
