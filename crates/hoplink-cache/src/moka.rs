use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use hoplink_core::cache::Result;
use hoplink_core::{CachedLink, LinkCache, ShortCode};

/// Expiry policy that reads each entry's TTL out of the stored value,
/// so different keys can carry different lifetimes in one cache.
struct PerEntryTtl;

impl Expiry<String, (CachedLink, Duration)> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &(CachedLink, Duration),
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.1)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &(CachedLink, Duration),
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.1)
    }
}

/// An in-memory cache implementation using Moka.
///
/// This implementation stores link entries in a concurrent in-memory
/// cache with per-key expiry. It's ideal for single-node deployments
/// where a Redis round-trip buys nothing.
#[derive(Debug, Clone)]
pub struct MokaLinkCache {
    cache: Cache<String, (CachedLink, Duration)>,
}

impl MokaLinkCache {
    /// Creates a new Moka link cache with the default maximum capacity
    /// of 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    /// Creates a new Moka link cache with a custom maximum capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MokaLinkCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LinkCache for MokaLinkCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<CachedLink>> {
        let key = code.as_str().to_string();
        match self.cache.get(&key).await {
            Some((entry, _)) => {
                debug!(code = %code, "cache hit in Moka");
                Ok(Some(entry))
            }
            None => {
                trace!(code = %code, "cache miss in Moka");
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
        let key = code.as_str().to_string();
        self.cache.insert(key, (entry.clone(), ttl)).await;
        trace!(code = %code, ttl_secs = ttl.as_secs(), "cached entry in Moka");
        Ok(())
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        let key = code.as_str().to_string();
        self.cache.invalidate(&key).await;
        trace!(code = %code, "removed entry from Moka cache");
        Ok(())
    }
}
