use crate::error::CacheError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub type Result<T> = std::result::Result<T, CacheError>;

/// The subset of a link that sits on the redirect hot path.
///
/// This is what gets serialized into the cache: just enough to answer a
/// redirect without touching the durable store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedLink {
    pub code: String,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub custom_domain: Option<String>,
}

impl CachedLink {
    pub fn from_link(link: &crate::link::Link) -> Self {
        Self {
            code: link.code.as_str().to_string(),
            destination: link.destination.clone(),
            custom_domain: link.custom_domain.clone(),
        }
    }
}

/// A volatile cache for resolved links, keyed by short code.
///
/// The cache may be unavailable at any time. Implementations report
/// failures through [`CacheError`], but callers must degrade every
/// failure to a miss (reads) or a no-op (writes) rather than propagate
/// it; a cache outage slows redirects down, it never breaks them.
#[async_trait]
pub trait LinkCache: Send + Sync + 'static {
    /// Gets the cached entry for a code. `Ok(None)` on a miss.
    async fn get(&self, code: &ShortCode) -> Result<Option<CachedLink>>;

    /// Stores an entry under a per-key expiry.
    async fn set_with_ttl(
        &self,
        code: &ShortCode,
        entry: &CachedLink,
        ttl: Duration,
    ) -> Result<()>;

    /// Removes the entry for a code. Not an error if absent.
    async fn delete(&self, code: &ShortCode) -> Result<()>;
}
