use crate::error::ResolveError;
use jiff::Timestamp;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use hoplink_analytics::{ClickRecorder, RequestMetadata};
use hoplink_core::{CachedLink, LinkCache, LinkStore, ShortCode};

/// Service answering redirects through a cache-aside read path.
///
/// Cache hits return immediately and hand the click to the background
/// recorder; the durable store's counters trail real traffic by the
/// queue depth, which is the accepted trade. Cache misses read the
/// store, repopulate the cache, and record the click before responding
/// so first-ever accesses are never lost.
pub struct ResolverService<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    recorder: ClickRecorder,
    cache_ttl: Duration,
}

// Not derived: the handles are shared, so cloning must not require the
// backends themselves to be cloneable.
impl<S, C> Clone for ResolverService<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            recorder: self.recorder.clone(),
            cache_ttl: self.cache_ttl,
        }
    }
}

impl<S: LinkStore, C: LinkCache> ResolverService<S, C> {
    pub fn new(
        store: Arc<S>,
        cache: Arc<C>,
        recorder: ClickRecorder,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            cache,
            recorder,
            cache_ttl,
        }
    }

    /// Resolves a short code to its destination URL.
    ///
    /// Every cache and store failure short of a store outage on the
    /// miss path degrades softly: a cache error reads as a miss, and
    /// only an unreachable store with nothing cached surfaces as
    /// [`ResolveError::Unavailable`].
    pub async fn resolve(
        &self,
        code: &ShortCode,
        meta: RequestMetadata,
    ) -> Result<String, ResolveError> {
        trace!(code = %code, "resolving short code");

        match self.cache.get(code).await {
            Ok(Some(entry)) => {
                debug!(code = %code, "cache hit");
                self.recorder.dispatch(code.clone(), meta);
                return Ok(entry.destination);
            }
            Ok(None) => {
                trace!(code = %code, "cache miss");
            }
            Err(e) => {
                warn!(code = %code, error = %e, "cache read failed, treating as miss");
            }
        }

        let link = self
            .store
            .find_by_code(code)
            .await
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?
            .ok_or_else(|| ResolveError::NotFound(code.to_string()))?;

        if !link.active {
            debug!(code = %code, "link is soft-deleted");
            return Err(ResolveError::NotFound(code.to_string()));
        }

        if link.is_expired(Timestamp::now()) {
            debug!(code = %code, "link expired, reconciling active flag");
            if let Err(e) = self.store.update_active_flag(code, false).await {
                warn!(code = %code, error = %e, "failed to reconcile expired link");
            }
            return Err(ResolveError::Expired(code.to_string()));
        }

        let entry = CachedLink::from_link(&link);
        if let Err(e) = self.cache.set_with_ttl(code, &entry, self.cache_ttl).await {
            warn!(code = %code, error = %e, "failed to repopulate cache");
        }

        // Cold-cache accesses record inline: a few milliseconds of
        // latency buys deterministic accounting for first hits.
        self.recorder.record_now(code, &meta).await;

        Ok(link.destination)
    }
}
