use crate::config::{AllocatorConfig, Strategy};
use crate::error::AllocationError;
use jiff::{SignedDuration, Timestamp};
use rand::Rng;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use hoplink_core::{base62, CachedLink, Link, LinkCache, LinkStore, ShortCode, StoreError};

/// Counter namespace backing the sequential strategy. Created lazily by
/// the store on first increment.
const CODE_COUNTER: &str = "url_codes";

/// Expiration policy for a new link.
#[derive(Debug, Clone, Default)]
pub enum ExpirationPolicy {
    /// The link never expires.
    #[default]
    Never,
    /// The link expires after a certain duration from now.
    AfterDuration(SignedDuration),
    /// The link expires at a specific timestamp.
    AtTimestamp(Timestamp),
}

impl ExpirationPolicy {
    fn resolve(&self, now: Timestamp) -> Option<Timestamp> {
        match self {
            ExpirationPolicy::Never => None,
            ExpirationPolicy::AfterDuration(duration) => Some(now + *duration),
            ExpirationPolicy::AtTimestamp(at) => Some(*at),
        }
    }
}

/// Parameters for allocating a short code.
#[derive(Debug, Clone)]
pub struct AllocateParams {
    /// The destination URL. Must parse as `http` or `https`.
    pub destination: String,
    /// Optional custom alias. Validated against the short-code rules.
    pub alias: Option<String>,
    /// When the link should expire.
    pub expiration: ExpirationPolicy,
    /// Optional custom domain serving this link.
    pub custom_domain: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

impl AllocateParams {
    /// Shorthand for allocating a plain, never-expiring link.
    pub fn for_destination(destination: impl Into<String>) -> Self {
        Self {
            destination: destination.into(),
            alias: None,
            expiration: ExpirationPolicy::Never,
            custom_domain: None,
            tags: Vec::new(),
        }
    }
}

/// The outcome of an allocation request.
///
/// `Existing` is returned when the destination was already shortened
/// and no custom alias was requested; callers typically map the two
/// variants to 201 vs 200.
#[derive(Debug, Clone)]
pub enum Allocation {
    Created(Link),
    Existing(Link),
}

impl Allocation {
    pub fn link(&self) -> &Link {
        match self {
            Allocation::Created(link) | Allocation::Existing(link) => link,
        }
    }

    pub fn into_link(self) -> Link {
        match self {
            Allocation::Created(link) | Allocation::Existing(link) => link,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Allocation::Created(_))
    }
}

/// The code allocator.
///
/// Guarantees that no two live links share a code. The pre-insert
/// existence checks are an optimization; the store's unique-insert
/// semantics are what actually arbitrate races between concurrent
/// allocators.
#[derive(Debug)]
pub struct AllocatorService<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    config: AllocatorConfig,
}

// Not derived: the handles are shared, so cloning must not require the
// backends themselves to be cloneable.
impl<S, C> Clone for AllocatorService<S, C> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
            config: self.config.clone(),
        }
    }
}

impl<S: LinkStore, C: LinkCache> AllocatorService<S, C> {
    pub fn new(store: Arc<S>, cache: Arc<C>, config: AllocatorConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Allocates a short code for a destination URL and persists the
    /// link record.
    ///
    /// With a requested alias, the alias is validated and checked
    /// against every existing code and alias, soft-deleted links
    /// included; reusing a dead link's code would make its click
    /// history ambiguous. Without an alias, an already-shortened
    /// destination is returned as-is instead of allocating a second
    /// code.
    pub async fn allocate(&self, params: AllocateParams) -> Result<Allocation, AllocationError> {
        validate_destination(&params.destination)?;

        let code = match &params.alias {
            Some(alias) => {
                let code = ShortCode::new(alias.clone())
                    .map_err(|e| AllocationError::AliasInvalid(e.to_string()))?;
                if self.store.find_by_alias_or_code(code.as_str()).await?.is_some() {
                    return Err(AllocationError::AliasTaken(code.to_string()));
                }
                code
            }
            None => {
                if let Some(existing) =
                    self.store.find_by_destination(&params.destination).await?
                {
                    debug!(code = %existing.code, "destination already shortened");
                    return Ok(Allocation::Existing(existing));
                }
                match self.config.strategy {
                    Strategy::Sequential => self.next_sequential_code().await?,
                    Strategy::Random => return self.allocate_random(&params).await,
                }
            }
        };

        let link = self.build_link(code, &params);
        match self.store.insert_unique(link.clone()).await {
            Ok(()) => {}
            // An alias race lost at insert time reads the same as one
            // caught by the pre-check.
            Err(StoreError::Conflict(code)) if params.alias.is_some() => {
                return Err(AllocationError::AliasTaken(code));
            }
            Err(e) => return Err(AllocationError::Store(e)),
        }

        self.populate_cache(&link).await;
        Ok(Allocation::Created(link))
    }

    /// Soft-deletes a link: clears the active flag and drops the cache
    /// entry. Returns `false` when the code was never allocated.
    pub async fn deactivate(&self, code: &ShortCode) -> Result<bool, AllocationError> {
        if self.store.find_by_code(code).await?.is_none() {
            return Ok(false);
        }
        self.store.update_active_flag(code, false).await?;

        if let Err(e) = self.cache.delete(code).await {
            warn!(code = %code, error = %e, "failed to drop cache entry on deactivate");
        }
        Ok(true)
    }

    async fn next_sequential_code(&self) -> Result<ShortCode, AllocationError> {
        let seq = self.store.next_sequence(CODE_COUNTER).await?;
        Ok(ShortCode::new_unchecked(base62::encode(seq)))
    }

    async fn allocate_random(
        &self,
        params: &AllocateParams,
    ) -> Result<Allocation, AllocationError> {
        for attempt in 0..self.config.max_retries {
            let code = ShortCode::new_unchecked(random_code(self.config.code_length));

            if self.store.find_by_alias_or_code(code.as_str()).await?.is_some() {
                debug!(code = %code, attempt, "random code collision, redrawing");
                continue;
            }

            let link = self.build_link(code, params);
            match self.store.insert_unique(link.clone()).await {
                Ok(()) => {
                    self.populate_cache(&link).await;
                    return Ok(Allocation::Created(link));
                }
                // Lost the race to a concurrent allocator; the draw is
                // spent, redraw.
                Err(StoreError::Conflict(_)) => {
                    debug!(code = %link.code, attempt, "insert raced, redrawing");
                    continue;
                }
                Err(e) => return Err(AllocationError::Store(e)),
            }
        }

        Err(AllocationError::Exhausted {
            attempts: self.config.max_retries,
        })
    }

    fn build_link(&self, code: ShortCode, params: &AllocateParams) -> Link {
        let now = Timestamp::now();
        Link {
            alias: params.alias.clone(),
            custom_domain: params.custom_domain.clone(),
            expires_at: params.expiration.resolve(now),
            created_at: now,
            tags: params.tags.clone(),
            ..Link::new(code, params.destination.clone())
        }
    }

    /// Cache population is best-effort: a write failure slows the next
    /// resolve down, it never fails the allocation.
    async fn populate_cache(&self, link: &Link) {
        let entry = CachedLink::from_link(link);
        if let Err(e) = self
            .cache
            .set_with_ttl(&link.code, &entry, self.config.cache_ttl)
            .await
        {
            warn!(code = %link.code, error = %e, "failed to populate cache after allocation");
        }
    }
}

fn validate_destination(destination: &str) -> Result<(), AllocationError> {
    let parsed = Url::parse(destination)
        .map_err(|e| AllocationError::InvalidUrl(format!("{destination}: {e}")))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AllocationError::InvalidUrl(format!(
            "scheme must be http or https, got {other}"
        ))),
    }
}

/// Draws a fixed-length code uniformly from the base62 alphabet.
fn random_code(length: usize) -> String {
    let mut rng = rand::rng();
    (0..length)
        .map(|_| base62::ALPHABET[rng.random_range(0..base62::ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use hoplink_cache::MokaLinkCache;
    use hoplink_core::{CacheError, ClickEvent, LinkMetaUpdate, ListQuery};
    use hoplink_storage::InMemoryStore;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn service(
        config: AllocatorConfig,
    ) -> AllocatorService<InMemoryStore, MokaLinkCache> {
        AllocatorService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(MokaLinkCache::new()),
            config,
        )
    }

    fn sequential() -> AllocatorService<InMemoryStore, MokaLinkCache> {
        service(AllocatorConfig::default())
    }

    fn random() -> AllocatorService<InMemoryStore, MokaLinkCache> {
        service(
            AllocatorConfig::builder()
                .strategy(Strategy::Random)
                .build(),
        )
    }

    #[tokio::test]
    async fn sequential_codes_are_distinct_and_increasing() {
        let service = sequential();

        let mut previous = None;
        for _ in 0..5 {
            let allocation = service
                .allocate(AllocateParams::for_destination(format!(
                    "https://example.com/{}",
                    previous.unwrap_or(0)
                )))
                .await
                .unwrap();
            let value = base62::decode(allocation.link().code.as_str()).unwrap();
            if let Some(prev) = previous {
                assert!(value > prev);
            }
            previous = Some(value);
        }
    }

    #[tokio::test]
    async fn first_sequential_code_encodes_counter_one() {
        let service = sequential();
        let allocation = service
            .allocate(AllocateParams::for_destination("https://example.com"))
            .await
            .unwrap();
        assert_eq!(allocation.link().code.as_str(), "1");
    }

    #[tokio::test]
    async fn custom_alias_is_used_verbatim() {
        let service = sequential();
        let allocation = service
            .allocate(AllocateParams {
                alias: Some("my-alias".to_string()),
                ..AllocateParams::for_destination("https://example.com")
            })
            .await
            .unwrap();

        assert!(allocation.is_created());
        assert_eq!(allocation.link().code.as_str(), "my-alias");
        assert_eq!(allocation.link().alias.as_deref(), Some("my-alias"));
    }

    #[tokio::test]
    async fn duplicate_alias_fails() {
        let service = sequential();
        let params = AllocateParams {
            alias: Some("my-alias".to_string()),
            ..AllocateParams::for_destination("https://example.com")
        };

        service.allocate(params.clone()).await.unwrap();
        let err = service.allocate(params).await.unwrap_err();
        assert!(matches!(err, AllocationError::AliasTaken(_)));
    }

    #[tokio::test]
    async fn alias_of_soft_deleted_link_stays_taken() {
        let service = sequential();
        let params = AllocateParams {
            alias: Some("my-alias".to_string()),
            ..AllocateParams::for_destination("https://example.com")
        };
        let allocation = service.allocate(params.clone()).await.unwrap();
        service
            .deactivate(&allocation.link().code)
            .await
            .unwrap();

        let err = service.allocate(params).await.unwrap_err();
        assert!(matches!(err, AllocationError::AliasTaken(_)));
    }

    #[tokio::test]
    async fn malformed_alias_fails() {
        let service = sequential();
        for alias in ["ab", "way-too-long-for-an-alias", "has space"] {
            let err = service
                .allocate(AllocateParams {
                    alias: Some(alias.to_string()),
                    ..AllocateParams::for_destination("https://example.com")
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AllocationError::AliasInvalid(_)), "{alias}");
        }
    }

    #[tokio::test]
    async fn invalid_destination_fails() {
        let service = sequential();
        for destination in ["not-a-url", "ftp://example.com/file", ""] {
            let err = service
                .allocate(AllocateParams::for_destination(destination))
                .await
                .unwrap_err();
            assert!(matches!(err, AllocationError::InvalidUrl(_)), "{destination}");
        }
    }

    #[tokio::test]
    async fn repeated_destination_returns_existing_link() {
        let service = sequential();
        let first = service
            .allocate(AllocateParams::for_destination("https://example.com"))
            .await
            .unwrap();
        let second = service
            .allocate(AllocateParams::for_destination("https://example.com"))
            .await
            .unwrap();

        assert!(first.is_created());
        assert!(!second.is_created());
        assert_eq!(first.link().code, second.link().code);
    }

    #[tokio::test]
    async fn random_codes_have_configured_length() {
        let service = random();
        let allocation = service
            .allocate(AllocateParams::for_destination("https://example.com"))
            .await
            .unwrap();
        assert_eq!(allocation.link().code.as_str().len(), 6);
    }

    #[tokio::test]
    async fn allocation_populates_cache() {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(MokaLinkCache::new());
        let service = AllocatorService::new(
            Arc::clone(&store),
            Arc::clone(&cache),
            AllocatorConfig::default(),
        );

        let allocation = service
            .allocate(AllocateParams::for_destination("https://example.com"))
            .await
            .unwrap();

        let cached = cache.get(&allocation.link().code).await.unwrap().unwrap();
        assert_eq!(cached.destination, "https://example.com");
    }

    #[tokio::test]
    async fn cache_failure_does_not_fail_allocation() {
        struct BrokenCache;

        #[async_trait]
        impl LinkCache for BrokenCache {
            async fn get(
                &self,
                _code: &ShortCode,
            ) -> Result<Option<CachedLink>, CacheError> {
                Err(CacheError::Unavailable("down".to_string()))
            }
            async fn set_with_ttl(
                &self,
                _code: &ShortCode,
                _entry: &CachedLink,
                _ttl: std::time::Duration,
            ) -> Result<(), CacheError> {
                Err(CacheError::Unavailable("down".to_string()))
            }
            async fn delete(&self, _code: &ShortCode) -> Result<(), CacheError> {
                Err(CacheError::Unavailable("down".to_string()))
            }
        }

        let service = AllocatorService::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(BrokenCache),
            AllocatorConfig::default(),
        );

        let allocation = service
            .allocate(AllocateParams::for_destination("https://example.com"))
            .await
            .unwrap();
        assert!(allocation.is_created());
    }

    #[tokio::test]
    async fn deactivate_clears_flag_and_reports_unknown_codes() {
        let service = sequential();
        let allocation = service
            .allocate(AllocateParams::for_destination("https://example.com"))
            .await
            .unwrap();
        let code = allocation.link().code.clone();

        assert!(service.deactivate(&code).await.unwrap());
        assert!(!service
            .deactivate(&ShortCode::new_unchecked("missing"))
            .await
            .unwrap());
    }

    /// Store wrapper that reports the first `n` existence checks as
    /// collisions, then delegates.
    struct CollidingStore {
        inner: InMemoryStore,
        remaining: AtomicU32,
    }

    impl CollidingStore {
        fn new(collisions: u32) -> Self {
            Self {
                inner: InMemoryStore::new(),
                remaining: AtomicU32::new(collisions),
            }
        }
    }

    #[async_trait]
    impl LinkStore for CollidingStore {
        async fn find_by_code(
            &self,
            code: &ShortCode,
        ) -> Result<Option<Link>, StoreError> {
            self.inner.find_by_code(code).await
        }

        async fn find_by_alias_or_code(
            &self,
            value: &str,
        ) -> Result<Option<Link>, StoreError> {
            let remaining = self.remaining.load(Ordering::SeqCst);
            if remaining > 0 {
                self.remaining.store(remaining - 1, Ordering::SeqCst);
                return Ok(Some(Link::new(
                    ShortCode::new_unchecked(value),
                    "https://taken.example.com",
                )));
            }
            self.inner.find_by_alias_or_code(value).await
        }

        async fn find_by_destination(
            &self,
            destination: &str,
        ) -> Result<Option<Link>, StoreError> {
            self.inner.find_by_destination(destination).await
        }

        async fn insert_unique(&self, link: Link) -> Result<(), StoreError> {
            self.inner.insert_unique(link).await
        }

        async fn update_active_flag(
            &self,
            code: &ShortCode,
            active: bool,
        ) -> Result<(), StoreError> {
            self.inner.update_active_flag(code, active).await
        }

        async fn update_meta(
            &self,
            code: &ShortCode,
            meta: LinkMetaUpdate,
        ) -> Result<(), StoreError> {
            self.inner.update_meta(code, meta).await
        }

        async fn increment_clicks(&self, code: &ShortCode) -> Result<(), StoreError> {
            self.inner.increment_clicks(code).await
        }

        async fn append_click_event(
            &self,
            code: &ShortCode,
            event: ClickEvent,
        ) -> Result<(), StoreError> {
            self.inner.append_click_event(code, event).await
        }

        async fn list_click_events(
            &self,
            code: &ShortCode,
            since: Timestamp,
        ) -> Result<Vec<ClickEvent>, StoreError> {
            self.inner.list_click_events(code, since).await
        }

        async fn count_active(&self) -> Result<u64, StoreError> {
            self.inner.count_active().await
        }

        async fn list_active(&self, query: ListQuery) -> Result<Vec<Link>, StoreError> {
            self.inner.list_active(query).await
        }

        async fn next_sequence(&self, namespace: &str) -> Result<u64, StoreError> {
            self.inner.next_sequence(namespace).await
        }
    }

    #[tokio::test]
    async fn random_retries_past_collisions() {
        let service = AllocatorService::new(
            Arc::new(CollidingStore::new(3)),
            Arc::new(MokaLinkCache::new()),
            AllocatorConfig::builder().strategy(Strategy::Random).build(),
        );

        let allocation = service
            .allocate(AllocateParams::for_destination("https://example.com"))
            .await
            .unwrap();
        assert!(allocation.is_created());
    }

    #[tokio::test]
    async fn random_exhausts_retry_budget() {
        let service = AllocatorService::new(
            Arc::new(CollidingStore::new(10)),
            Arc::new(MokaLinkCache::new()),
            AllocatorConfig::builder().strategy(Strategy::Random).build(),
        );

        let err = service
            .allocate(AllocateParams::for_destination("https://example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AllocationError::Exhausted { attempts: 10 }));
    }

    #[tokio::test]
    async fn concurrent_random_allocations_yield_distinct_codes() {
        let store = Arc::new(InMemoryStore::new());
        let service = Arc::new(AllocatorService::new(
            Arc::clone(&store),
            Arc::new(MokaLinkCache::new()),
            AllocatorConfig::builder().strategy(Strategy::Random).build(),
        ));

        let mut handles = vec![];
        for i in 0..100u32 {
            let service = Arc::clone(&service);
            handles.push(tokio::spawn(async move {
                service
                    .allocate(AllocateParams::for_destination(format!(
                        "https://example.com/page/{i}"
                    )))
                    .await
                    .unwrap()
                    .into_link()
                    .code
            }));
        }

        let mut codes = std::collections::HashSet::new();
        for handle in handles {
            codes.insert(handle.await.unwrap());
        }
        assert_eq!(codes.len(), 100);
    }
}
