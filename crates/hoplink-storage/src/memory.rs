use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use jiff::Timestamp;
use std::sync::atomic::{AtomicU64, Ordering};

use hoplink_core::store::Result;
use hoplink_core::{
    ClickEvent, Link, LinkMetaUpdate, LinkStore, ListQuery, ShortCode, SortBy, SortOrder,
    StoreError,
};

/// In-memory implementation of the [`LinkStore`] contract using DashMap.
///
/// DashMap's sharded locks give concurrent readers and writers on
/// different buckets without a global lock, and its entry API provides
/// the atomic check-and-insert that `insert_unique` requires.
///
/// Rows are never physically removed: soft delete clears the active
/// flag, and click events stay readable after it.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    links: DashMap<String, Link>,
    events: DashMap<String, Vec<ClickEvent>>,
    counters: DashMap<String, u64>,
    reads: AtomicU64,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `find_by_code` calls served so far. Lets tests observe
    /// whether a resolve hit the store or was answered from cache.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Current click count for a code, without going through the async
    /// contract. Handy for polling on fire-and-forget writes.
    pub fn click_count(&self, code: &str) -> u64 {
        self.links.get(code).map(|l| l.clicks).unwrap_or(0)
    }

    /// Number of click events recorded for a code.
    pub fn event_count(&self, code: &str) -> usize {
        self.events.get(code).map(|e| e.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LinkStore for InMemoryStore {
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<Link>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.links.get(code.as_str()).map(|l| l.value().clone()))
    }

    async fn find_by_alias_or_code(&self, value: &str) -> Result<Option<Link>> {
        if let Some(link) = self.links.get(value) {
            return Ok(Some(link.value().clone()));
        }
        Ok(self
            .links
            .iter()
            .find(|l| l.alias.as_deref() == Some(value))
            .map(|l| l.value().clone()))
    }

    async fn find_by_destination(&self, destination: &str) -> Result<Option<Link>> {
        Ok(self
            .links
            .iter()
            .find(|l| l.active && l.destination == destination)
            .map(|l| l.value().clone()))
    }

    async fn insert_unique(&self, link: Link) -> Result<()> {
        let key = link.code.as_str().to_owned();
        match self.links.entry(key) {
            Entry::Occupied(_) => Err(StoreError::Conflict(link.code.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(link);
                Ok(())
            }
        }
    }

    async fn update_active_flag(&self, code: &ShortCode, active: bool) -> Result<()> {
        if let Some(mut link) = self.links.get_mut(code.as_str()) {
            link.active = active;
        }
        Ok(())
    }

    async fn update_meta(&self, code: &ShortCode, meta: LinkMetaUpdate) -> Result<()> {
        if let Some(mut link) = self.links.get_mut(code.as_str()) {
            if let Some(tags) = meta.tags {
                link.tags = tags;
            }
            if let Some(domain) = meta.custom_domain {
                link.custom_domain = Some(domain);
            }
        }
        Ok(())
    }

    async fn increment_clicks(&self, code: &ShortCode) -> Result<()> {
        if let Some(mut link) = self.links.get_mut(code.as_str()) {
            link.clicks += 1;
            link.last_accessed_at = Some(Timestamp::now());
        }
        Ok(())
    }

    async fn append_click_event(&self, code: &ShortCode, event: ClickEvent) -> Result<()> {
        self.events
            .entry(code.as_str().to_owned())
            .or_default()
            .push(event);
        Ok(())
    }

    async fn list_click_events(
        &self,
        code: &ShortCode,
        since: Timestamp,
    ) -> Result<Vec<ClickEvent>> {
        Ok(self
            .events
            .get(code.as_str())
            .map(|events| {
                events
                    .iter()
                    .filter(|e| e.timestamp >= since)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn count_active(&self) -> Result<u64> {
        Ok(self.links.iter().filter(|l| l.active).count() as u64)
    }

    async fn list_active(&self, query: ListQuery) -> Result<Vec<Link>> {
        let mut links: Vec<Link> = self
            .links
            .iter()
            .filter(|l| l.active)
            .filter(|l| {
                query
                    .tag
                    .as_ref()
                    .is_none_or(|tag| l.tags.iter().any(|t| t == tag))
            })
            .map(|l| l.value().clone())
            .collect();

        links.sort_by(|a, b| {
            let ordering = match query.sort_by {
                SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
                SortBy::Clicks => a.clicks.cmp(&b.clicks),
            };
            let ordering = match query.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            };
            // Stable tie-break so pagination never duplicates rows.
            ordering.then_with(|| a.code.as_str().cmp(b.code.as_str()))
        });

        Ok(links
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect())
    }

    async fn next_sequence(&self, namespace: &str) -> Result<u64> {
        let mut entry = self.counters.entry(namespace.to_owned()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn link(c: &str, destination: &str) -> Link {
        Link::new(code(c), destination)
    }

    fn event(secs_ago: i64) -> ClickEvent {
        ClickEvent {
            timestamp: Timestamp::now() - SignedDuration::from_secs(secs_ago),
            ip: "203.0.113.7".to_string(),
            user_agent: "test".to_string(),
            referrer: "Direct".to_string(),
            device: "desktop".to_string(),
            browser: "Firefox".to_string(),
            os: "Linux".to_string(),
            country: None,
        }
    }

    #[tokio::test]
    async fn insert_and_find() {
        let store = InMemoryStore::new();
        store
            .insert_unique(link("abc123", "https://example.com"))
            .await
            .unwrap();

        let found = store.find_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(found.destination, "https://example.com");
        assert_eq!(store.read_count(), 1);
    }

    #[tokio::test]
    async fn insert_conflict() {
        let store = InMemoryStore::new();
        store
            .insert_unique(link("abc123", "https://example.com"))
            .await
            .unwrap();

        let err = store
            .insert_unique(link("abc123", "https://other.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn conflict_covers_soft_deleted_rows() {
        let store = InMemoryStore::new();
        store
            .insert_unique(link("abc123", "https://example.com"))
            .await
            .unwrap();
        store
            .update_active_flag(&code("abc123"), false)
            .await
            .unwrap();

        let err = store
            .insert_unique(link("abc123", "https://other.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn find_by_alias_or_code_matches_both() {
        let store = InMemoryStore::new();
        let mut l = link("abc123", "https://example.com");
        l.alias = Some("my-alias".to_string());
        store.insert_unique(l).await.unwrap();

        assert!(store
            .find_by_alias_or_code("abc123")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_by_alias_or_code("my-alias")
            .await
            .unwrap()
            .is_some());
        assert!(store.find_by_alias_or_code("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn find_by_destination_skips_inactive() {
        let store = InMemoryStore::new();
        store
            .insert_unique(link("abc123", "https://example.com"))
            .await
            .unwrap();
        store
            .update_active_flag(&code("abc123"), false)
            .await
            .unwrap();

        assert!(store
            .find_by_destination("https://example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn increment_clicks_bumps_count_and_last_accessed() {
        let store = InMemoryStore::new();
        store
            .insert_unique(link("abc123", "https://example.com"))
            .await
            .unwrap();

        store.increment_clicks(&code("abc123")).await.unwrap();
        store.increment_clicks(&code("abc123")).await.unwrap();

        let found = store.find_by_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(found.clicks, 2);
        assert!(found.last_accessed_at.is_some());
    }

    #[tokio::test]
    async fn click_events_filter_by_since() {
        let store = InMemoryStore::new();
        let c = code("abc123");
        store.append_click_event(&c, event(3600)).await.unwrap();
        store.append_click_event(&c, event(10)).await.unwrap();

        let since = Timestamp::now() - SignedDuration::from_secs(60);
        let recent = store.list_click_events(&c, since).await.unwrap();
        assert_eq!(recent.len(), 1);
    }

    #[tokio::test]
    async fn events_survive_soft_delete() {
        let store = InMemoryStore::new();
        let c = code("abc123");
        store
            .insert_unique(link("abc123", "https://example.com"))
            .await
            .unwrap();
        store.append_click_event(&c, event(10)).await.unwrap();
        store.update_active_flag(&c, false).await.unwrap();

        let since = Timestamp::now() - SignedDuration::from_secs(3600);
        assert_eq!(store.list_click_events(&c, since).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn list_active_sorts_and_paginates() {
        let store = InMemoryStore::new();
        for (c, clicks) in [("aaa", 5), ("bbb", 9), ("ccc", 1)] {
            let mut l = link(c, &format!("https://{c}.example.com"));
            l.clicks = clicks;
            store.insert_unique(l).await.unwrap();
        }
        store.update_active_flag(&code("ccc"), false).await.unwrap();

        let query = ListQuery {
            sort_by: SortBy::Clicks,
            order: SortOrder::Desc,
            ..Default::default()
        };
        let listed = store.list_active(query).await.unwrap();
        let codes: Vec<&str> = listed.iter().map(|l| l.code.as_str()).collect();
        assert_eq!(codes, vec!["bbb", "aaa"]);
    }

    #[tokio::test]
    async fn list_active_filters_by_tag() {
        let store = InMemoryStore::new();
        let mut tagged = link("aaa", "https://a.example.com");
        tagged.tags = vec!["launch".to_string()];
        store.insert_unique(tagged).await.unwrap();
        store
            .insert_unique(link("bbb", "https://b.example.com"))
            .await
            .unwrap();

        let query = ListQuery {
            tag: Some("launch".to_string()),
            ..Default::default()
        };
        let listed = store.list_active(query).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].code.as_str(), "aaa");
    }

    #[tokio::test]
    async fn next_sequence_starts_at_one_and_increments() {
        let store = InMemoryStore::new();
        assert_eq!(store.next_sequence("url_codes").await.unwrap(), 1);
        assert_eq!(store.next_sequence("url_codes").await.unwrap(), 2);
        assert_eq!(store.next_sequence("other").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn concurrent_inserts_on_same_code_admit_exactly_one() {
        use std::sync::Arc;

        let store = Arc::new(InMemoryStore::new());
        let mut handles = vec![];
        for i in 0..32u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert_unique(link("abc123", &format!("https://example{i}.com")))
                    .await
                    .is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
