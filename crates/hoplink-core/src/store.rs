use crate::error::StoreError;
use crate::link::{ClickEvent, Link, LinkMetaUpdate, ListQuery};
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;

pub type Result<T> = std::result::Result<T, StoreError>;

/// The durable store behind the shortener.
///
/// Implementations persist link records and click events, and must
/// enforce short-code uniqueness on insert: that constraint, not any
/// pre-insert existence check, is what keeps concurrent allocators from
/// ever sharing a code.
///
/// Lookup methods return soft-deleted rows as well; filtering on the
/// `active` flag is the caller's concern (the redirector maps an
/// inactive row to `NotFound`, the allocator refuses to reuse its code).
/// The one exception is [`find_by_destination`][Self::find_by_destination],
/// which only matches live links so that create-path dedup can never
/// resurrect a deleted one.
#[async_trait]
pub trait LinkStore: Send + Sync + 'static {
    /// Retrieves the link for a given short code, regardless of its
    /// active flag. Returns `None` if the code was never allocated.
    async fn find_by_code(&self, code: &ShortCode) -> Result<Option<Link>>;

    /// Retrieves a link whose code *or* alias equals `value`, including
    /// soft-deleted rows. Used to decide whether an alias is taken.
    async fn find_by_alias_or_code(&self, value: &str) -> Result<Option<Link>>;

    /// Retrieves an active link pointing at `destination`, if any.
    async fn find_by_destination(&self, destination: &str) -> Result<Option<Link>>;

    /// Inserts a new link. Returns `Err(Conflict)` if the code already
    /// exists; at most one of any set of concurrent writers for the same
    /// code succeeds.
    async fn insert_unique(&self, link: Link) -> Result<()>;

    /// Sets the active flag. Setting `false` is the soft delete.
    async fn update_active_flag(&self, code: &ShortCode, active: bool) -> Result<()>;

    /// Applies a partial metadata update to an existing link.
    async fn update_meta(&self, code: &ShortCode, meta: LinkMetaUpdate) -> Result<()>;

    /// Atomically increments the click count and stamps
    /// `last_accessed_at`. Concurrent increments are never lost; this is
    /// the unit of serialization for a single link's counter.
    async fn increment_clicks(&self, code: &ShortCode) -> Result<()>;

    /// Appends a click event for the given code.
    async fn append_click_event(&self, code: &ShortCode, event: ClickEvent) -> Result<()>;

    /// Lists click events for a code with `timestamp >= since`.
    async fn list_click_events(&self, code: &ShortCode, since: Timestamp)
        -> Result<Vec<ClickEvent>>;

    /// Counts links whose active flag is set.
    async fn count_active(&self) -> Result<u64>;

    /// Lists active links with pagination, sorting, and tag filtering.
    async fn list_active(&self, query: ListQuery) -> Result<Vec<Link>>;

    /// Atomically increments the named counter and returns the new
    /// value. The counter is created at zero on first use, so the first
    /// call returns 1. Never decremented.
    async fn next_sequence(&self, namespace: &str) -> Result<u64>;
}
