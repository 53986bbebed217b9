use crate::shortcode::ShortCode;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// A stored link record.
///
/// The short code is the identity and never changes once assigned. Links
/// are soft-deleted only: `active` is cleared, the row stays, and click
/// events recorded against it remain readable for historical reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Link {
    /// The short code this link is addressed by.
    pub code: ShortCode,
    /// The destination URL to redirect to. Always `http` or `https`.
    pub destination: String,
    /// The user-requested alias, if this code was not generated.
    pub alias: Option<String>,
    /// Optional custom domain serving this link instead of the default.
    pub custom_domain: Option<String>,
    /// When the link was created.
    pub created_at: Timestamp,
    /// When the link expires, if ever.
    pub expires_at: Option<Timestamp>,
    /// Soft-delete flag. An expired link is treated as inactive even
    /// before this flag has been reconciled.
    pub active: bool,
    /// Total recorded clicks. Monotonically non-decreasing while active.
    pub clicks: u64,
    /// When the link was last resolved, if ever.
    pub last_accessed_at: Option<Timestamp>,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Pre-rendered QR artifact, if one was attached. Opaque here;
    /// rendering happens elsewhere.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub qr_artifact: Option<Vec<u8>>,
}

impl Link {
    /// Creates an active link with the given code and destination,
    /// stamped with the current time.
    pub fn new(code: ShortCode, destination: impl Into<String>) -> Self {
        Self {
            code,
            destination: destination.into(),
            alias: None,
            custom_domain: None,
            created_at: Timestamp::now(),
            expires_at: None,
            active: true,
            clicks: 0,
            last_accessed_at: None,
            tags: Vec::new(),
            qr_artifact: None,
        }
    }

    /// Whether the expiry timestamp, if any, is in the past.
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Whether the link may serve redirects: active and not expired.
    pub fn is_live(&self, now: Timestamp) -> bool {
        self.active && !self.is_expired(now)
    }
}

/// A single recorded click. Created once per successful redirect and
/// never mutated afterwards; events reference their link by code only,
/// so they outlive a soft-deleted link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    pub timestamp: Timestamp,
    pub ip: String,
    pub user_agent: String,
    /// Referrer URL, or the literal `"Direct"` when none was sent.
    pub referrer: String,
    pub device: String,
    pub browser: String,
    pub os: String,
    /// Country code, when some upstream collaborator resolved one.
    /// Nothing in this repository populates it.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub country: Option<String>,
}

/// Partial metadata update for a link. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct LinkMetaUpdate {
    pub tags: Option<Vec<String>>,
    pub custom_domain: Option<String>,
}

/// Sort key for [`ListQuery`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    #[default]
    CreatedAt,
    Clicks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Pagination, sorting, and filtering for active-link listings.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub offset: u64,
    pub limit: u64,
    pub sort_by: SortBy,
    pub order: SortOrder,
    /// Restrict to links carrying this tag.
    pub tag: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 20,
            sort_by: SortBy::default(),
            order: SortOrder::default(),
            tag: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jiff::SignedDuration;

    #[test]
    fn new_link_is_live() {
        let link = Link::new(ShortCode::new_unchecked("abc123"), "https://example.com");
        assert!(link.active);
        assert_eq!(link.clicks, 0);
        assert!(link.is_live(Timestamp::now()));
    }

    #[test]
    fn past_expiry_is_not_live_even_while_flagged_active() {
        let mut link = Link::new(ShortCode::new_unchecked("abc123"), "https://example.com");
        link.expires_at = Some(Timestamp::now() - SignedDuration::from_secs(1));
        assert!(link.active);
        assert!(link.is_expired(Timestamp::now()));
        assert!(!link.is_live(Timestamp::now()));
    }

    #[test]
    fn future_expiry_is_live() {
        let mut link = Link::new(ShortCode::new_unchecked("abc123"), "https://example.com");
        link.expires_at = Some(Timestamp::now() + SignedDuration::from_hours(1));
        assert!(link.is_live(Timestamp::now()));
    }

    #[test]
    fn inactive_link_is_not_live() {
        let mut link = Link::new(ShortCode::new_unchecked("abc123"), "https://example.com");
        link.active = false;
        assert!(!link.is_live(Timestamp::now()));
    }
}
