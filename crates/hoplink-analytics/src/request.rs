/// Sentinel referrer for requests that arrived without one.
pub const DIRECT_REFERRER: &str = "Direct";

/// Sentinel for metadata the request did not carry.
pub const UNKNOWN: &str = "Unknown";

/// Transport-neutral request metadata captured at redirect time.
///
/// The gateway fills this from headers and the peer address; nothing
/// here depends on any particular HTTP framework.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    /// Raw `X-Forwarded-For` header value, comma-separated chain.
    pub forwarded_for: Option<String>,
    /// Raw `X-Real-IP` header value.
    pub real_ip: Option<String>,
    /// The socket peer address.
    pub remote_addr: Option<String>,
}

impl RequestMetadata {
    /// Resolves the client IP, preferring the forwarded chain over the
    /// socket address: first `X-Forwarded-For` entry, then `X-Real-IP`,
    /// then the peer address.
    pub fn client_ip(&self) -> String {
        self.forwarded_for
            .as_deref()
            .and_then(|chain| chain.split(',').next())
            .map(|ip| ip.trim().to_string())
            .filter(|ip| !ip.is_empty())
            .or_else(|| self.real_ip.clone())
            .or_else(|| self.remote_addr.clone())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    /// The referrer, or `"Direct"` when none was sent.
    pub fn referrer_or_direct(&self) -> String {
        self.referrer
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DIRECT_REFERRER.to_string())
    }

    /// The user-agent string, or `"Unknown"` when none was sent.
    pub fn user_agent_or_unknown(&self) -> String {
        self.user_agent
            .clone()
            .filter(|ua| !ua.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_for_wins_over_everything() {
        let meta = RequestMetadata {
            forwarded_for: Some("203.0.113.7, 10.0.0.1".to_string()),
            real_ip: Some("198.51.100.2".to_string()),
            remote_addr: Some("10.0.0.1".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.client_ip(), "203.0.113.7");
    }

    #[test]
    fn real_ip_beats_remote_addr() {
        let meta = RequestMetadata {
            real_ip: Some("198.51.100.2".to_string()),
            remote_addr: Some("10.0.0.1".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.client_ip(), "198.51.100.2");
    }

    #[test]
    fn falls_back_to_remote_addr_then_unknown() {
        let meta = RequestMetadata {
            remote_addr: Some("10.0.0.1".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.client_ip(), "10.0.0.1");
        assert_eq!(RequestMetadata::default().client_ip(), "Unknown");
    }

    #[test]
    fn empty_forwarded_entry_is_skipped() {
        let meta = RequestMetadata {
            forwarded_for: Some("  ".to_string()),
            remote_addr: Some("10.0.0.1".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.client_ip(), "10.0.0.1");
    }

    #[test]
    fn missing_referrer_is_direct() {
        assert_eq!(RequestMetadata::default().referrer_or_direct(), "Direct");

        let meta = RequestMetadata {
            referrer: Some("https://news.example.com/post".to_string()),
            ..Default::default()
        };
        assert_eq!(meta.referrer_or_direct(), "https://news.example.com/post");
    }
}
