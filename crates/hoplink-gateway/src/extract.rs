use axum::http::HeaderMap;
use std::net::SocketAddr;

use hoplink_analytics::RequestMetadata;

/// Captures the analytics-relevant parts of a request. Raw header
/// values only; precedence rules live in [`RequestMetadata`].
pub fn request_metadata(headers: &HeaderMap, remote_addr: SocketAddr) -> RequestMetadata {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };

    RequestMetadata {
        user_agent: header("user-agent"),
        referrer: header("referer").or_else(|| header("referrer")),
        forwarded_for: header("x-forwarded-for"),
        real_ip: header("x-real-ip"),
        remote_addr: Some(remote_addr.ip().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn addr() -> SocketAddr {
        "10.0.0.1:54321".parse().unwrap()
    }

    #[test]
    fn captures_headers_and_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("user-agent", HeaderValue::from_static("test-agent"));
        headers.insert("referer", HeaderValue::from_static("https://a.example.com"));
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );

        let meta = request_metadata(&headers, addr());
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent"));
        assert_eq!(meta.referrer.as_deref(), Some("https://a.example.com"));
        assert_eq!(meta.client_ip(), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_peer_address() {
        let meta = request_metadata(&HeaderMap::new(), addr());
        assert_eq!(meta.client_ip(), "10.0.0.1");
    }

    #[test]
    fn accepts_misspelled_referrer_header() {
        let mut headers = HeaderMap::new();
        headers.insert("referrer", HeaderValue::from_static("https://b.example.com"));

        let meta = request_metadata(&headers, addr());
        assert_eq!(meta.referrer.as_deref(), Some("https://b.example.com"));
    }
}
