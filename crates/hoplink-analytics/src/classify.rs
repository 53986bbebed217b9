use crate::request::UNKNOWN;
use woothee::parser::Parser;

/// Device/browser/OS classification derived from a user-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UaProfile {
    pub device: String,
    pub browser: String,
    pub os: String,
}

impl Default for UaProfile {
    fn default() -> Self {
        Self {
            device: "desktop".to_string(),
            browser: UNKNOWN.to_string(),
            os: UNKNOWN.to_string(),
        }
    }
}

/// The classification ruleset seam.
///
/// The ruleset itself is an external collaborator; this trait keeps the
/// recorder testable with a canned classifier.
pub trait UaClassifier: Send + Sync + 'static {
    fn classify(&self, user_agent: &str) -> UaProfile;
}

/// Woothee-backed classifier.
pub struct WootheeClassifier;

// Woothee reports unmatched fields with this literal.
const WOOTHEE_UNKNOWN: &str = "UNKNOWN";

impl UaClassifier for WootheeClassifier {
    fn classify(&self, user_agent: &str) -> UaProfile {
        let parser = Parser::new();
        let Some(result) = parser.parse(user_agent) else {
            return UaProfile::default();
        };

        UaProfile {
            device: device_label(result.category),
            browser: known_or_unknown(result.name),
            os: known_or_unknown(result.os),
        }
    }
}

fn known_or_unknown(value: &str) -> String {
    if value.is_empty() || value == WOOTHEE_UNKNOWN {
        UNKNOWN.to_string()
    } else {
        value.to_string()
    }
}

/// Collapses woothee's categories to the device labels the reports use.
/// Anything unrecognized counts as desktop, matching the upstream
/// classifier's own fallback.
fn device_label(category: &str) -> String {
    match category {
        "smartphone" | "mobilephone" => "mobile",
        "appliance" => "appliance",
        "crawler" => "bot",
        _ => "desktop",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_DESKTOP: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
        AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) \
        AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1";

    #[test]
    fn desktop_chrome() {
        let profile = WootheeClassifier.classify(CHROME_DESKTOP);
        assert_eq!(profile.browser, "Chrome");
        assert_eq!(profile.device, "desktop");
        assert!(profile.os.starts_with("Windows"));
    }

    #[test]
    fn iphone_is_mobile() {
        let profile = WootheeClassifier.classify(SAFARI_IPHONE);
        assert_eq!(profile.device, "mobile");
        assert_eq!(profile.browser, "Safari");
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let profile = WootheeClassifier.classify("definitely not a browser");
        assert_eq!(profile, UaProfile::default());
    }

    #[test]
    fn default_profile_is_unknown_desktop() {
        let profile = UaProfile::default();
        assert_eq!(profile.device, "desktop");
        assert_eq!(profile.browser, "Unknown");
        assert_eq!(profile.os, "Unknown");
    }
}
