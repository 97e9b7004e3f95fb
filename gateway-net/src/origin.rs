//! Case-insensitive allowlist of origins with wildcard and localhost-dev
//! mode.

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OriginMatch {
    /// The origin is explicitly allowlisted.
    Exact,
    /// Only the wildcard matched — callers must never grant credentials
    /// for this outcome.
    Wildcard,
    /// No allowlist entry and no wildcard matched.
    None,
}

struct Entries {
    exact: HashSet<String>,
    wildcard: bool,
}

/// Compiled origin allowlist, swapped whole under a write lock on reload.
pub struct OriginMatcher {
    entries: RwLock<Arc<Entries>>,
}

impl OriginMatcher {
    /// `*` alone means wildcard-only mode. `*` mixed with other entries
    /// keeps both: exact match is preferred, wildcard is the fallback.
    pub fn new(allowlist: &[String]) -> Self {
        let wildcard = allowlist.iter().any(|o| o == "*");
        let exact = allowlist
            .iter()
            .filter(|o| *o != "*")
            .map(|o| o.to_lowercase())
            .collect();
        Self {
            entries: RwLock::new(Arc::new(Entries { exact, wildcard })),
        }
    }

    pub fn reload(&self, allowlist: &[String]) {
        let wildcard = allowlist.iter().any(|o| o == "*");
        let exact = allowlist
            .iter()
            .filter(|o| *o != "*")
            .map(|o| o.to_lowercase())
            .collect();
        *self.entries.write().unwrap() = Arc::new(Entries { exact, wildcard });
    }

    pub fn is_wildcard_only(&self) -> bool {
        let entries = self.entries.read().unwrap();
        entries.wildcard && entries.exact.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        let entries = self.entries.read().unwrap();
        entries.exact.is_empty() && !entries.wildcard
    }

    /// Exact match wins; wildcard is used only as a fallback.
    pub fn matches(&self, origin: &str) -> OriginMatch {
        let entries = self.entries.read().unwrap();
        let lower = origin.to_lowercase();
        if entries.exact.contains(&lower) {
            OriginMatch::Exact
        } else if entries.wildcard {
            OriginMatch::Wildcard
        } else {
            OriginMatch::None
        }
    }

    /// Same-origin check: case-insensitive host comparison against the
    /// request's `Host` header, used by the CSRF filter.
    pub fn is_same_origin(origin_host: &str, request_host: &str) -> bool {
        origin_host.eq_ignore_ascii_case(request_host)
    }

    /// Whether `host` looks like a localhost/127.0.0.1 dev address, used
    /// by the CSRF filter's fallback when the allowlist is empty.
    pub fn is_localhost(host: &str) -> bool {
        let host = host.rsplit_once(':').map(|(h, _)| h).unwrap_or(host);
        matches!(host, "localhost" | "127.0.0.1" | "[::1]" | "::1")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_alone_is_wildcard_mode() {
        let matcher = OriginMatcher::new(&["*".to_string()]);
        assert!(matcher.is_wildcard_only());
        assert_eq!(matcher.matches("https://anywhere.example"), OriginMatch::Wildcard);
    }

    #[test]
    fn exact_preferred_over_wildcard_fallback() {
        let matcher = OriginMatcher::new(&["*".to_string(), "https://app.example".to_string()]);
        assert!(!matcher.is_wildcard_only());
        assert_eq!(matcher.matches("https://app.example"), OriginMatch::Exact);
        assert_eq!(matcher.matches("https://other.example"), OriginMatch::Wildcard);
    }

    #[test]
    fn case_insensitive_exact_match() {
        let matcher = OriginMatcher::new(&["https://App.Example".to_string()]);
        assert_eq!(matcher.matches("https://app.example"), OriginMatch::Exact);
    }

    #[test]
    fn no_match_when_allowlist_is_empty_and_no_wildcard() {
        let matcher = OriginMatcher::new(&[]);
        assert!(matcher.is_empty());
        assert_eq!(matcher.matches("https://app.example"), OriginMatch::None);
    }

    #[test]
    fn reload_is_atomic_from_a_reader_perspective() {
        let matcher = OriginMatcher::new(&["https://old.example".to_string()]);
        matcher.reload(&["https://new.example".to_string()]);
        assert_eq!(matcher.matches("https://old.example"), OriginMatch::None);
        assert_eq!(matcher.matches("https://new.example"), OriginMatch::Exact);
    }

    #[test]
    fn localhost_detection_covers_common_dev_hosts() {
        assert!(OriginMatcher::is_localhost("localhost:3000"));
        assert!(OriginMatcher::is_localhost("127.0.0.1:8080"));
        assert!(!OriginMatcher::is_localhost("evil.example"));
    }
}
