//! Canonicalize client identity (IP) from a raw transport address plus an
//! optional trusted-proxy header.

use std::net::IpAddr;

/// Derive the canonical client key for a request.
///
/// `remote_addr` is the transport's raw peer address (`host:port`, possibly
/// bracketed IPv6). `forwarded_for` is the raw `X-Forwarded-For` header
/// value, if present. `trust_proxy` gates whether `forwarded_for` is
/// honored at all.
///
/// Failure to normalize is never fatal: on any parse failure this falls
/// back to passing the untrimmed host string through unchanged, so
/// rate-limiting on a malformed identifier (and same-bucket collisions for
/// malformed inputs) is accepted behavior, not a bug.
pub fn client_key(remote_addr: &str, forwarded_for: Option<&str>, trust_proxy: bool) -> String {
    let candidate = if trust_proxy {
        forwarded_for
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .and_then(|h| h.split(',').next())
            .map(str::trim)
            .map(strip_brackets)
    } else {
        None
    };

    let host_port = candidate.unwrap_or(remote_addr);
    let host = split_host(host_port);
    let host = strip_brackets(host);

    match host.parse::<IpAddr>() {
        Ok(ip) => ip.to_string(),
        Err(_) => host.to_string(),
    }
}

fn strip_brackets(s: &str) -> &str {
    if let Some(inner) = s.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
        inner
    } else {
        s
    }
}

/// Split `host:port` (or `[ipv6]:port`) keeping only the host portion.
/// Bare IPv6 addresses with no port (`::1`) have no unambiguous `:port`
/// suffix to strip, so they pass through unchanged.
fn split_host(host_port: &str) -> &str {
    if host_port.starts_with('[') {
        // Bracketed form: split at the closing bracket, ignore anything
        // (":port") after it.
        if let Some(end) = host_port.find(']') {
            return &host_port[..=end];
        }
        return host_port;
    }
    // Unbracketed: a single colon means host:port. More than one colon
    // (and no brackets) means a bare IPv6 literal — keep it whole.
    match host_port.matches(':').count() {
        1 => host_port.split_once(':').map(|(h, _)| h).unwrap_or(host_port),
        _ => host_port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn falls_back_to_remote_addr_without_proxy_trust() {
        let key = client_key("198.51.100.7:54321", Some("203.0.113.1"), false);
        assert_eq!(key, "198.51.100.7");
    }

    #[test]
    fn uses_first_forwarded_for_token_when_trusted() {
        let key = client_key("10.0.0.1:1", Some("203.0.113.1, 10.0.0.2"), true);
        assert_eq!(key, "203.0.113.1");
    }

    #[test]
    fn blank_forwarded_for_falls_back_to_remote_addr() {
        let key = client_key("198.51.100.7:1", Some("   "), true);
        assert_eq!(key, "198.51.100.7");
    }

    #[test]
    fn ipv6_forms_normalize_to_the_same_key() {
        let a = client_key("[::1]:1", None, false);
        let b = client_key("::1:0", Some("[::1]"), true);
        let c = client_key("x:1", Some("0:0:0:0:0:0:0:1"), true);
        assert_eq!(a, "::1");
        assert_eq!(b, "::1");
        assert_eq!(c, "::1");
    }

    #[test]
    fn unparseable_host_passes_through() {
        let key = client_key("not-an-ip:8080", None, false);
        assert_eq!(key, "not-an-ip");
    }

    #[test]
    fn strips_brackets_from_forwarded_for_entry() {
        let key = client_key("10.0.0.1:1", Some("[2001:db8::1]"), true);
        assert_eq!(key, "2001:db8::1");
    }
}
