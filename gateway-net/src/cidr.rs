//! Compile a list of IPs/CIDRs and test membership, under a read/write
//! lock so rare config-reload writes swap the whole structure atomically
//! from a reader's standpoint.

use std::net::IpAddr;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy)]
struct Cidr {
    network: IpAddr,
    prefix_len: u8,
}

impl Cidr {
    fn parse(entry: &str) -> Option<Self> {
        match entry.split_once('/') {
            Some((addr, len)) => {
                let network: IpAddr = addr.parse().ok()?;
                let prefix_len: u8 = len.parse().ok()?;
                let max = match network {
                    IpAddr::V4(_) => 32,
                    IpAddr::V6(_) => 128,
                };
                if prefix_len > max {
                    return None;
                }
                Some(Cidr { network, prefix_len })
            }
            None => {
                let network: IpAddr = entry.parse().ok()?;
                let prefix_len = match network {
                    IpAddr::V4(_) => 32,
                    IpAddr::V6(_) => 128,
                };
                Some(Cidr { network, prefix_len })
            }
        }
    }

    fn contains(&self, ip: &IpAddr) -> bool {
        match (self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(ip)) => {
                mask_matches_u32(u32::from(net), u32::from(*ip), self.prefix_len)
            }
            (IpAddr::V6(net), IpAddr::V6(ip)) => {
                mask_matches_u128(u128::from(net), u128::from(*ip), self.prefix_len)
            }
            _ => false,
        }
    }
}

fn mask_matches_u32(network: u32, candidate: u32, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    if prefix_len >= 32 {
        return network == candidate;
    }
    let mask = !0u32 << (32 - prefix_len as u32);
    network & mask == candidate & mask
}

fn mask_matches_u128(network: u128, candidate: u128, prefix_len: u8) -> bool {
    if prefix_len == 0 {
        return true;
    }
    if prefix_len >= 128 {
        return network == candidate;
    }
    let mask = !0u128 << (128 - prefix_len as u32);
    network & mask == candidate & mask
}

/// Compiled allowlist of IPs/CIDRs.
#[derive(Default)]
pub struct CidrMatcher {
    entries: Arc<RwLock<Vec<Cidr>>>,
}

impl CidrMatcher {
    /// Compile a list of IP/CIDR strings. Unparseable entries are dropped
    /// and logged at `warn` rather than failing the whole list. An empty
    /// list means "allow all".
    pub fn new(entries: &[String]) -> Self {
        let compiled = entries
            .iter()
            .filter_map(|e| {
                let parsed = Cidr::parse(e);
                if parsed.is_none() {
                    tracing::warn!(entry = %e, "could not parse CIDR/IP entry, skipping");
                }
                parsed
            })
            .collect();
        Self {
            entries: Arc::new(RwLock::new(compiled)),
        }
    }

    /// Atomically swap the whole entry list (e.g. on config reload).
    pub fn reload(&self, entries: &[String]) {
        let compiled = entries.iter().filter_map(|e| Cidr::parse(e)).collect();
        *self.entries.write().unwrap() = compiled;
    }

    /// Empty allowlist allows everything. Otherwise the address must match
    /// at least one compiled entry. Unparseable `ip` strings never match.
    pub fn allows(&self, ip: &str) -> bool {
        let entries = self.entries.read().unwrap();
        if entries.is_empty() {
            return true;
        }
        let Ok(addr) = ip.parse::<IpAddr>() else {
            return false;
        };
        entries.iter().any(|cidr| cidr.contains(&addr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_allowlist_allows_everything() {
        let matcher = CidrMatcher::new(&[]);
        assert!(matcher.allows("8.8.8.8"));
        assert!(matcher.allows("not-an-ip"));
    }

    #[test]
    fn exact_ip_matches_only_itself() {
        let matcher = CidrMatcher::new(&["10.0.0.1".to_string()]);
        assert!(matcher.allows("10.0.0.1"));
        assert!(!matcher.allows("10.0.0.2"));
    }

    #[test]
    fn ipv4_default_route_accepts_every_ipv4() {
        let matcher = CidrMatcher::new(&["0.0.0.0/0".to_string()]);
        assert!(matcher.allows("1.2.3.4"));
        assert!(matcher.allows("255.255.255.255"));
        assert!(!matcher.allows("::1"));
    }

    #[test]
    fn ipv6_default_route_accepts_every_ipv6() {
        let matcher = CidrMatcher::new(&["::/0".to_string()]);
        assert!(matcher.allows("::1"));
        assert!(matcher.allows("2001:db8::1"));
        assert!(!matcher.allows("1.2.3.4"));
    }

    #[test]
    fn subnet_boundaries_are_respected() {
        let matcher = CidrMatcher::new(&["192.168.1.0/24".to_string()]);
        assert!(matcher.allows("192.168.1.254"));
        assert!(!matcher.allows("192.168.2.1"));
    }

    #[test]
    fn reload_swaps_the_list_atomically() {
        let matcher = CidrMatcher::new(&["10.0.0.1".to_string()]);
        assert!(matcher.allows("10.0.0.1"));
        matcher.reload(&["10.0.0.2".to_string()]);
        assert!(!matcher.allows("10.0.0.1"));
        assert!(matcher.allows("10.0.0.2"));
    }

    #[test]
    fn malformed_entries_are_skipped_not_fatal() {
        let matcher = CidrMatcher::new(&["garbage".to_string(), "10.0.0.1".to_string()]);
        assert!(matcher.allows("10.0.0.1"));
    }
}
