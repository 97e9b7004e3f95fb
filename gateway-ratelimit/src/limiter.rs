//! Per-key token-bucket limiter with automatic eviction of idle keys.
//! The map is read-heavy and insert-once, so a concurrent `DashMap` is
//! used rather than a single `RwLock`-guarded `HashMap`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;

use crate::bucket::TokenBucket;

const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(5 * 60);
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

struct Entry {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// A token-bucket rate limiter keyed by an arbitrary client key, with
/// `(rps, burst)` fixed at construction.
#[derive(Clone)]
pub struct RateLimiter {
    entries: Arc<DashMap<String, Entry>>,
    refill_per_sec: f64,
    burst: f64,
    idle_ttl: Duration,
}

impl RateLimiter {
    pub fn new(rps: f64, burst: f64) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            refill_per_sec: rps,
            burst,
            idle_ttl: DEFAULT_IDLE_TTL,
        }
    }

    #[cfg(test)]
    pub fn with_idle_ttl(rps: f64, burst: f64, idle_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            refill_per_sec: rps,
            burst,
            idle_ttl,
        }
    }

    /// Look up or create the bucket for `key`, then try to consume one
    /// token. This function never fails on malformed/colliding keys — it
    /// just may over- or under-count for degenerate keys.
    pub fn allow(&self, key: &str) -> bool {
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            bucket: TokenBucket::new(self.refill_per_sec, self.burst),
            last_seen: Instant::now(),
        });
        entry.last_seen = Instant::now();
        entry.bucket.allow(1.0)
    }

    /// Remove buckets idle beyond the configured TTL. Idempotent if it
    /// overlaps with another sweep.
    pub fn evict_idle(&self) {
        let ttl = self.idle_ttl;
        self.entries.retain(|_, entry| entry.last_seen.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Spawn the background sweeper (every 10 min by default), cancellable
    /// via `token`. No-op loop body if the limiter has been dropped
    /// elsewhere — the sweeper holds its own `Arc` clone so this can't
    /// happen while the handle returned here is alive.
    pub fn spawn_sweeper(&self, token: CancellationToken) -> tokio::task::JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(DEFAULT_SWEEP_INTERVAL);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => limiter.evict_idle(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_burst_then_rate_limits() {
        let limiter = RateLimiter::new(5.0, 5.0);
        for _ in 0..5 {
            assert!(limiter.allow("client-a"));
        }
        assert!(!limiter.allow("client-a"));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1.0, 1.0);
        assert!(limiter.allow("a"));
        assert!(!limiter.allow("a"));
        assert!(limiter.allow("b"));
    }

    #[test]
    fn evicts_idle_entries_past_ttl() {
        let limiter = RateLimiter::with_idle_ttl(1.0, 1.0, Duration::from_millis(20));
        limiter.allow("stale");
        assert_eq!(limiter.len(), 1);
        std::thread::sleep(Duration::from_millis(40));
        limiter.evict_idle();
        assert!(limiter.is_empty());
    }

    #[test]
    fn eviction_is_idempotent_under_overlap() {
        let limiter = RateLimiter::with_idle_ttl(1.0, 1.0, Duration::from_millis(10));
        limiter.allow("a");
        std::thread::sleep(Duration::from_millis(20));
        limiter.evict_idle();
        limiter.evict_idle();
        assert!(limiter.is_empty());
    }
}
