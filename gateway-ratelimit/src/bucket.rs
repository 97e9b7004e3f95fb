//! The token bucket itself: refill is computed lazily from elapsed
//! wall-clock time on each `allow()` call rather than via a background
//! ticker.

use std::time::Instant;

pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// `capacity` (burst) tokens, refilling at `refill_per_sec` (rps).
    pub fn new(refill_per_sec: f64, capacity: f64) -> Self {
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec,
            last_refill: Instant::now(),
        }
    }

    /// Refill based on elapsed time, then atomically try to consume `n`
    /// tokens. Returns `true` if allowed.
    pub fn allow(&mut self, n: f64) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;

        if self.tokens >= n {
            self.tokens -= n;
            true
        } else {
            false
        }
    }
}
