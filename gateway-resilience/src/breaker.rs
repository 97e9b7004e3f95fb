//! Sliding-window failure accounting with a CLOSED/OPEN/HALF-OPEN state
//! machine, modeled as an explicit state machine rather than inheritance.
//! All transitions are guarded by a per-breaker lock; there is no global
//! lock.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use gateway_core::config::CircuitBreakerConfig;
use gateway_core::error::FilterError;

/// How many outcomes the rolling-window failure rate is computed over.
/// A `minimum_samples` floor applies before the rate is evaluated; this
/// crate also caps the window so memory use per breaker stays bounded
/// regardless of call volume.
const WINDOW_CAPACITY: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
    window: VecDeque<bool>,
    opened_at: Option<Instant>,
    half_open_in_flight: u32,
}

/// Proof that [`CircuitBreaker::try_acquire`] admitted a call. Must be
/// reported back via `record_success`/`record_failure` exactly once.
pub struct Permit {
    is_half_open_probe: bool,
}

pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                window: VecDeque::new(),
                opened_at: None,
                half_open_in_flight: 0,
            }),
            config,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().unwrap().state
    }

    /// Admit a call, or reject with [`FilterError::CircuitBreakerOpen`].
    pub fn try_acquire(&self) -> Result<Permit, FilterError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            BreakerState::Closed => Ok(Permit {
                is_half_open_probe: false,
            }),
            BreakerState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= Duration::from_millis(self.config.open_duration_ms) {
                    inner.state = BreakerState::HalfOpen;
                    inner.half_open_in_flight = 1;
                    tracing::info!("circuit breaker transitioning to half-open");
                    Ok(Permit {
                        is_half_open_probe: true,
                    })
                } else {
                    Err(FilterError::CircuitBreakerOpen)
                }
            }
            BreakerState::HalfOpen => {
                if inner.half_open_in_flight < self.config.half_open_requests {
                    inner.half_open_in_flight += 1;
                    Ok(Permit {
                        is_half_open_probe: true,
                    })
                } else {
                    Err(FilterError::CircuitBreakerOpen)
                }
            }
        }
    }

    pub fn record_success(&self, permit: Permit) {
        let mut inner = self.inner.lock().unwrap();
        if permit.is_half_open_probe {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
        if inner.state == BreakerState::HalfOpen {
            inner.state = BreakerState::Closed;
            inner.consecutive_failures = 0;
            inner.window.clear();
            inner.opened_at = None;
            tracing::info!("circuit breaker closed after successful probe");
        } else {
            inner.consecutive_failures = 0;
            push_sample(&mut inner.window, true);
        }
    }

    pub fn record_failure(&self, permit: Permit) {
        let mut inner = self.inner.lock().unwrap();
        if permit.is_half_open_probe {
            inner.half_open_in_flight = inner.half_open_in_flight.saturating_sub(1);
        }
        match inner.state {
            BreakerState::HalfOpen => {
                inner.state = BreakerState::Open;
                inner.opened_at = Some(Instant::now());
                tracing::info!("circuit breaker reopened after failed probe");
            }
            BreakerState::Closed => {
                inner.consecutive_failures += 1;
                push_sample(&mut inner.window, false);
                let rate_tripped = inner.window.len() as u32 >= self.config.minimum_samples
                    && failure_rate(&inner.window) >= self.config.failure_rate_threshold;
                if inner.consecutive_failures >= self.config.consecutive_failures || rate_tripped {
                    inner.state = BreakerState::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::info!(
                        consecutive_failures = inner.consecutive_failures,
                        "circuit breaker opened"
                    );
                }
            }
            BreakerState::Open => {}
        }
    }
}

fn push_sample(window: &mut VecDeque<bool>, ok: bool) {
    window.push_back(ok);
    while window.len() > WINDOW_CAPACITY {
        window.pop_front();
    }
}

fn failure_rate(window: &VecDeque<bool>) -> f64 {
    if window.is_empty() {
        return 0.0;
    }
    let failures = window.iter().filter(|ok| !**ok).count();
    failures as f64 / window.len() as f64
}
