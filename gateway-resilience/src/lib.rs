//! Circuit breaker, retry runner, and the composed per-service resilience
//! filter.

pub mod breaker;
pub mod manager;
pub mod retry;

pub use breaker::{BreakerState, CircuitBreaker};
pub use manager::{factory, resilience_filter, ResilienceManager};
pub use retry::run_with_retry;
