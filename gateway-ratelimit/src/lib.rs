//! Token-bucket rate limiting with proxy-aware client identification.

pub mod bucket;
pub mod filter;
pub mod limiter;

pub use bucket::TokenBucket;
pub use filter::{factory, rate_limit_filter, RateLimitConfig};
pub use limiter::RateLimiter;
