//! Per-API-key rate limiting using the token bucket algorithm.
//!
//! Each key carries its own limit in requests per minute. Buckets live in
//! process memory and are dropped after a period of inactivity.

mod limiter;
mod token_bucket;

pub use limiter::{ApiKeyRateLimiter, RateLimitResult, RateLimiterStats};
pub use token_bucket::TokenBucket;
