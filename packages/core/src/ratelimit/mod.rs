//! Token-bucket rate limiting: a global stage and an optional per-IP
//! stage, checked in order.

mod bucket;
mod limiter;

pub use bucket::TokenBucket;
pub use limiter::{RateLimiter, RateLimiterConfig, RateLimiterStats};
