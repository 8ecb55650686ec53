//! Token bucket admission control.

mod backend;
mod bucket;
mod limiter;
mod refill;

pub use backend::AdmissionControl;
pub use bucket::TokenBucket;
pub use limiter::RateLimiter;
pub use refill::RefillTask;
