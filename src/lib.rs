//! Turnstile - fixed-window token bucket admission control
//!
//! This crate gates a request handler behind a single token bucket. The
//! bucket starts full, every admitted request takes one token, and a
//! background ticker resets it to full capacity once per `1 / rate` seconds.
//! Excess requests are rejected immediately instead of being queued.

pub mod config;
pub mod error;
pub mod http;
pub mod ratelimit;
