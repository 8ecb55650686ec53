//! Error types for the Turnstile service.

use thiserror::Error;

/// Main error type for Turnstile operations.
///
/// Rejected admissions are not errors; they surface as `false` from
/// [`crate::ratelimit::AdmissionControl::admit`].
#[derive(Error, Debug)]
pub enum TurnstileError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Refill rate that is not a positive, finite number of tokens per second
    #[error("Invalid refill rate {0}: must be a positive, finite number of requests per second")]
    InvalidRate(f64),

    /// Bucket capacity of zero
    #[error("Invalid capacity {0}: bucket must hold at least one token")]
    InvalidCapacity(u64),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for TurnstileError {
    fn from(err: config::ConfigError) -> Self {
        TurnstileError::Config(err.to_string())
    }
}

/// Result type alias for Turnstile operations.
pub type Result<T> = std::result::Result<T, TurnstileError>;
