//! Admission control trait for abstracting the limiter behind request handlers.

/// A per-request admission decision.
///
/// Request handlers hold an `Arc` of some implementation and call
/// [`AdmissionControl::admit`] once per request before doing any work. This
/// keeps the HTTP layer independent of how the decision is made, and lets
/// separate routes be guarded by separate limiters.
pub trait AdmissionControl: Send + Sync {
    /// Returns `true` if the request may proceed, `false` if it must be rejected.
    ///
    /// Must not block.
    fn admit(&self) -> bool;

    /// Hint for how long a rejected caller should wait before retrying.
    fn retry_after(&self) -> std::time::Duration {
        std::time::Duration::from_secs(1)
    }
}
