//! Error types for the cache boundary

/// Cache store errors
///
/// The in-process moka backend is infallible; the variants exist for
/// remote backends plugged in behind the same trait.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Backend call failed
    #[error("cache backend error: {0}")]
    Backend(String),

    /// Backend call exceeded its deadline
    #[error("cache operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}
