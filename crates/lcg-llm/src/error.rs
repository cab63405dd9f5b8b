//! Error taxonomy for the model-server boundary

/// Failures at the LLM call boundary.
///
/// Classification drives both retry and breaker behavior: timeouts,
/// connection errors, and malformed responses count as breaker failures;
/// a refused call (`CircuitOpen`) does not, and is never retried here -
/// the caller backs off independently.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    /// Call exceeded its configured max duration
    #[error("model call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Model server unreachable
    #[error("model server connection refused: {0}")]
    ConnectionRefused(String),

    /// Response arrived but could not be decoded
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// Breaker is refusing calls for this endpoint
    #[error("circuit open for endpoint {endpoint}, retry after {retry_after_ms}ms")]
    CircuitOpen {
        endpoint: String,
        retry_after_ms: u64,
    },

    /// Any other failed request (non-success status, transport error)
    #[error("model request failed: {0}")]
    RequestFailed(String),
}

impl LlmError {
    /// Whether a bounded retry with backoff may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::CircuitOpen { .. })
    }

    /// Whether this failure counts against the breaker's rolling window
    #[inline]
    #[must_use]
    pub fn counts_as_breaker_failure(&self) -> bool {
        !matches!(self, Self::CircuitOpen { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_open_is_not_retried_and_not_counted() {
        let err = LlmError::CircuitOpen {
            endpoint: "llama3:8b".to_string(),
            retry_after_ms: 1000,
        };
        assert!(!err.is_retryable());
        assert!(!err.counts_as_breaker_failure());
    }

    #[test]
    fn transport_failures_are_retryable_breaker_failures() {
        for err in [
            LlmError::Timeout { timeout_secs: 120 },
            LlmError::ConnectionRefused("refused".into()),
            LlmError::MalformedResponse("bad json".into()),
            LlmError::RequestFailed("500".into()),
        ] {
            assert!(err.is_retryable());
            assert!(err.counts_as_breaker_failure());
        }
    }
}
