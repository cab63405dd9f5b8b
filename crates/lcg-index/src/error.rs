//! Error types for the index boundary

/// Vector index and synchronization errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum IndexError {
    /// Vector dimension does not match the configured index dimension.
    /// Fatal for the write; never retried.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Embedding computation failed
    #[error("embedding generation failed: {0}")]
    EmbeddingFailed(String),

    /// Index backend call failed
    #[error("index backend error: {0}")]
    Backend(String),

    /// Backend call exceeded its deadline
    #[error("index operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl IndexError {
    /// Whether a retry can reasonably succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Backend(_) | Self::Timeout { .. } | Self::EmbeddingFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dimension_mismatch_is_not_retryable() {
        let err = IndexError::DimensionMismatch {
            expected: 768,
            actual: 384,
        };
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("768"));
    }

    #[test]
    fn backend_errors_are_retryable() {
        assert!(IndexError::Backend("connection reset".into()).is_retryable());
        assert!(IndexError::Timeout { timeout_ms: 500 }.is_retryable());
    }
}
