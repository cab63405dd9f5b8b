//! The user-visible error taxonomy
//!
//! Component errors collapse into this taxonomy at the worker boundary:
//! retryable failures were already retried inside the component that
//! owns the external call, so whatever reaches a job record here is
//! terminal and user-visible - never silently dropped.

use lcg_index::IndexError;
use lcg_jobs::JobErrorDetail;
use lcg_llm::LlmError;
use lcg_rag::RagError;

/// Pipeline-level errors surfaced to callers and job records
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// Bad input payload; not retried, returned to the caller
    #[error("validation error: {0}")]
    Validation(String),

    /// An external call exceeded its bound and exhausted its retries
    #[error("timeout: {0}")]
    Timeout(String),

    /// The breaker is refusing calls; the caller should back off
    #[error("circuit open: {0}")]
    CircuitOpen(String),

    /// Embedding width did not match the index; fatal for that write
    #[error("embedding dimension error: {0}")]
    EmbeddingDimension(String),

    /// Unknown job id
    #[error("not found: {0}")]
    NotFound(String),

    /// Cooperative cancellation observed
    #[error("cancelled")]
    Cancelled,

    /// Unexpected backend failure; logged and surfaced as job failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl GenerationError {
    /// Stable machine-readable code for job error details
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            GenerationError::Validation(_) => "validation",
            GenerationError::Timeout(_) => "timeout",
            GenerationError::CircuitOpen(_) => "circuit-open",
            GenerationError::EmbeddingDimension(_) => "embedding-dimension",
            GenerationError::NotFound(_) => "not-found",
            GenerationError::Cancelled => "cancelled",
            GenerationError::Internal(_) => "internal",
        }
    }

    /// Whether resubmitting the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout(_)
                | GenerationError::CircuitOpen(_)
                | GenerationError::Internal(_)
        )
    }

    /// Structured detail recorded on a failed job
    #[must_use]
    pub fn to_detail(&self) -> JobErrorDetail {
        JobErrorDetail::new(self.code(), self.to_string(), self.is_retryable())
    }
}

impl From<LlmError> for GenerationError {
    fn from(value: LlmError) -> Self {
        match value {
            LlmError::Timeout { timeout_secs } => {
                GenerationError::Timeout(format!("model call exceeded {timeout_secs}s"))
            }
            LlmError::CircuitOpen { ref endpoint, .. } => {
                GenerationError::CircuitOpen(format!("endpoint {endpoint} unavailable"))
            }
            other => GenerationError::Internal(other.to_string()),
        }
    }
}

impl From<IndexError> for GenerationError {
    fn from(value: IndexError) -> Self {
        match value {
            IndexError::DimensionMismatch { expected, actual } => GenerationError::EmbeddingDimension(
                format!("expected {expected} components, got {actual}"),
            ),
            IndexError::Timeout { timeout_ms } => {
                GenerationError::Timeout(format!("index call exceeded {timeout_ms}ms"))
            }
            other => GenerationError::Internal(other.to_string()),
        }
    }
}

impl From<lcg_jobs::QueueError> for GenerationError {
    fn from(value: lcg_jobs::QueueError) -> Self {
        use lcg_jobs::QueueError;
        match value {
            QueueError::Validation { kind, reason } => {
                GenerationError::Validation(format!("{kind}: {reason}"))
            }
            QueueError::UnknownKind(kind) => {
                GenerationError::Validation(format!("no handler for kind {kind}"))
            }
            QueueError::NotFound(id) => GenerationError::NotFound(id.to_string()),
            QueueError::Store(err) => GenerationError::Internal(err.to_string()),
        }
    }
}

impl From<RagError> for GenerationError {
    fn from(value: RagError) -> Self {
        match value {
            RagError::Llm(err) => err.into(),
            RagError::Index(err) => err.into(),
            RagError::Cancelled => GenerationError::Cancelled,
            RagError::Cache(err) => GenerationError::Internal(err.to_string()),
            RagError::CorruptCacheEntry(err) => GenerationError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circuit_open_maps_through() {
        let err: GenerationError = LlmError::CircuitOpen {
            endpoint: "llama3:8b".to_string(),
            retry_after_ms: 500,
        }
        .into();
        assert!(matches!(err, GenerationError::CircuitOpen(_)));
        assert_eq!(err.code(), "circuit-open");
        assert!(err.is_retryable());
    }

    #[test]
    fn dimension_mismatch_is_not_retryable() {
        let err: GenerationError = IndexError::DimensionMismatch {
            expected: 768,
            actual: 512,
        }
        .into();
        assert_eq!(err.code(), "embedding-dimension");
        assert!(!err.is_retryable());
    }

    #[test]
    fn detail_carries_code_and_message() {
        let detail = GenerationError::Validation("missing subject".to_string()).to_detail();
        assert_eq!(detail.code, "validation");
        assert!(detail.message.contains("missing subject"));
        assert!(!detail.retryable);
    }

    #[test]
    fn rag_cancellation_maps_to_cancelled() {
        let err: GenerationError = RagError::Cancelled.into();
        assert!(matches!(err, GenerationError::Cancelled));
        assert!(!err.is_retryable());
    }
}
