//! Error types for the retrieval pipeline

use lcg_cache::CacheError;
use lcg_index::IndexError;
use lcg_llm::LlmError;

/// Failures while answering a retrieval-augmented query
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// Cache boundary failed
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// Embedding or index boundary failed
    #[error("index error: {0}")]
    Index(#[from] IndexError),

    /// Model boundary failed (includes circuit-open refusals)
    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    /// Cached value could not be decoded; treated as corrupt, never surfaced
    #[error("cache entry corrupt: {0}")]
    CorruptCacheEntry(#[from] serde_json::Error),

    /// Cooperative cancellation observed between pipeline stages
    #[error("query cancelled")]
    Cancelled,
}

impl RagError {
    /// Whether the caller may retry the whole query
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            RagError::Cache(_) => true,
            RagError::Index(err) => err.is_retryable(),
            RagError::Llm(err) => err.is_retryable(),
            RagError::CorruptCacheEntry(_) => true,
            RagError::Cancelled => false,
        }
    }
}
