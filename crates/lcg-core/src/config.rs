//! Pipeline configuration

use lcg_index::SyncRetryConfig;
use lcg_jobs::QueueConfig;
use lcg_llm::{BreakerConfig, LlmConfig, RetryConfig};
use lcg_rag::RagConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the whole generation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LcgConfig {
    /// Model server and sampling defaults
    pub llm: LlmConfig,
    /// Retrieval tuning
    pub rag: RagConfig,
    /// Breaker tuning, applied per endpoint
    pub breaker: BreakerConfig,
    /// Retry bounds around model calls
    pub retry: RetryConfig,
    /// Queue and worker pool tuning
    pub queue: QueueConfig,
    /// Retry bounds around index upserts
    pub sync_retry: SyncRetryConfig,
    /// Cache store capacity bound
    pub cache_capacity: u64,
}

impl LcgConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With model configuration
    #[inline]
    #[must_use]
    pub fn with_llm(mut self, llm: LlmConfig) -> Self {
        self.llm = llm;
        self
    }

    /// With retrieval tuning
    #[inline]
    #[must_use]
    pub fn with_rag(mut self, rag: RagConfig) -> Self {
        self.rag = rag;
        self
    }

    /// With breaker tuning
    #[inline]
    #[must_use]
    pub fn with_breaker(mut self, breaker: BreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// With queue tuning
    #[inline]
    #[must_use]
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }
}

impl Default for LcgConfig {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            rag: RagConfig::default(),
            breaker: BreakerConfig::default(),
            retry: RetryConfig::default(),
            queue: QueueConfig::default(),
            sync_retry: SyncRetryConfig::default(),
            cache_capacity: 10_000,
        }
    }
}
