//! HTTP embedding generator against the model server

use crate::error::LlmError;
use crate::types::LlmConfig;
use async_trait::async_trait;
use lcg_index::{EmbeddingGenerator, EmbeddingVector, IndexError};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct EmbeddingBody {
    embedding: Vec<f32>,
}

/// Client for an Ollama-style `/api/embeddings` JSON endpoint.
///
/// The configured dimension is enforced on every response; a model
/// returning the wrong width is a dimension error at this boundary,
/// before anything touches the index.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingGenerator {
    http: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
    timeout: Duration,
}

impl HttpEmbeddingGenerator {
    /// Create a generator for the configured embedding model
    ///
    /// # Errors
    /// `LlmError::RequestFailed` if the underlying client cannot be built
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::RequestFailed(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            dimension: config.embedding_dimension,
            timeout: Duration::from_secs(30),
        })
    }

    /// With a custom per-call timeout
    #[inline]
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl EmbeddingGenerator for HttpEmbeddingGenerator {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, IndexError> {
        let body = serde_json::json!({
            "model": self.model,
            "prompt": text,
        });

        let response = self
            .http
            .post(format!("{}/api/embeddings", self.base_url))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    IndexError::Timeout {
                        timeout_ms: self.timeout.as_millis() as u64,
                    }
                } else {
                    IndexError::EmbeddingFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IndexError::EmbeddingFailed(format!(
                "embedding endpoint returned {status}"
            )));
        }

        let parsed: EmbeddingBody = response
            .json()
            .await
            .map_err(|e| IndexError::EmbeddingFailed(e.to_string()))?;

        if parsed.embedding.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: parsed.embedding.len(),
            });
        }

        Ok(EmbeddingVector::new(parsed.embedding))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
