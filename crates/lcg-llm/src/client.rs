//! LLM client seam and the HTTP implementation

use crate::error::LlmError;
use crate::types::{GenerationRequest, GenerationResponse, LlmConfig};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Instant;

/// Stateless request/response wrapper around a generation model.
///
/// Implementations must respect `request.max_duration` as a hard bound:
/// a call either completes within it or fails with `LlmError::Timeout`.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one generation
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError>;
}

#[derive(Debug, Deserialize)]
struct GenerateBody {
    response: String,
}

/// Client for an Ollama-style `/api/generate` JSON endpoint
#[derive(Debug, Clone)]
pub struct HttpLlmClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpLlmClient {
    /// Create a client for the configured model server
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
        })
    }

    fn classify(err: reqwest::Error, timeout_secs: u64) -> LlmError {
        if err.is_timeout() {
            LlmError::Timeout { timeout_secs }
        } else if err.is_connect() {
            LlmError::ConnectionRefused(err.to_string())
        } else if err.is_decode() {
            LlmError::MalformedResponse(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let timeout_secs = request.max_duration.as_secs();
        let started = Instant::now();

        let body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "top_p": request.top_p,
                "repeat_penalty": request.repeat_penalty,
            },
        });

        tracing::debug!(model = %request.model, prompt_chars = request.prompt.len(), "dispatching generation");

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .timeout(request.max_duration)
            .json(&body)
            .send()
            .await
            .map_err(|e| Self::classify(e, timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::RequestFailed(format!(
                "model server returned {status}"
            )));
        }

        let parsed: GenerateBody = response
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(e.to_string()))?;

        if parsed.response.is_empty() {
            return Err(LlmError::MalformedResponse(
                "empty response field".to_string(),
            ));
        }

        Ok(GenerationResponse {
            text: parsed.response,
            model: request.model,
            duration: started.elapsed(),
        })
    }
}
