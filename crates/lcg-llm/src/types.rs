//! Request/response types and client configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One generation request against the model server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Fully assembled prompt
    pub prompt: String,
    /// Model name (also the breaker's logical endpoint)
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Repetition penalty
    pub repeat_penalty: f32,
    /// Per-call deadline. Generation of large structured documents is
    /// slow, so the default is minutes-scale; this is configuration,
    /// not a constant.
    pub max_duration: Duration,
}

impl GenerationRequest {
    /// Create a request with default sampling parameters
    #[must_use]
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: model.into(),
            temperature: 0.7,
            top_p: 0.9,
            repeat_penalty: 1.1,
            max_duration: Duration::from_secs(300),
        }
    }

    /// With sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// With per-call deadline
    #[inline]
    #[must_use]
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }
}

/// A successful generation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Generated text
    pub text: String,
    /// Model that produced it
    pub model: String,
    /// Wall-clock duration of the call
    pub duration: Duration,
}

/// Configuration for the HTTP model clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL of the local model server
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Embedding model name
    pub embedding_model: String,
    /// Embedding output dimension
    pub embedding_dimension: usize,
    /// Default per-call deadline for generation
    pub max_duration: Duration,
    /// Default sampling temperature
    pub temperature: f32,
    /// Default nucleus sampling cutoff
    pub top_p: f32,
    /// Default repetition penalty
    pub repeat_penalty: f32,
}

impl LlmConfig {
    /// Create a config for a model server at `base_url`
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// With embedding model and dimension
    #[inline]
    #[must_use]
    pub fn with_embedding_model(mut self, model: impl Into<String>, dimension: usize) -> Self {
        self.embedding_model = model.into();
        self.embedding_dimension = dimension;
        self
    }

    /// With generation deadline
    #[inline]
    #[must_use]
    pub fn with_max_duration(mut self, max_duration: Duration) -> Self {
        self.max_duration = max_duration;
        self
    }

    /// Build a request for this config's model with its default sampling
    #[must_use]
    pub fn request(&self, prompt: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            prompt: prompt.into(),
            model: self.model.clone(),
            temperature: self.temperature,
            top_p: self.top_p,
            repeat_penalty: self.repeat_penalty,
            max_duration: self.max_duration,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3:8b".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            embedding_dimension: 768,
            max_duration: Duration::from_secs(300),
            temperature: 0.7,
            top_p: 0.9,
            repeat_penalty: 1.1,
        }
    }
}
