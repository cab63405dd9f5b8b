//! LCG LLM - the model-server boundary
//!
//! Everything that talks to the local model runtime lives here:
//! - [`LlmClient`]: stateless request/response seam with a bounded-time
//!   contract
//! - [`HttpLlmClient`] / [`HttpEmbeddingGenerator`]: reqwest-backed
//!   implementations against an Ollama-style HTTP endpoint
//! - [`CircuitBreaker`]: per-endpoint failure isolation so a degraded
//!   model server fast-fails instead of collapsing the job queue
//! - [`GuardedLlmClient`]: breaker + bounded retry/backoff composition
//! - [`CancelToken`]: cooperative cancellation flag checked between
//!   pipeline stages; an in-flight model call is never interrupted

pub mod breaker;
pub mod cancel;
pub mod client;
pub mod embeddings;
pub mod error;
pub mod guarded;
pub mod retry;
pub mod types;

pub use breaker::{BreakerConfig, BreakerRegistry, BreakerState, CircuitBreaker};
pub use cancel::CancelToken;
pub use client::{HttpLlmClient, LlmClient};
pub use embeddings::HttpEmbeddingGenerator;
pub use error::LlmError;
pub use guarded::GuardedLlmClient;
pub use retry::RetryConfig;
pub use types::{GenerationRequest, GenerationResponse, LlmConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
