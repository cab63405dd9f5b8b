//! Breaker + retry composition around any LLM client

use crate::breaker::CircuitBreaker;
use crate::client::LlmClient;
use crate::error::LlmError;
use crate::retry::RetryConfig;
use crate::types::{GenerationRequest, GenerationResponse};
use async_trait::async_trait;
use std::sync::Arc;

/// Resilience wrapper over an [`LlmClient`].
///
/// Every attempt asks the breaker for permission first; each outcome is
/// recorded against the rolling window. Retryable failures back off
/// exponentially up to the attempt budget. An open breaker surfaces as
/// `CircuitOpen` immediately - queued retries must not bombard a
/// degraded model server.
pub struct GuardedLlmClient {
    inner: Arc<dyn LlmClient>,
    breaker: Arc<CircuitBreaker>,
    retry: RetryConfig,
}

impl GuardedLlmClient {
    /// Wrap a client with a breaker and retry bounds
    #[must_use]
    pub fn new(inner: Arc<dyn LlmClient>, breaker: Arc<CircuitBreaker>, retry: RetryConfig) -> Self {
        Self {
            inner,
            breaker,
            retry,
        }
    }

    /// The breaker guarding this client
    #[inline]
    #[must_use]
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

#[async_trait]
impl LlmClient for GuardedLlmClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        let mut attempt = 1;
        loop {
            self.breaker.try_acquire()?;

            match self.inner.generate(request.clone()).await {
                Ok(response) => {
                    self.breaker.record_success();
                    return Ok(response);
                }
                Err(err) => {
                    if err.counts_as_breaker_failure() {
                        self.breaker.record_failure();
                    }
                    if !err.is_retryable() || attempt >= self.retry.max_attempts {
                        return Err(err);
                    }
                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        endpoint = self.breaker.endpoint(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "model call failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
