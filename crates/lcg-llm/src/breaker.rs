//! Circuit breaker for the model-server boundary
//!
//! One breaker per logical endpoint (model name). State is shared across
//! all workers targeting that endpoint and mutated only under a mutex,
//! so concurrent outcome recording cannot lose updates.
//!
//! Transitions:
//! - `closed`: calls pass through; outcomes fill a rolling window. When
//!   failures / attempts over the window reach the threshold (with a
//!   minimum-call floor), the breaker opens.
//! - `open`: calls fail immediately with `CircuitOpen` until the
//!   cool-down elapses, then the breaker moves to half-open.
//! - `half-open`: exactly one probe is admitted. Success closes the
//!   breaker and resets counters; failure reopens it, and each
//!   successive reopening doubles the cool-down up to a cap.

use crate::error::LlmError;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Breaker state for one logical endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerState::Closed => write!(f, "closed"),
            BreakerState::Open => write!(f, "open"),
            BreakerState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Breaker tuning
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct BreakerConfig {
    /// Rolling window: the last N call outcomes considered
    pub window_size: usize,
    /// Open when failures / attempts in the window reaches this ratio
    pub failure_threshold: f64,
    /// Calls required in the window before the breaker may trip
    pub min_calls: usize,
    /// Cool-down before the first half-open probe
    pub cool_down: Duration,
    /// Cap on the exponentially growing cool-down
    pub max_cool_down: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            failure_threshold: 0.5,
            min_calls: 5,
            cool_down: Duration::from_secs(30),
            max_cool_down: Duration::from_secs(300),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    /// Rolling outcomes, `true` = failure
    window: VecDeque<bool>,
    opened_at: Instant,
    /// Successive reopenings since the breaker last closed
    reopen_count: u32,
    probe_in_flight: bool,
}

/// Failure-isolation wrapper state for one endpoint
#[derive(Debug)]
pub struct CircuitBreaker {
    endpoint: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker for an endpoint
    #[must_use]
    pub fn new(endpoint: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            endpoint: endpoint.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                window: VecDeque::with_capacity(config.window_size),
                opened_at: Instant::now(),
                reopen_count: 0,
                probe_in_flight: false,
            }),
        }
    }

    /// Endpoint this breaker guards
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    fn current_cool_down(&self, reopen_count: u32) -> Duration {
        let factor = 2u32.saturating_pow(reopen_count);
        std::cmp::min(
            self.config.cool_down.saturating_mul(factor),
            self.config.max_cool_down,
        )
    }

    /// Ask permission to place one call.
    ///
    /// # Errors
    /// `LlmError::CircuitOpen` while the breaker is open or a half-open
    /// probe is already in flight.
    pub fn try_acquire(&self) -> Result<(), LlmError> {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => Ok(()),
            BreakerState::Open => {
                let cool_down = self.current_cool_down(inner.reopen_count);
                let elapsed = inner.opened_at.elapsed();
                if elapsed >= cool_down {
                    tracing::info!(endpoint = %self.endpoint, "breaker half-open, admitting probe");
                    inner.state = BreakerState::HalfOpen;
                    inner.probe_in_flight = true;
                    Ok(())
                } else {
                    Err(LlmError::CircuitOpen {
                        endpoint: self.endpoint.clone(),
                        retry_after_ms: (cool_down - elapsed).as_millis() as u64,
                    })
                }
            }
            BreakerState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(LlmError::CircuitOpen {
                        endpoint: self.endpoint.clone(),
                        retry_after_ms: self.current_cool_down(inner.reopen_count).as_millis()
                            as u64,
                    })
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                tracing::info!(endpoint = %self.endpoint, "probe succeeded, closing breaker");
                inner.state = BreakerState::Closed;
                inner.window.clear();
                inner.reopen_count = 0;
                inner.probe_in_flight = false;
            }
            BreakerState::Closed => Self::push_outcome(&mut inner, self.config.window_size, false),
            // A success reported while open is a late result; ignore it
            BreakerState::Open => {}
        }
    }

    /// Record a failed call (one that counts against the window)
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::HalfOpen => {
                inner.reopen_count = inner.reopen_count.saturating_add(1);
                tracing::warn!(
                    endpoint = %self.endpoint,
                    reopen_count = inner.reopen_count,
                    "probe failed, reopening breaker"
                );
                inner.state = BreakerState::Open;
                inner.opened_at = Instant::now();
                inner.probe_in_flight = false;
            }
            BreakerState::Closed => {
                Self::push_outcome(&mut inner, self.config.window_size, true);
                let attempts = inner.window.len();
                let failures = inner.window.iter().filter(|f| **f).count();
                if attempts >= self.config.min_calls
                    && failures as f64 / attempts as f64 >= self.config.failure_threshold
                {
                    tracing::warn!(
                        endpoint = %self.endpoint,
                        failures,
                        attempts,
                        "failure threshold reached, opening breaker"
                    );
                    inner.state = BreakerState::Open;
                    inner.opened_at = Instant::now();
                    inner.reopen_count = 0;
                }
            }
            BreakerState::Open => {}
        }
    }

    fn push_outcome(inner: &mut BreakerInner, window_size: usize, failed: bool) {
        if inner.window.len() == window_size {
            inner.window.pop_front();
        }
        inner.window.push_back(failed);
    }
}

/// Shared breaker lookup, one breaker per logical endpoint
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    config: BreakerConfig,
}

impl BreakerRegistry {
    /// Create a registry applying `config` to every endpoint
    #[inline]
    #[must_use]
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            breakers: DashMap::new(),
            config,
        }
    }

    /// Breaker for an endpoint, created closed on first use
    #[must_use]
    pub fn for_endpoint(&self, endpoint: &str) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(endpoint.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(endpoint, self.config)))
            .clone()
    }
}
