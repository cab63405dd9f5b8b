//! Job queue: submission, polling, cancellation

use crate::store::{JobStore, JobStoreError};
use crate::types::{GenerationJob, JobId, JobKind};
use crate::worker::HandlerRegistry;
use dashmap::DashMap;
use lcg_llm::CancelToken;
use std::sync::Arc;
use std::time::Duration;

/// Queue and worker-pool tuning
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct QueueConfig {
    /// Bounded worker count. The model backend is typically a single
    /// machine; unbounded parallel calls would only pile up on it.
    pub workers: usize,
    /// Lease a worker holds on a claimed job before crash recovery
    /// returns the job to the queue
    pub lease_timeout: Duration,
    /// Idle worker back-off between empty claim sweeps
    pub poll_interval: Duration,
    /// Cadence of the lease reaper
    pub reaper_interval: Duration,
}

impl QueueConfig {
    /// With a different worker count
    #[inline]
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// With a different lease timeout
    #[inline]
    #[must_use]
    pub fn with_lease_timeout(mut self, lease_timeout: Duration) -> Self {
        self.lease_timeout = lease_timeout;
        self
    }

    /// With a different idle poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            lease_timeout: Duration::from_secs(300),
            poll_interval: Duration::from_millis(250),
            reaper_interval: Duration::from_secs(30),
        }
    }
}

/// Queue-level errors
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Bad input payload; not retried, returned to the caller
    #[error("invalid payload for {kind}: {reason}")]
    Validation { kind: JobKind, reason: String },

    /// No handler registered for this kind
    #[error("no handler registered for kind {0}")]
    UnknownKind(JobKind),

    /// Unknown job id
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// Store failure
    #[error(transparent)]
    Store(JobStoreError),
}

impl From<JobStoreError> for QueueError {
    fn from(value: JobStoreError) -> Self {
        match value {
            JobStoreError::NotFound(id) => QueueError::NotFound(id),
            other => QueueError::Store(other),
        }
    }
}

/// Accepts generation requests, persists them, and hands leases and
/// cancellation tokens to the worker pool.
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    registry: Arc<HandlerRegistry>,
    cancellations: DashMap<JobId, CancelToken>,
}

impl JobQueue {
    /// Create a queue over a store and a handler registry
    #[must_use]
    pub fn new(store: Arc<dyn JobStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            store,
            registry,
            cancellations: DashMap::new(),
        }
    }

    /// Non-blocking enqueue: validate, persist `queued`, return the id.
    ///
    /// # Errors
    /// `QueueError::UnknownKind` without a registered handler;
    /// `QueueError::Validation` when the handler rejects the payload.
    pub async fn submit(
        &self,
        kind: JobKind,
        payload: serde_json::Value,
    ) -> Result<JobId, QueueError> {
        let handler = self
            .registry
            .get(kind)
            .ok_or(QueueError::UnknownKind(kind))?;
        handler
            .validate(&payload)
            .map_err(|reason| QueueError::Validation { kind, reason })?;

        let job = GenerationJob::new(kind, payload);
        let id = job.id;
        self.store.insert(job).await?;
        tracing::info!(job_id = %id, %kind, "job queued");
        Ok(id)
    }

    /// Current persisted record for a job
    pub async fn status(&self, id: JobId) -> Result<GenerationJob, QueueError> {
        Ok(self.store.get(id).await?)
    }

    /// Cancel a job.
    ///
    /// A still-queued job is removed before dispatch. An active job gets
    /// its cancellation flag raised; the owning worker aborts at the
    /// next pipeline checkpoint. An in-flight model call is never
    /// interrupted.
    pub async fn cancel(&self, id: JobId) -> Result<(), QueueError> {
        if self.store.cancel_queued(id).await? {
            tracing::info!(job_id = %id, "queued job cancelled");
            return Ok(());
        }
        if let Some(token) = self.cancellations.get(&id) {
            token.cancel();
            tracing::info!(job_id = %id, "active job flagged for cancellation");
        }
        Ok(())
    }

    /// The backing store
    #[inline]
    #[must_use]
    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Handler for a kind, if registered
    pub(crate) fn handler(&self, kind: JobKind) -> Option<Arc<dyn crate::worker::JobHandler>> {
        self.registry.get(kind)
    }

    /// Claim the next job of `kind` and register its cancellation token
    pub(crate) async fn claim_next(
        &self,
        kind: JobKind,
        lease: Duration,
    ) -> Result<Option<(GenerationJob, CancelToken)>, QueueError> {
        let Some(job) = self.store.claim(kind, lease).await? else {
            return Ok(None);
        };
        let token = CancelToken::new();
        self.cancellations.insert(job.id, token.clone());
        Ok(Some((job, token)))
    }

    /// Drop the cancellation token once a job reached a terminal state
    pub(crate) fn finish(&self, id: JobId) {
        self.cancellations.remove(&id);
    }
}
