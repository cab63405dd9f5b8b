//! Job store boundary and the in-memory default implementation

use crate::state::validate_transition;
use crate::types::{GenerationJob, JobErrorDetail, JobId, JobKind, JobStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

/// Job store errors
#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    /// Unknown job id
    #[error("job not found: {0}")]
    NotFound(JobId),

    /// The record was concurrently mutated; the caller's view is stale
    #[error("version conflict on job {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: JobId,
        expected: u64,
        found: u64,
    },

    /// Transition outside the lifecycle protocol
    #[error("illegal job transition: {from} -> {to}")]
    IllegalTransition { from: JobStatus, to: JobStatus },

    /// Store backend call failed
    #[error("job store backend error: {0}")]
    Backend(String),
}

/// Durable record store for generation jobs.
///
/// Leases back crash recovery: `claim` is atomic (no two workers hold
/// the same job), and `requeue_expired` returns jobs whose worker
/// stopped renewing to `queued` for another worker to pick up.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new job
    async fn insert(&self, job: GenerationJob) -> Result<(), JobStoreError>;

    /// Fetch the current record
    async fn get(&self, id: JobId) -> Result<GenerationJob, JobStoreError>;

    /// Atomically lease the oldest queued job of `kind`, marking it
    /// active. `None` when the partition is empty.
    async fn claim(
        &self,
        kind: JobKind,
        lease: Duration,
    ) -> Result<Option<GenerationJob>, JobStoreError>;

    /// Terminal transition to `completed` under optimistic concurrency
    async fn complete(
        &self,
        id: JobId,
        expected_version: u64,
        result: serde_json::Value,
    ) -> Result<(), JobStoreError>;

    /// Terminal transition to `failed` under optimistic concurrency
    async fn fail(
        &self,
        id: JobId,
        expected_version: u64,
        error: JobErrorDetail,
    ) -> Result<(), JobStoreError>;

    /// Best-effort progress write; regressions are ignored, not errors.
    /// Outside the optimistic protocol by design: a missed update is a
    /// UX degradation, not a correctness failure.
    async fn set_progress(&self, id: JobId, progress: u8) -> Result<(), JobStoreError>;

    /// Mark a still-queued job failed-as-cancelled so it is skipped at
    /// dispatch. Returns `false` if the job already left `queued`.
    async fn cancel_queued(&self, id: JobId) -> Result<bool, JobStoreError>;

    /// Crash recovery: return expired `active` leases to `queued`.
    /// Bypasses the monotonic transition validation deliberately.
    async fn requeue_expired(&self) -> Result<Vec<JobId>, JobStoreError>;
}

/// In-memory job store over a concurrent map plus per-kind FIFO queues
#[derive(Debug, Default)]
pub struct InMemoryJobStore {
    records: DashMap<JobId, GenerationJob>,
    queues: DashMap<JobKind, Mutex<VecDeque<JobId>>>,
}

impl InMemoryJobStore {
    /// Create an empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records (any status)
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn push_queued(&self, kind: JobKind, id: JobId) {
        self.queues
            .entry(kind)
            .or_insert_with(|| Mutex::new(VecDeque::new()))
            .lock()
            .push_back(id);
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn insert(&self, job: GenerationJob) -> Result<(), JobStoreError> {
        let id = job.id;
        let kind = job.kind;
        self.records.insert(id, job);
        self.push_queued(kind, id);
        Ok(())
    }

    async fn get(&self, id: JobId) -> Result<GenerationJob, JobStoreError> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(JobStoreError::NotFound(id))
    }

    async fn claim(
        &self,
        kind: JobKind,
        lease: Duration,
    ) -> Result<Option<GenerationJob>, JobStoreError> {
        let Some(partition) = self.queues.get(&kind) else {
            return Ok(None);
        };
        let mut queue = partition.lock();

        // Skip ids whose record already left `queued` (cancelled, or
        // claimed through an earlier requeue entry).
        while let Some(id) = queue.pop_front() {
            let Some(mut entry) = self.records.get_mut(&id) else {
                continue;
            };
            let job = entry.value_mut();
            if job.status != JobStatus::Queued {
                continue;
            }

            validate_transition(job.status, JobStatus::Active).map_err(|e| {
                JobStoreError::IllegalTransition {
                    from: e.from,
                    to: e.to,
                }
            })?;
            job.status = JobStatus::Active;
            job.started_at = Some(Utc::now());
            job.lease_expires_at = Some(
                Utc::now()
                    + chrono::Duration::from_std(lease).unwrap_or_else(|_| chrono::Duration::zero()),
            );
            job.version += 1;
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn complete(
        &self,
        id: JobId,
        expected_version: u64,
        result: serde_json::Value,
    ) -> Result<(), JobStoreError> {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(JobStoreError::NotFound(id))?;
        let job = entry.value_mut();

        if job.version != expected_version {
            return Err(JobStoreError::VersionConflict {
                id,
                expected: expected_version,
                found: job.version,
            });
        }
        validate_transition(job.status, JobStatus::Completed).map_err(|e| {
            JobStoreError::IllegalTransition {
                from: e.from,
                to: e.to,
            }
        })?;

        job.status = JobStatus::Completed;
        job.progress = 100;
        job.result = Some(result);
        job.finished_at = Some(Utc::now());
        job.lease_expires_at = None;
        job.version += 1;
        Ok(())
    }

    async fn fail(
        &self,
        id: JobId,
        expected_version: u64,
        error: JobErrorDetail,
    ) -> Result<(), JobStoreError> {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(JobStoreError::NotFound(id))?;
        let job = entry.value_mut();

        if job.version != expected_version {
            return Err(JobStoreError::VersionConflict {
                id,
                expected: expected_version,
                found: job.version,
            });
        }
        validate_transition(job.status, JobStatus::Failed).map_err(|e| {
            JobStoreError::IllegalTransition {
                from: e.from,
                to: e.to,
            }
        })?;

        job.status = JobStatus::Failed;
        job.error = Some(error);
        job.finished_at = Some(Utc::now());
        job.lease_expires_at = None;
        job.version += 1;
        Ok(())
    }

    async fn set_progress(&self, id: JobId, progress: u8) -> Result<(), JobStoreError> {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(JobStoreError::NotFound(id))?;
        let job = entry.value_mut();

        // Progress only moves forward, and only while active
        if job.status == JobStatus::Active && progress > job.progress {
            job.progress = progress.min(100);
        }
        Ok(())
    }

    async fn cancel_queued(&self, id: JobId) -> Result<bool, JobStoreError> {
        let mut entry = self
            .records
            .get_mut(&id)
            .ok_or(JobStoreError::NotFound(id))?;
        let job = entry.value_mut();

        if job.status != JobStatus::Queued {
            return Ok(false);
        }
        job.status = JobStatus::Failed;
        job.error = Some(JobErrorDetail::cancelled());
        job.finished_at = Some(Utc::now());
        job.version += 1;
        Ok(true)
    }

    async fn requeue_expired(&self) -> Result<Vec<JobId>, JobStoreError> {
        let now: DateTime<Utc> = Utc::now();
        let mut expired = Vec::new();

        // Pass 1: flip expired records back to queued.
        // Pass 2 pushes to the kind queues without any record lock held,
        // so claim's queue-then-record lock order cannot deadlock us.
        for mut entry in self.records.iter_mut() {
            let job = entry.value_mut();
            if job.status == JobStatus::Active
                && job.lease_expires_at.is_some_and(|deadline| deadline < now)
            {
                job.status = JobStatus::Queued;
                job.lease_expires_at = None;
                job.version += 1;
                expired.push((job.id, job.kind));
            }
        }

        let ids: Vec<JobId> = expired.iter().map(|(id, _)| *id).collect();
        for (id, kind) in expired {
            tracing::warn!(job_id = %id, %kind, "lease expired, requeueing");
            self.push_queued(kind, id);
        }
        Ok(ids)
    }
}
