//! Handler seam and the bounded worker pool

use crate::queue::{JobQueue, QueueConfig};
use crate::store::JobStore;
use crate::types::{GenerationJob, JobErrorDetail, JobId, JobKind};
use async_trait::async_trait;
use lcg_llm::CancelToken;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Execution context handed to a handler: the claimed job, progress
/// reporting, and the cooperative cancellation flag.
pub struct JobContext {
    job: GenerationJob,
    store: Arc<dyn JobStore>,
    cancel: CancelToken,
}

impl JobContext {
    /// The claimed job record
    #[inline]
    #[must_use]
    pub fn job(&self) -> &GenerationJob {
        &self.job
    }

    /// Kind-specific input parameters
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &serde_json::Value {
        &self.job.payload
    }

    /// The job's cancellation token, for threading into pipeline stages
    #[inline]
    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Whether cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Fire-and-forget progress write. A missed update degrades the UX,
    /// never the outcome, so failures are only logged.
    pub async fn report_progress(&self, progress: u8) {
        if let Err(err) = self.store.set_progress(self.job.id, progress).await {
            tracing::debug!(job_id = %self.job.id, error = %err, "progress update dropped");
        }
    }
}

/// Kind-specific job logic.
///
/// Execution is at-least-once: a lease expiring mid-run lets another
/// worker pick the job up again, so handlers must be idempotent or
/// tolerate duplicate effects.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// The kind this handler serves
    fn kind(&self) -> JobKind;

    /// Reject bad payloads at submission time
    fn validate(&self, _payload: &serde_json::Value) -> Result<(), String> {
        Ok(())
    }

    /// Run the job to a result value or a structured failure
    async fn execute(&self, ctx: JobContext) -> Result<serde_json::Value, JobErrorDetail>;
}

/// Handler lookup by kind
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<JobKind, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler under its kind
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn JobHandler>) -> Self {
        self.handlers.insert(handler.kind(), handler);
        self
    }

    /// Handler for `kind`, if registered
    #[must_use]
    pub fn get(&self, kind: JobKind) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(&kind).cloned()
    }
}

/// Bounded pool of workers pulling from the queue.
///
/// Each worker sweeps the kind partitions round-robin (offset by worker
/// index so partitions do not starve), processes one job at a time, and
/// suspends on the blocking model/index calls while other workers run
/// independently. A reaper task returns expired leases to the queue.
pub struct WorkerPool {
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn the workers and the lease reaper
    #[must_use]
    pub fn start(queue: Arc<JobQueue>, config: QueueConfig) -> Self {
        let (shutdown, _) = watch::channel(false);
        let mut handles = Vec::with_capacity(config.workers + 1);

        for worker_id in 0..config.workers {
            handles.push(tokio::spawn(worker_loop(
                queue.clone(),
                config.clone(),
                worker_id,
                shutdown.subscribe(),
            )));
        }
        handles.push(tokio::spawn(lease_reaper(
            queue.clone(),
            config.clone(),
            shutdown.subscribe(),
        )));

        tracing::info!(workers = config.workers, "worker pool started");
        Self { shutdown, handles }
    }

    /// Stop accepting work and wait for in-flight jobs to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            let _ = handle.await;
        }
        tracing::info!("worker pool stopped");
    }
}

async fn worker_loop(
    queue: Arc<JobQueue>,
    config: QueueConfig,
    worker_id: usize,
    mut shutdown: watch::Receiver<bool>,
) {
    let kinds = JobKind::ALL;
    loop {
        if *shutdown.borrow() {
            break;
        }

        let mut worked = false;
        for offset in 0..kinds.len() {
            let kind = kinds[(worker_id + offset) % kinds.len()];
            match queue.claim_next(kind, config.lease_timeout).await {
                Ok(Some((job, cancel))) => {
                    process(&queue, job, cancel).await;
                    worked = true;
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::error!(worker_id, %kind, error = %err, "claim failed");
                }
            }
        }

        if !worked {
            tokio::select! {
                _ = shutdown.changed() => {}
                () = tokio::time::sleep(config.poll_interval) => {}
            }
        }
    }
}

async fn process(queue: &Arc<JobQueue>, job: GenerationJob, cancel: CancelToken) {
    let id = job.id;
    let kind = job.kind;
    let version = job.version;
    tracing::info!(job_id = %id, %kind, "job active");

    let Some(handler) = queue.handler(kind) else {
        let detail = JobErrorDetail::new("internal", format!("no handler for kind {kind}"), false);
        record_failure(queue, id, version, detail).await;
        return;
    };

    let ctx = JobContext {
        job,
        store: queue.store().clone(),
        cancel,
    };

    // Run the handler in its own task so a panic is caught and recorded
    // as a failed job instead of killing the worker.
    let outcome = tokio::spawn(async move { handler.execute(ctx).await }).await;

    match outcome {
        Ok(Ok(result)) => {
            if let Err(err) = queue.store().complete(id, version, result).await {
                tracing::warn!(job_id = %id, error = %err, "completion lost to concurrent transition");
            } else {
                tracing::info!(job_id = %id, "job completed");
            }
        }
        Ok(Err(detail)) => record_failure(queue, id, version, detail).await,
        Err(join_err) => {
            let detail = if join_err.is_panic() {
                JobErrorDetail::new("internal", "handler panicked", false)
            } else {
                JobErrorDetail::new("internal", "handler aborted", false)
            };
            record_failure(queue, id, version, detail).await;
        }
    }

    queue.finish(id);
}

async fn record_failure(queue: &Arc<JobQueue>, id: JobId, version: u64, detail: JobErrorDetail) {
    tracing::warn!(job_id = %id, code = %detail.code, message = %detail.message, "job failed");
    if let Err(err) = queue.store().fail(id, version, detail).await {
        tracing::warn!(job_id = %id, error = %err, "failure record lost to concurrent transition");
    }
}

async fn lease_reaper(queue: Arc<JobQueue>, config: QueueConfig, mut shutdown: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            () = tokio::time::sleep(config.reaper_interval) => {
                match queue.store().requeue_expired().await {
                    Ok(requeued) if !requeued.is_empty() => {
                        tracing::warn!(count = requeued.len(), "requeued expired leases");
                    }
                    Ok(_) => {}
                    Err(err) => tracing::error!(error = %err, "lease reaper sweep failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryJobStore;
    use crate::types::JobStatus;
    use std::time::Duration;

    /// Completes with its own payload after reporting progress
    struct EchoHandler;

    #[async_trait]
    impl JobHandler for EchoHandler {
        fn kind(&self) -> JobKind {
            JobKind::SyllabusGeneration
        }

        fn validate(&self, payload: &serde_json::Value) -> Result<(), String> {
            if payload.get("subject").is_none() {
                return Err("missing subject".to_string());
            }
            Ok(())
        }

        async fn execute(&self, ctx: JobContext) -> Result<serde_json::Value, JobErrorDetail> {
            ctx.report_progress(50).await;
            Ok(ctx.payload().clone())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl JobHandler for FailingHandler {
        fn kind(&self) -> JobKind {
            JobKind::QuestionsBatch
        }

        async fn execute(&self, _ctx: JobContext) -> Result<serde_json::Value, JobErrorDetail> {
            Err(JobErrorDetail::new("timeout", "model too slow", true))
        }
    }

    struct PanickingHandler;

    #[async_trait]
    impl JobHandler for PanickingHandler {
        fn kind(&self) -> JobKind {
            JobKind::ContentEnhancement
        }

        async fn execute(&self, _ctx: JobContext) -> Result<serde_json::Value, JobErrorDetail> {
            panic!("boom");
        }
    }

    /// Loops until cancelled, then reports a cancellation failure
    struct SlowCancellableHandler;

    #[async_trait]
    impl JobHandler for SlowCancellableHandler {
        fn kind(&self) -> JobKind {
            JobKind::SyllabusGeneration
        }

        async fn execute(&self, ctx: JobContext) -> Result<serde_json::Value, JobErrorDetail> {
            for _ in 0..200 {
                if ctx.is_cancelled() {
                    return Err(JobErrorDetail::cancelled());
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            Ok(serde_json::json!("finished uncancelled"))
        }
    }

    fn test_config() -> QueueConfig {
        QueueConfig::default()
            .with_workers(2)
            .with_poll_interval(Duration::from_millis(10))
    }

    fn queue_with(handlers: Vec<Arc<dyn JobHandler>>) -> Arc<JobQueue> {
        let mut registry = HandlerRegistry::new();
        for handler in handlers {
            registry = registry.with_handler(handler);
        }
        Arc::new(JobQueue::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(registry),
        ))
    }

    async fn poll_until_terminal(queue: &JobQueue, id: JobId) -> GenerationJob {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let job = queue.status(id).await.unwrap();
                if job.status.is_terminal() {
                    return job;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("job did not reach a terminal state in time")
    }

    #[tokio::test]
    async fn submitted_job_completes_with_result() {
        let queue = queue_with(vec![Arc::new(EchoHandler)]);
        let pool = WorkerPool::start(queue.clone(), test_config());

        let payload = serde_json::json!({"subject": "Math", "class": "8", "board": "CBSE"});
        let id = queue
            .submit(JobKind::SyllabusGeneration, payload.clone())
            .await
            .unwrap();

        let job = poll_until_terminal(&queue, id).await;
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert_eq!(job.result, Some(payload));
        assert!(job.finished_at.is_some());

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn invalid_payload_is_rejected_at_submission() {
        let queue = queue_with(vec![Arc::new(EchoHandler)]);

        let err = queue
            .submit(JobKind::SyllabusGeneration, serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, crate::queue::QueueError::Validation { .. }));
    }

    #[tokio::test]
    async fn unregistered_kind_is_rejected() {
        let queue = queue_with(vec![Arc::new(EchoHandler)]);

        let err = queue
            .submit(JobKind::QuestionsBatch, serde_json::json!({}))
            .await
            .unwrap_err();

        assert!(matches!(err, crate::queue::QueueError::UnknownKind(_)));
    }

    #[tokio::test]
    async fn handler_failure_records_structured_detail() {
        let queue = queue_with(vec![Arc::new(FailingHandler)]);
        let pool = WorkerPool::start(queue.clone(), test_config());

        let id = queue
            .submit(JobKind::QuestionsBatch, serde_json::json!({}))
            .await
            .unwrap();

        let job = poll_until_terminal(&queue, id).await;
        assert_eq!(job.status, JobStatus::Failed);
        let detail = job.error.unwrap();
        assert_eq!(detail.code, "timeout");
        assert!(detail.retryable);

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn handler_panic_becomes_failed_job() {
        let queue = queue_with(vec![Arc::new(PanickingHandler)]);
        let pool = WorkerPool::start(queue.clone(), test_config());

        let id = queue
            .submit(JobKind::ContentEnhancement, serde_json::json!({}))
            .await
            .unwrap();

        let job = poll_until_terminal(&queue, id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.unwrap().code, "internal");

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn cancelling_queued_job_prevents_dispatch() {
        // No pool running: the job stays queued until we cancel it
        let queue = queue_with(vec![Arc::new(EchoHandler)]);

        let id = queue
            .submit(
                JobKind::SyllabusGeneration,
                serde_json::json!({"subject": "Math"}),
            )
            .await
            .unwrap();
        queue.cancel(id).await.unwrap();

        let job = queue.status(id).await.unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.unwrap().code, "cancelled");
    }

    #[tokio::test]
    async fn cancelling_active_job_is_cooperative() {
        let queue = queue_with(vec![Arc::new(SlowCancellableHandler)]);
        let pool = WorkerPool::start(queue.clone(), test_config());

        let id = queue
            .submit(
                JobKind::SyllabusGeneration,
                serde_json::json!({"subject": "Math"}),
            )
            .await
            .unwrap();

        // Wait for the worker to pick it up, then cancel
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if queue.status(id).await.unwrap().status == JobStatus::Active {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        queue.cancel(id).await.unwrap();

        let job = poll_until_terminal(&queue, id).await;
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.unwrap().code, "cancelled");

        pool.shutdown().await;
    }

    #[tokio::test]
    async fn kinds_are_processed_concurrently() {
        let queue = queue_with(vec![Arc::new(EchoHandler), Arc::new(FailingHandler)]);
        let pool = WorkerPool::start(queue.clone(), test_config());

        let syllabus = queue
            .submit(
                JobKind::SyllabusGeneration,
                serde_json::json!({"subject": "Math"}),
            )
            .await
            .unwrap();
        let questions = queue
            .submit(JobKind::QuestionsBatch, serde_json::json!({}))
            .await
            .unwrap();

        let a = poll_until_terminal(&queue, syllabus).await;
        let b = poll_until_terminal(&queue, questions).await;
        assert_eq!(a.status, JobStatus::Completed);
        assert_eq!(b.status, JobStatus::Failed);

        pool.shutdown().await;
    }
}
