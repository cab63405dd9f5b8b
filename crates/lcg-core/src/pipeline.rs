//! Pipeline assembly and the submission API

use crate::config::LcgConfig;
use crate::error::GenerationError;
use crate::handlers::{EnhancementHandler, QuestionsBatchHandler, SyllabusHandler};
use lcg_cache::{CacheStore, MokaCacheStore};
use lcg_index::{
    EmbeddingGenerator, EmbeddingSynchronizer, EntityKind, InMemoryVectorIndex, PassageMetadata,
    SyncOutcome, VectorIndex,
};
use lcg_jobs::{
    GenerationJob, HandlerRegistry, InMemoryJobStore, JobId, JobKind, JobQueue, WorkerPool,
};
use lcg_llm::{
    BreakerRegistry, BreakerState, GuardedLlmClient, HttpEmbeddingGenerator, HttpLlmClient,
    LlmClient,
};
use lcg_rag::RagEngine;
use std::sync::Arc;
use uuid::Uuid;

/// The assembled generation pipeline.
///
/// Owns the cache, the vector index, the guarded model client, the RAG
/// engine, and the job queue with its worker pool. The submission API
/// (`submit` / `poll` / `cancel`) is what the HTTP layer consumes.
pub struct ContentPipeline {
    cache: Arc<dyn CacheStore>,
    index: Arc<dyn VectorIndex>,
    sync: Arc<EmbeddingSynchronizer>,
    breakers: Arc<BreakerRegistry>,
    queue: Arc<JobQueue>,
    pool: WorkerPool,
}

impl ContentPipeline {
    /// Assemble the production pipeline: HTTP model clients against the
    /// configured local model server, in-memory cache, index, and store.
    ///
    /// # Errors
    /// `GenerationError::Internal` if an HTTP client cannot be built.
    pub fn start(config: LcgConfig) -> Result<Self, GenerationError> {
        let llm = HttpLlmClient::new(&config.llm)
            .map_err(|e| GenerationError::Internal(e.to_string()))?;
        let embedder = HttpEmbeddingGenerator::new(&config.llm)
            .map_err(|e| GenerationError::Internal(e.to_string()))?;

        let cache = Arc::new(MokaCacheStore::new(config.cache_capacity));
        let index = Arc::new(InMemoryVectorIndex::new(config.llm.embedding_dimension));

        Ok(Self::with_components(
            config,
            cache,
            Arc::new(embedder),
            index,
            Arc::new(llm),
        ))
    }

    /// Assemble a pipeline from caller-supplied backends. This is the
    /// seam the tests (and any non-default cache/index/model backend)
    /// plug into. Spawns the worker tasks, so it must run inside a
    /// tokio runtime.
    #[must_use]
    pub fn with_components(
        config: LcgConfig,
        cache: Arc<dyn CacheStore>,
        embedder: Arc<dyn EmbeddingGenerator>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        let breakers = Arc::new(BreakerRegistry::new(config.breaker));
        let breaker = breakers.for_endpoint(&config.llm.model);
        let guarded: Arc<dyn LlmClient> =
            Arc::new(GuardedLlmClient::new(llm, breaker, config.retry));

        let rag = Arc::new(RagEngine::new(
            cache.clone(),
            embedder.clone(),
            index.clone(),
            guarded,
            config.llm.clone(),
            config.rag.clone(),
        ));
        let sync = Arc::new(EmbeddingSynchronizer::new(
            embedder,
            index.clone(),
            config.sync_retry,
        ));

        let registry = HandlerRegistry::new()
            .with_handler(Arc::new(SyllabusHandler::new(rag.clone())))
            .with_handler(Arc::new(QuestionsBatchHandler::new(
                rag.clone(),
                sync.clone(),
            )))
            .with_handler(Arc::new(EnhancementHandler::new(rag.clone(), sync.clone())));

        let queue = Arc::new(JobQueue::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(registry),
        ));
        let pool = WorkerPool::start(queue.clone(), config.queue.clone());

        tracing::info!(model = %config.llm.model, workers = config.queue.workers, "pipeline started");

        Self {
            cache,
            index,
            sync,
            breakers,
            queue,
            pool,
        }
    }

    /// Submit a generation job; returns immediately with the job id.
    ///
    /// # Errors
    /// `GenerationError::Validation` for a bad payload; the job is
    /// never enqueued in that case.
    pub async fn submit(
        &self,
        kind: JobKind,
        payload: serde_json::Value,
    ) -> Result<JobId, GenerationError> {
        self.queue.submit(kind, payload).await.map_err(Into::into)
    }

    /// Poll a job: status, progress, and result or structured error
    pub async fn poll(&self, id: JobId) -> Result<GenerationJob, GenerationError> {
        self.queue.status(id).await.map_err(Into::into)
    }

    /// Cancel a queued job (removed before dispatch) or flag an active
    /// one for cooperative cancellation
    pub async fn cancel(&self, id: JobId) -> Result<(), GenerationError> {
        self.queue.cancel(id).await.map_err(Into::into)
    }

    /// Synchronize one entity's embedding after its content changed
    pub async fn sync_entity(
        &self,
        entity_id: Uuid,
        kind: EntityKind,
        text: &str,
        metadata: PassageMetadata,
    ) -> Result<SyncOutcome, GenerationError> {
        self.sync
            .sync(entity_id, kind, text, metadata)
            .await
            .map_err(Into::into)
    }

    /// Administrative cache flush
    pub async fn flush_cache(&self) -> Result<(), GenerationError> {
        self.cache
            .flush()
            .await
            .map_err(|e| GenerationError::Internal(e.to_string()))
    }

    /// Breaker state for a model endpoint
    #[must_use]
    pub fn breaker_state(&self, endpoint: &str) -> BreakerState {
        self.breakers.for_endpoint(endpoint).state()
    }

    /// The vector index (content seeding and inspection)
    #[inline]
    #[must_use]
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Stop the workers after letting in-flight jobs finish
    pub async fn shutdown(self) {
        self.pool.shutdown().await;
    }
}
