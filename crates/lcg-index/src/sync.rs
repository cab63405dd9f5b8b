//! Embedding synchronization between owning entities and the vector index
//!
//! After a topic or question is created or its text changes, the index
//! copy of its embedding must be refreshed. Index upserts are retried
//! with exponential backoff up to a bounded attempt count; exhaustion
//! surfaces as a recoverable "embedding pending" outcome attached to the
//! owning entity, never as a fatal error for the creation flow.

use crate::embedder::EmbeddingGenerator;
use crate::error::IndexError;
use crate::index::VectorIndex;
use crate::types::{EmbeddingRecord, EntityKind, PassageMetadata};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Retry bounds for index upserts
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncRetryConfig {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Base delay; doubles on each retry
    pub base_delay: Duration,
}

impl Default for SyncRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Result of a synchronization pass
#[derive(Debug, Clone)]
pub enum SyncOutcome {
    /// Index and record agree; the record is ready to persist alongside
    /// the owning entity
    Synced(EmbeddingRecord),
    /// Index upsert kept failing; the record still carries the computed
    /// vector, the entity should be flagged "embedding pending" and the
    /// sync repeated later
    Pending {
        record: EmbeddingRecord,
        error: IndexError,
    },
}

impl SyncOutcome {
    /// The record regardless of outcome
    #[inline]
    #[must_use]
    pub fn record(&self) -> &EmbeddingRecord {
        match self {
            SyncOutcome::Synced(record) | SyncOutcome::Pending { record, .. } => record,
        }
    }

    /// Whether the index holds the current vector
    #[inline]
    #[must_use]
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced(_))
    }
}

/// Reconciles owning entities with the vector index.
///
/// Synchronization is idempotent: re-running a pending sync with the same
/// text converges to the same index state.
pub struct EmbeddingSynchronizer {
    embedder: Arc<dyn EmbeddingGenerator>,
    index: Arc<dyn VectorIndex>,
    retry: SyncRetryConfig,
}

impl EmbeddingSynchronizer {
    /// Create a synchronizer over an embedder and an index
    #[must_use]
    pub fn new(
        embedder: Arc<dyn EmbeddingGenerator>,
        index: Arc<dyn VectorIndex>,
        retry: SyncRetryConfig,
    ) -> Self {
        Self {
            embedder,
            index,
            retry,
        }
    }

    /// Synchronize one entity's embedding.
    ///
    /// Computes the embedding, upserts it into the index with the
    /// owning-context metadata, and returns the record to persist
    /// alongside the entity.
    ///
    /// # Errors
    /// `IndexError::DimensionMismatch` and embedding failures are fatal
    /// for this write. Transient index failures are retried; after the
    /// attempt budget the result is `SyncOutcome::Pending`, not an error.
    pub async fn sync(
        &self,
        entity_id: Uuid,
        kind: EntityKind,
        text: &str,
        metadata: PassageMetadata,
    ) -> Result<SyncOutcome, IndexError> {
        let vector = self.embedder.embed(text).await?;

        if vector.dimension() != self.index.dimension() {
            return Err(IndexError::DimensionMismatch {
                expected: self.index.dimension(),
                actual: vector.dimension(),
            });
        }

        let record = EmbeddingRecord {
            entity_id,
            kind,
            vector: vector.clone(),
            metadata: metadata.clone(),
            updated_at: chrono::Utc::now(),
        };

        let mut delay = self.retry.base_delay;
        let mut last_error = None;

        for attempt in 1..=self.retry.max_attempts {
            match self
                .index
                .upsert(entity_id, vector.clone(), text.to_string(), metadata.clone())
                .await
            {
                Ok(()) => {
                    tracing::debug!(%entity_id, %kind, attempt, "embedding synchronized");
                    return Ok(SyncOutcome::Synced(record));
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    tracing::warn!(%entity_id, %kind, attempt, error = %err, "index upsert failed");
                    last_error = Some(err);
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        let error = last_error.unwrap_or_else(|| IndexError::Backend("upsert never ran".into()));
        tracing::warn!(%entity_id, %kind, error = %error, "embedding left pending after retries");
        Ok(SyncOutcome::Pending { record, error })
    }
}
