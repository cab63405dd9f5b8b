//! Vector index boundary and the in-memory default implementation

use crate::error::IndexError;
use crate::types::{EmbeddingVector, FilterSet, PassageMetadata, ScoredPassage};
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

/// Stored entry: vector plus the passage it was computed from
#[derive(Debug, Clone)]
struct IndexEntry {
    vector: EmbeddingVector,
    text: String,
    metadata: PassageMetadata,
}

/// (id, embedding, metadata) store with filtered nearest-neighbor search
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace the entry for `id`.
    ///
    /// # Errors
    /// `IndexError::DimensionMismatch` if the vector dimension differs
    /// from the index dimension; the index is left unchanged.
    async fn upsert(
        &self,
        id: Uuid,
        vector: EmbeddingVector,
        text: String,
        metadata: PassageMetadata,
    ) -> Result<(), IndexError>;

    /// Top-k nearest neighbors satisfying every filter predicate,
    /// ordered by descending similarity score.
    async fn search(
        &self,
        vector: &EmbeddingVector,
        filters: &FilterSet,
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>, IndexError>;

    /// Remove the entry for `id`, if present
    async fn remove(&self, id: Uuid) -> Result<(), IndexError>;

    /// Number of stored entries
    fn len(&self) -> usize;

    /// Whether the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed dimension this index accepts
    fn dimension(&self) -> usize;
}

/// Brute-force cosine-similarity index over a concurrent map.
///
/// Candidate filtering happens before scoring, so a passage failing any
/// exact-match predicate is excluded regardless of similarity. Fine for
/// the corpus sizes a single teacher/board partition produces; the trait
/// is the seam for an ANN-backed replacement.
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    dimension: usize,
    entries: DashMap<Uuid, IndexEntry>,
}

impl InMemoryVectorIndex {
    /// Create an index accepting vectors of exactly `dimension`
    #[inline]
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: DashMap::new(),
        }
    }

    fn check_dimension(&self, vector: &EmbeddingVector) -> Result<(), IndexError> {
        if vector.dimension() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.dimension(),
            });
        }
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    let denom = mag_a.sqrt() * mag_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    async fn upsert(
        &self,
        id: Uuid,
        vector: EmbeddingVector,
        text: String,
        metadata: PassageMetadata,
    ) -> Result<(), IndexError> {
        self.check_dimension(&vector)?;
        self.entries.insert(
            id,
            IndexEntry {
                vector,
                text,
                metadata,
            },
        );
        Ok(())
    }

    async fn search(
        &self,
        vector: &EmbeddingVector,
        filters: &FilterSet,
        top_k: usize,
    ) -> Result<Vec<ScoredPassage>, IndexError> {
        self.check_dimension(vector)?;

        let mut scored: Vec<ScoredPassage> = self
            .entries
            .iter()
            .filter(|entry| filters.matches(&entry.value().metadata))
            .map(|entry| ScoredPassage {
                id: *entry.key(),
                score: cosine_similarity(vector.as_slice(), entry.value().vector.as_slice()),
                text: entry.value().text.clone(),
                metadata: entry.value().metadata.clone(),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        tracing::debug!(
            candidates = scored.len(),
            top_k,
            "vector search completed"
        );
        Ok(scored)
    }

    async fn remove(&self, id: Uuid) -> Result<(), IndexError> {
        self.entries.remove(&id);
        Ok(())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
