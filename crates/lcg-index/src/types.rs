//! Core types for vector storage and retrieval filtering

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fixed-dimension embedding vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    /// Wrap a raw vector
    #[inline]
    #[must_use]
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    /// Number of components
    #[inline]
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Raw component slice
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

impl From<Vec<f32>> for EmbeddingVector {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

/// Kind of entity owning an embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Topic,
    Question,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Topic => write!(f, "topic"),
            EntityKind::Question => write!(f, "question"),
        }
    }
}

/// Embedding persisted alongside its owning entity for audit/reference.
///
/// The index holds the searchable copy; this record is the ownership
/// truth. The two are reconciled by the synchronizer, not transactionally
/// coupled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Owning entity id
    pub entity_id: Uuid,
    /// Owning entity kind
    pub kind: EntityKind,
    /// The vector, dimension matching the configured index
    pub vector: EmbeddingVector,
    /// Owning-context fields used for filtered search
    pub metadata: PassageMetadata,
    /// Last synchronization time
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl EmbeddingRecord {
    /// Serialized form stored next to the owning entity
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Owning-context metadata attached to every indexed passage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassageMetadata {
    pub subject: Option<String>,
    pub class_level: Option<String>,
    pub board: Option<String>,
    pub teacher_id: Option<String>,
    pub topic_id: Option<String>,
}

/// One retrieved passage with its similarity score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    /// Source entity id
    pub id: Uuid,
    /// Cosine similarity to the query vector
    pub score: f32,
    /// Passage text
    pub text: String,
    /// Owning-context metadata
    pub metadata: PassageMetadata,
}

/// Exact-match filter predicates for retrieval scoping
///
/// Every set predicate is mandatory: a candidate failing any one of them
/// is excluded regardless of similarity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    pub subject: Option<String>,
    pub class_level: Option<String>,
    pub board: Option<String>,
    pub teacher_id: Option<String>,
    pub topic_id: Option<String>,
}

impl FilterSet {
    /// Empty filter set (matches everything)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scope to a subject
    #[inline]
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Scope to a class level
    #[inline]
    #[must_use]
    pub fn with_class_level(mut self, class_level: impl Into<String>) -> Self {
        self.class_level = Some(class_level.into());
        self
    }

    /// Scope to a board
    #[inline]
    #[must_use]
    pub fn with_board(mut self, board: impl Into<String>) -> Self {
        self.board = Some(board.into());
        self
    }

    /// Scope to a teacher
    #[inline]
    #[must_use]
    pub fn with_teacher(mut self, teacher_id: impl Into<String>) -> Self {
        self.teacher_id = Some(teacher_id.into());
        self
    }

    /// Scope to a topic
    #[inline]
    #[must_use]
    pub fn with_topic(mut self, topic_id: impl Into<String>) -> Self {
        self.topic_id = Some(topic_id.into());
        self
    }

    /// Whether a candidate's metadata satisfies every set predicate
    #[must_use]
    pub fn matches(&self, metadata: &PassageMetadata) -> bool {
        fn check(predicate: &Option<String>, value: &Option<String>) -> bool {
            match predicate {
                None => true,
                Some(expected) => value.as_deref() == Some(expected.as_str()),
            }
        }

        check(&self.subject, &metadata.subject)
            && check(&self.class_level, &metadata.class_level)
            && check(&self.board, &metadata.board)
            && check(&self.teacher_id, &metadata.teacher_id)
            && check(&self.topic_id, &metadata.topic_id)
    }

    /// Set predicates as (name, value) pairs, for cache-key derivation
    #[must_use]
    pub fn predicate_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if let Some(v) = &self.subject {
            pairs.push(("subject", v.as_str()));
        }
        if let Some(v) = &self.class_level {
            pairs.push(("class_level", v.as_str()));
        }
        if let Some(v) = &self.board {
            pairs.push(("board", v.as_str()));
        }
        if let Some(v) = &self.teacher_id {
            pairs.push(("teacher_id", v.as_str()));
        }
        if let Some(v) = &self.topic_id {
            pairs.push(("topic_id", v.as_str()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> PassageMetadata {
        PassageMetadata {
            subject: Some("Math".to_string()),
            class_level: Some("8".to_string()),
            board: Some("CBSE".to_string()),
            teacher_id: None,
            topic_id: Some("fractions".to_string()),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(FilterSet::new().matches(&metadata()));
        assert!(FilterSet::new().matches(&PassageMetadata::default()));
    }

    #[test]
    fn all_set_predicates_are_mandatory() {
        let filters = FilterSet::new().with_subject("Math").with_board("ICSE");
        // Subject matches but board does not
        assert!(!filters.matches(&metadata()));
    }

    #[test]
    fn missing_metadata_field_fails_set_predicate() {
        let filters = FilterSet::new().with_teacher("t-1");
        assert!(!filters.matches(&metadata()));
    }

    #[test]
    fn predicate_pairs_only_include_set_fields() {
        let filters = FilterSet::new().with_subject("Math").with_class_level("8");
        let pairs = filters.predicate_pairs();
        assert_eq!(
            pairs,
            vec![("subject", "Math"), ("class_level", "8")]
        );
    }

    #[test]
    fn embedding_record_serializes_for_persistence() {
        let record = EmbeddingRecord {
            entity_id: Uuid::new_v4(),
            kind: EntityKind::Question,
            vector: EmbeddingVector::new(vec![0.25, 0.5]),
            metadata: metadata(),
            updated_at: chrono::Utc::now(),
        };

        let json = record.to_json().unwrap();
        let back: EmbeddingRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.entity_id, record.entity_id);
        assert_eq!(back.kind, EntityKind::Question);
        assert_eq!(back.vector, record.vector);
    }
}
