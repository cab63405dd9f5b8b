//! Embedding generation seam

use crate::error::IndexError;
use crate::types::EmbeddingVector;
use async_trait::async_trait;

/// Text to fixed-dimension vector.
///
/// Implementations must be deterministic: equal input text yields equal
/// vectors for the lifetime of a model version. The produced dimension
/// must equal [`EmbeddingGenerator::dimension`].
#[async_trait]
pub trait EmbeddingGenerator: Send + Sync {
    /// Compute the embedding for a piece of text
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, IndexError>;

    /// Output dimension of this generator
    fn dimension(&self) -> usize;
}
