//! LCG Index - vector storage and embedding synchronization
//!
//! Three concerns live here:
//! - The [`VectorIndex`] boundary: (id, embedding, metadata) triples with
//!   filtered nearest-neighbor search
//! - The [`EmbeddingGenerator`] seam: text to fixed-dimension vector
//! - The [`EmbeddingSynchronizer`]: keeps the index consistent with the
//!   owning entity records after content changes
//!
//! Dimension mismatches are rejected at write time, never truncated or
//! padded. Every vector in the index belongs to an owning entity.

pub mod embedder;
pub mod error;
pub mod index;
pub mod sync;
pub mod types;

pub use embedder::EmbeddingGenerator;
pub use error::IndexError;
pub use index::{InMemoryVectorIndex, VectorIndex};
pub use sync::{EmbeddingSynchronizer, SyncOutcome, SyncRetryConfig};
pub use types::{
    EmbeddingRecord, EmbeddingVector, EntityKind, FilterSet, PassageMetadata, ScoredPassage,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
