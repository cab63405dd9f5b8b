//! LCG Core - pipeline orchestration
//!
//! Wires the leaf components into the asynchronous generation pipeline:
//! - Cache-first RAG retrieval over the vector index
//! - A circuit-breaker-guarded model client with bounded retries
//! - The job queue and bounded worker pool running the kind handlers
//! - Embedding synchronization between entities and the index
//!
//! # Example
//!
//! ```rust,ignore
//! use lcg_core::{ContentPipeline, LcgConfig};
//! use lcg_jobs::JobKind;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = ContentPipeline::start(LcgConfig::new())?;
//!
//! let id = pipeline
//!     .submit(
//!         JobKind::SyllabusGeneration,
//!         serde_json::json!({"subject": "Math", "class": "8", "board": "CBSE"}),
//!     )
//!     .await?;
//!
//! let job = pipeline.poll(id).await?;
//! println!("status: {}", job.status);
//! # Ok(())
//! # }
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod handlers;
pub mod pipeline;

// Re-exports for convenience
pub use config::LcgConfig;
pub use error::GenerationError;
pub use handlers::{EnhancementHandler, QuestionsBatchHandler, SyllabusHandler};
pub use pipeline::ContentPipeline;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the LCG pipeline
    pub use crate::{ContentPipeline, GenerationError, LcgConfig};
    pub use lcg_index::{EntityKind, FilterSet, PassageMetadata};
    pub use lcg_jobs::{JobId, JobKind, JobStatus};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
