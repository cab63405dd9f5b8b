//! LCG RAG - retrieval-augmented generation
//!
//! Given a query and filter predicates, produce a grounded answer:
//! cache first, then vector retrieval to assemble context, then one
//! guarded model call. Failures are never cached. An empty retrieval
//! result still reaches the model with an empty-context prompt - the
//! model may answer from general knowledge.

pub mod context;
pub mod engine;
pub mod error;

pub use context::{ConversationTurn, RetrievalContext, TurnRole};
pub use engine::{GeneratedAnswer, RagConfig, RagEngine};
pub use error::RagError;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
