//! LCG Cache - Cache Store adapter
//!
//! Key/value store with per-key TTL used by the retrieval pipeline.
//! A cache hit must be indistinguishable from a fresh generation for the
//! same key inputs, so keys are derived deterministically from the query,
//! the filter predicates, and the model version.

pub mod error;
pub mod key;
pub mod store;

pub use error::CacheError;
pub use key::CacheKey;
pub use store::{CacheStats, CacheStore, MokaCacheStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
