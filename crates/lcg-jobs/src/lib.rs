//! LCG Jobs - the asynchronous generation job lifecycle
//!
//! Submission is non-blocking: a job is persisted `queued` and its id
//! returned immediately. A bounded pool of workers pulls jobs in FIFO
//! order per kind-partition, runs the kind's handler with progress
//! reporting and cooperative cancellation, and records the terminal
//! outcome. Leases make crashed workers recoverable: an `active` job
//! whose lease expires is requeued, so handlers run at-least-once and
//! must tolerate duplicate effects.

pub mod queue;
pub mod state;
pub mod store;
pub mod types;
pub mod worker;

pub use queue::{JobQueue, QueueConfig, QueueError};
pub use state::{allowed_transitions, validate_transition, IllegalTransition};
pub use store::{InMemoryJobStore, JobStore, JobStoreError};
pub use types::{GenerationJob, JobErrorDetail, JobId, JobKind, JobStatus};
pub use worker::{HandlerRegistry, JobContext, JobHandler, WorkerPool};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
