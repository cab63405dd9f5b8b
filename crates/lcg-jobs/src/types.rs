//! Job record types

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique job identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct JobId(pub Ulid);

impl JobId {
    /// Generate new job ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of generation work a job carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobKind {
    SyllabusGeneration,
    QuestionsBatch,
    ContentEnhancement,
}

impl JobKind {
    /// Every kind, in dispatch order
    pub const ALL: [JobKind; 3] = [
        JobKind::SyllabusGeneration,
        JobKind::QuestionsBatch,
        JobKind::ContentEnhancement,
    ];

    /// Wire name of this kind
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::SyllabusGeneration => "syllabus-generation",
            JobKind::QuestionsBatch => "questions-batch",
            JobKind::ContentEnhancement => "content-enhancement",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    /// Whether this state absorbs all transitions
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Active => write!(f, "active"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Structured failure detail recorded on a failed job.
///
/// This is what polling a failed job returns - never a raw stack trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobErrorDetail {
    /// Stable machine-readable code (e.g. "validation", "timeout")
    pub code: String,
    /// Human-readable description
    pub message: String,
    /// Whether resubmitting the same payload may succeed
    pub retryable: bool,
}

impl JobErrorDetail {
    /// Create a detail record
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            retryable,
        }
    }

    /// Detail for a cooperatively cancelled job
    #[must_use]
    pub fn cancelled() -> Self {
        Self::new("cancelled", "job cancelled by caller", false)
    }
}

/// Durable record of one submitted generation job.
///
/// Mutated only by the worker holding its lease; immutable once
/// terminal. The version counter backs optimistic concurrency on
/// status transitions. Progress is monotone non-decreasing while
/// active and outside the optimistic protocol (best-effort).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub kind: JobKind,
    /// Kind-specific input parameters, opaque to the queue
    pub payload: serde_json::Value,
    pub status: JobStatus,
    /// 0-100
    pub progress: u8,
    /// Set only on `completed`
    pub result: Option<serde_json::Value>,
    /// Set only on `failed`
    pub error: Option<JobErrorDetail>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub finished_at: Option<chrono::DateTime<chrono::Utc>>,
    /// While active: the lease deadline for crash recovery
    pub lease_expires_at: Option<chrono::DateTime<chrono::Utc>>,
    /// Optimistic concurrency counter
    pub version: u64,
}

impl GenerationJob {
    /// Create a freshly queued job
    #[must_use]
    pub fn new(kind: JobKind, payload: serde_json::Value) -> Self {
        Self {
            id: JobId::new(),
            kind,
            payload,
            status: JobStatus::Queued,
            progress: 0,
            result: None,
            error: None,
            created_at: chrono::Utc::now(),
            started_at: None,
            finished_at: None,
            lease_expires_at: None,
            version: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_job_starts_queued() {
        let job = GenerationJob::new(JobKind::SyllabusGeneration, serde_json::json!({}));
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
    }

    #[test]
    fn job_ids_sort_by_creation_order() {
        let a = JobId::new();
        let b = JobId::new();
        assert!(a <= b);
    }

    #[test]
    fn kind_round_trips_through_serde() {
        let json = serde_json::to_string(&JobKind::SyllabusGeneration).unwrap();
        assert_eq!(json, "\"syllabus-generation\"");
        let back: JobKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, JobKind::SyllabusGeneration);
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Active.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }
}
