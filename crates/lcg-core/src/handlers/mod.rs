//! Kind-specific generation handlers
//!
//! Each handler validates its payload shape at submission time, runs
//! the retrieval pipeline with progress checkpoints, and returns a JSON
//! result reference. Handlers run at-least-once; all of them tolerate
//! duplicate effects (regenerating a document or re-upserting an
//! embedding converges to the same state).

pub mod enhancement;
pub mod questions;
pub mod syllabus;

pub use enhancement::EnhancementHandler;
pub use questions::QuestionsBatchHandler;
pub use syllabus::SyllabusHandler;

/// Extract a required non-empty string field from a payload
pub(crate) fn required_str<'a>(
    payload: &'a serde_json::Value,
    field: &str,
) -> Result<&'a str, String> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| format!("missing or empty field: {field}"))
}

/// Extract an optional string field
pub(crate) fn optional_str<'a>(payload: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    payload
        .get(field)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}
