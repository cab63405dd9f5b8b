//! Job status state machine
//!
//! Status transitions are monotonic through
//! `queued -> active -> {completed | failed}`; terminal states absorb.
//! The one sanctioned exception is crash recovery: the store's
//! lease-expiry requeue moves `active` back to `queued` outside this
//! validation, which is why handlers must tolerate at-least-once
//! execution.

use crate::types::JobStatus;

/// Error for a transition outside the lifecycle protocol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("illegal job transition: {from} -> {to}")]
pub struct IllegalTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// States reachable from `from` in the normal lifecycle
#[must_use]
pub fn allowed_transitions(from: JobStatus) -> Vec<JobStatus> {
    use JobStatus::*;
    match from {
        // Failed covers cancellation before dispatch
        Queued => vec![Active, Failed],
        Active => vec![Completed, Failed],
        Completed => vec![],
        Failed => vec![],
    }
}

/// Validates a status transition
pub fn validate_transition(from: JobStatus, to: JobStatus) -> Result<(), IllegalTransition> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(IllegalTransition { from, to })
    }
}
