//! Syllabus generation handler

use super::{optional_str, required_str};
use crate::error::GenerationError;
use async_trait::async_trait;
use lcg_index::FilterSet;
use lcg_jobs::{JobContext, JobErrorDetail, JobHandler, JobKind};
use lcg_rag::RagEngine;
use std::sync::Arc;

/// Generates a complete syllabus document scoped to subject, class, and
/// board, grounded in whatever curriculum passages are indexed for that
/// scope.
pub struct SyllabusHandler {
    rag: Arc<RagEngine>,
}

impl SyllabusHandler {
    /// Create a handler over the shared RAG engine
    #[inline]
    #[must_use]
    pub fn new(rag: Arc<RagEngine>) -> Self {
        Self { rag }
    }
}

#[async_trait]
impl JobHandler for SyllabusHandler {
    fn kind(&self) -> JobKind {
        JobKind::SyllabusGeneration
    }

    fn validate(&self, payload: &serde_json::Value) -> Result<(), String> {
        required_str(payload, "subject")?;
        required_str(payload, "class")?;
        required_str(payload, "board")?;
        Ok(())
    }

    async fn execute(&self, ctx: JobContext) -> Result<serde_json::Value, JobErrorDetail> {
        let payload = ctx.payload();
        let subject = required_str(payload, "subject")
            .map_err(|e| GenerationError::Validation(e).to_detail())?;
        let class = required_str(payload, "class")
            .map_err(|e| GenerationError::Validation(e).to_detail())?;
        let board = required_str(payload, "board")
            .map_err(|e| GenerationError::Validation(e).to_detail())?;

        ctx.report_progress(25).await;

        let mut filters = FilterSet::new()
            .with_subject(subject)
            .with_class_level(class)
            .with_board(board);
        if let Some(teacher) = optional_str(payload, "teacher_id") {
            filters = filters.with_teacher(teacher);
        }

        let query = format!(
            "Generate a complete, unit-structured syllabus for {subject}, class {class}, {board} board."
        );

        let answer = self
            .rag
            .query(&query, &filters, &[], ctx.cancel_token())
            .await
            .map_err(|e| GenerationError::from(e).to_detail())?;

        ctx.report_progress(75).await;

        Ok(serde_json::json!({
            "document": answer.text,
            "model": answer.model,
            "passages_used": answer.passages.len(),
            "cached": answer.cached,
        }))
    }
}
