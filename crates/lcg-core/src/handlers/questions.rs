//! Question batch generation handler

use super::{optional_str, required_str};
use crate::error::GenerationError;
use async_trait::async_trait;
use lcg_index::{EmbeddingSynchronizer, EntityKind, FilterSet, PassageMetadata};
use lcg_jobs::{JobContext, JobErrorDetail, JobHandler, JobKind};
use lcg_rag::RagEngine;
use std::sync::Arc;
use uuid::Uuid;

const MAX_BATCH: u64 = 50;

/// Generates a batch of questions for one topic and synchronizes an
/// embedding for each generated question so they become retrievable.
///
/// An embedding left pending does not fail the batch - the question is
/// delivered and the sync reconciled later.
pub struct QuestionsBatchHandler {
    rag: Arc<RagEngine>,
    sync: Arc<EmbeddingSynchronizer>,
}

impl QuestionsBatchHandler {
    /// Create a handler over the shared RAG engine and synchronizer
    #[inline]
    #[must_use]
    pub fn new(rag: Arc<RagEngine>, sync: Arc<EmbeddingSynchronizer>) -> Self {
        Self { rag, sync }
    }
}

/// Strip list numbering ("1.", "Q3:", "- ") from a generated line
fn clean_question_line(line: &str) -> &str {
    let line = line.trim();
    if let Some(rest) = line.strip_prefix('-') {
        return rest.trim_start();
    }
    let rest = line
        .strip_prefix(['Q', 'q'])
        .filter(|s| s.starts_with(|c: char| c.is_ascii_digit()))
        .unwrap_or(line);
    let no_digits = rest.trim_start_matches(|c: char| c.is_ascii_digit());
    if no_digits.len() != rest.len() {
        let stripped = no_digits.trim_start_matches(['.', ')', ':']).trim_start();
        if !stripped.is_empty() {
            return stripped;
        }
    }
    line
}

#[async_trait]
impl JobHandler for QuestionsBatchHandler {
    fn kind(&self) -> JobKind {
        JobKind::QuestionsBatch
    }

    fn validate(&self, payload: &serde_json::Value) -> Result<(), String> {
        required_str(payload, "topic_id")?;
        required_str(payload, "topic")?;
        let count = payload
            .get("count")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| "missing or non-numeric field: count".to_string())?;
        if count == 0 || count > MAX_BATCH {
            return Err(format!("count must be between 1 and {MAX_BATCH}"));
        }
        Ok(())
    }

    async fn execute(&self, ctx: JobContext) -> Result<serde_json::Value, JobErrorDetail> {
        let payload = ctx.payload();
        let topic_id = required_str(payload, "topic_id")
            .map_err(|e| GenerationError::Validation(e).to_detail())?;
        let topic = required_str(payload, "topic")
            .map_err(|e| GenerationError::Validation(e).to_detail())?;
        let count = payload
            .get("count")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(5);
        let difficulty = optional_str(payload, "difficulty").unwrap_or("mixed");

        ctx.report_progress(25).await;

        let filters = FilterSet::new().with_topic(topic_id);
        let query = format!(
            "Write {count} {difficulty}-difficulty exam questions about {topic}. \
             One question per line, no answers."
        );

        let answer = self
            .rag
            .query(&query, &filters, &[], ctx.cancel_token())
            .await
            .map_err(|e| GenerationError::from(e).to_detail())?;

        ctx.report_progress(50).await;

        let questions: Vec<String> = answer
            .text
            .lines()
            .map(clean_question_line)
            .filter(|line| !line.is_empty())
            .take(count as usize)
            .map(str::to_string)
            .collect();

        let metadata = PassageMetadata {
            topic_id: Some(topic_id.to_string()),
            subject: optional_str(payload, "subject").map(str::to_string),
            class_level: optional_str(payload, "class").map(str::to_string),
            board: optional_str(payload, "board").map(str::to_string),
            teacher_id: None,
        };

        let mut embeddings_pending = 0usize;
        for question in &questions {
            if ctx.is_cancelled() {
                return Err(JobErrorDetail::cancelled());
            }
            let outcome = self
                .sync
                .sync(Uuid::new_v4(), EntityKind::Question, question, metadata.clone())
                .await
                .map_err(|e| GenerationError::from(e).to_detail())?;
            if !outcome.is_synced() {
                embeddings_pending += 1;
            }
        }

        ctx.report_progress(75).await;

        Ok(serde_json::json!({
            "questions": questions,
            "embeddings_pending": embeddings_pending,
            "model": answer.model,
            "cached": answer.cached,
        }))
    }
}
