//! Content enhancement handler

use super::{optional_str, required_str};
use crate::error::GenerationError;
use async_trait::async_trait;
use lcg_index::{EmbeddingSynchronizer, EntityKind, FilterSet, PassageMetadata};
use lcg_jobs::{JobContext, JobErrorDetail, JobHandler, JobKind};
use lcg_rag::RagEngine;
use std::sync::Arc;
use uuid::Uuid;

/// Re-generates enriched text for an existing topic or question and
/// re-synchronizes the owning entity's embedding with the new content.
pub struct EnhancementHandler {
    rag: Arc<RagEngine>,
    sync: Arc<EmbeddingSynchronizer>,
}

impl EnhancementHandler {
    /// Create a handler over the shared RAG engine and synchronizer
    #[inline]
    #[must_use]
    pub fn new(rag: Arc<RagEngine>, sync: Arc<EmbeddingSynchronizer>) -> Self {
        Self { rag, sync }
    }
}

fn parse_entity_kind(value: &str) -> Result<EntityKind, String> {
    match value {
        "topic" => Ok(EntityKind::Topic),
        "question" => Ok(EntityKind::Question),
        other => Err(format!("unknown entity_type: {other}")),
    }
}

#[async_trait]
impl JobHandler for EnhancementHandler {
    fn kind(&self) -> JobKind {
        JobKind::ContentEnhancement
    }

    fn validate(&self, payload: &serde_json::Value) -> Result<(), String> {
        let entity_id = required_str(payload, "entity_id")?;
        Uuid::parse_str(entity_id).map_err(|_| "entity_id is not a valid uuid".to_string())?;
        parse_entity_kind(required_str(payload, "entity_type")?)?;
        required_str(payload, "text")?;
        Ok(())
    }

    async fn execute(&self, ctx: JobContext) -> Result<serde_json::Value, JobErrorDetail> {
        let payload = ctx.payload();
        let entity_id = required_str(payload, "entity_id")
            .and_then(|s| Uuid::parse_str(s).map_err(|_| "entity_id is not a valid uuid".into()))
            .map_err(|e| GenerationError::Validation(e).to_detail())?;
        let kind = required_str(payload, "entity_type")
            .and_then(parse_entity_kind)
            .map_err(|e| GenerationError::Validation(e).to_detail())?;
        let text = required_str(payload, "text")
            .map_err(|e| GenerationError::Validation(e).to_detail())?;

        ctx.report_progress(25).await;

        let mut filters = FilterSet::new();
        if let Some(subject) = optional_str(payload, "subject") {
            filters = filters.with_subject(subject);
        }

        let query = format!(
            "Rewrite and enrich the following educational content, keeping it \
             factually equivalent but clearer and more complete:\n\n{text}"
        );

        let answer = self
            .rag
            .query(&query, &filters, &[], ctx.cancel_token())
            .await
            .map_err(|e| GenerationError::from(e).to_detail())?;

        ctx.report_progress(50).await;
        if ctx.is_cancelled() {
            return Err(JobErrorDetail::cancelled());
        }

        let metadata = PassageMetadata {
            subject: optional_str(payload, "subject").map(str::to_string),
            class_level: optional_str(payload, "class").map(str::to_string),
            board: optional_str(payload, "board").map(str::to_string),
            teacher_id: None,
            topic_id: optional_str(payload, "topic_id").map(str::to_string),
        };

        let outcome = self
            .sync
            .sync(entity_id, kind, &answer.text, metadata)
            .await
            .map_err(|e| GenerationError::from(e).to_detail())?;

        ctx.report_progress(75).await;

        Ok(serde_json::json!({
            "enhanced": answer.text,
            "embedding_synced": outcome.is_synced(),
            "model": answer.model,
            "cached": answer.cached,
        }))
    }
}
