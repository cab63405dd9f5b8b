//! Testing utilities for the LCG workspace
//!
//! Shared mocks and fixtures: a scriptable LLM client and a
//! deterministic embedder.

#![allow(missing_docs)]

use async_trait::async_trait;
use lcg_index::{EmbeddingGenerator, EmbeddingVector, IndexError, PassageMetadata};
use lcg_llm::{GenerationRequest, GenerationResponse, LlmClient, LlmError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// LLM client that replays scripted outcomes and records prompts.
///
/// Once the script is exhausted, every further call returns the default
/// text, so `fixed(...)` behaves as an always-succeeding model.
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    default_text: String,
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    /// Always respond with `text`
    pub fn fixed(text: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default_text: text.into(),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replay `script` in order, then fall back to a fixed response
    pub fn scripted(script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            default_text: "scripted default".to_string(),
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of generate calls observed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompt of the most recent call
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }

    /// All prompts observed, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(request.prompt.clone());

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.default_text.clone()));

        next.map(|text| GenerationResponse {
            text,
            model: request.model,
            duration: Duration::from_millis(1),
        })
    }
}

/// Deterministic embedder: equal text always maps to the same vector.
///
/// Bytes are folded into the dimension buckets, which is enough for
/// self-similarity (identical text scores 1.0) without any model.
pub struct FixedEmbedder {
    dimension: usize,
}

impl FixedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

#[async_trait]
impl EmbeddingGenerator for FixedEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, IndexError> {
        let mut values = vec![0.0f32; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            values[i % self.dimension] += f32::from(byte) / 255.0;
        }
        if values.iter().all(|v| *v == 0.0) {
            values[0] = 1.0;
        }
        Ok(EmbeddingVector::new(values))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Metadata scoped the way the generation handlers scope syllabus content
pub fn sample_metadata(subject: &str, class_level: &str, board: &str) -> PassageMetadata {
    PassageMetadata {
        subject: Some(subject.to_string()),
        class_level: Some(class_level.to_string()),
        board: Some(board.to_string()),
        teacher_id: None,
        topic_id: None,
    }
}
