//! The retrieval-augmented generation engine

use crate::context::{build_prompt, ConversationTurn, RetrievalContext};
use crate::error::RagError;
use lcg_cache::{CacheKey, CacheStore};
use lcg_index::{EmbeddingGenerator, FilterSet, ScoredPassage, VectorIndex};
use lcg_llm::{CancelToken, LlmClient, LlmConfig};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Engine tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Passages requested from the index
    pub top_k: usize,
    /// Character budget for the rendered context block
    pub context_char_budget: usize,
    /// Passages scoring below this are discarded before assembly
    pub min_score: Option<f32>,
    /// TTL for cached answers
    pub cache_ttl: Duration,
}

impl RagConfig {
    /// With a different top-k
    #[inline]
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// With a different cache TTL
    #[inline]
    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            context_char_budget: 4000,
            min_score: Some(0.3),
            cache_ttl: Duration::from_secs(3600),
        }
    }
}

/// A grounded answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedAnswer {
    /// Generated text
    pub text: String,
    /// Model that produced it
    pub model: String,
    /// Passages that grounded the generation, descending similarity
    pub passages: Vec<ScoredPassage>,
    /// Whether this answer was served from cache
    #[serde(default)]
    pub cached: bool,
}

/// Cache-first retrieval-augmented generator.
///
/// The pipeline is a sequence of explicit stages with a cancellation
/// check between each: cache lookup, query embedding, filtered search,
/// context assembly, model call, cache write. Cancellation aborts
/// before the next blocking call; it never interrupts one in flight.
pub struct RagEngine {
    cache: Arc<dyn CacheStore>,
    embedder: Arc<dyn EmbeddingGenerator>,
    index: Arc<dyn VectorIndex>,
    llm: Arc<dyn LlmClient>,
    llm_config: LlmConfig,
    config: RagConfig,
}

impl RagEngine {
    /// Assemble an engine from its collaborators
    #[must_use]
    pub fn new(
        cache: Arc<dyn CacheStore>,
        embedder: Arc<dyn EmbeddingGenerator>,
        index: Arc<dyn VectorIndex>,
        llm: Arc<dyn LlmClient>,
        llm_config: LlmConfig,
        config: RagConfig,
    ) -> Self {
        Self {
            cache,
            embedder,
            index,
            llm,
            llm_config,
            config,
        }
    }

    /// Answer a query grounded in retrieved passages.
    ///
    /// On a cache hit the answer is returned immediately: no vector
    /// search, no model call. On a miss the full pipeline runs and the
    /// answer is cached with the configured TTL. Failures are never
    /// cached.
    ///
    /// # Errors
    /// `RagError::Cancelled` if the token was triggered between stages;
    /// otherwise whichever boundary failed.
    pub async fn query(
        &self,
        query: &str,
        filters: &FilterSet,
        history: &[ConversationTurn],
        cancel: &CancelToken,
    ) -> Result<GeneratedAnswer, RagError> {
        let key = CacheKey::derive(query, filters.predicate_pairs(), &self.llm_config.model);

        checkpoint(cancel)?;
        if let Some(serialized) = self.cache.get(&key).await? {
            tracing::debug!(key = %key, "cache hit");
            let mut answer: GeneratedAnswer = serde_json::from_str(&serialized)?;
            answer.cached = true;
            return Ok(answer);
        }

        checkpoint(cancel)?;
        let query_vector = self.embedder.embed(query).await?;

        checkpoint(cancel)?;
        let mut passages = self
            .index
            .search(&query_vector, filters, self.config.top_k)
            .await?;
        if let Some(min_score) = self.config.min_score {
            passages.retain(|p| p.score >= min_score);
        }

        let mut context = RetrievalContext::new(query, filters.clone(), passages);
        context.truncate_to_budget(self.config.context_char_budget);
        if context.is_empty() {
            // Documented fallback: the model may answer from general
            // knowledge when nothing passes the filters.
            tracing::debug!(%query, "no passages passed filters, using empty context");
        }

        checkpoint(cancel)?;
        let prompt = build_prompt(history, &context, query);
        let request = self.llm_config.request(prompt);
        let response = self.llm.generate(request).await?;

        let answer = GeneratedAnswer {
            text: response.text,
            model: response.model,
            passages: context.passages,
            cached: false,
        };

        checkpoint(cancel)?;
        match serde_json::to_string(&answer) {
            Ok(serialized) => {
                if let Err(err) = self
                    .cache
                    .set(key, serialized, self.config.cache_ttl)
                    .await
                {
                    tracing::warn!(error = %err, "failed to cache answer");
                }
            }
            Err(err) => tracing::warn!(error = %err, "failed to serialize answer for cache"),
        }

        Ok(answer)
    }
}

fn checkpoint(cancel: &CancelToken) -> Result<(), RagError> {
    if cancel.is_cancelled() {
        Err(RagError::Cancelled)
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcg_cache::MokaCacheStore;
    use lcg_index::{InMemoryVectorIndex, PassageMetadata};
    use lcg_llm::LlmError;
    use lcg_test_utils::{FixedEmbedder, MockLlmClient};
    use uuid::Uuid;

    const DIM: usize = 8;

    struct Fixture {
        engine: RagEngine,
        llm: Arc<MockLlmClient>,
        index: Arc<InMemoryVectorIndex>,
    }

    fn fixture(llm: MockLlmClient, config: RagConfig) -> Fixture {
        let llm = Arc::new(llm);
        let index = Arc::new(InMemoryVectorIndex::new(DIM));
        let engine = RagEngine::new(
            Arc::new(MokaCacheStore::new(100)),
            Arc::new(FixedEmbedder::new(DIM)),
            index.clone(),
            llm.clone(),
            LlmConfig::default(),
            config,
        );
        Fixture { engine, llm, index }
    }

    async fn seed_passage(fx: &Fixture, text: &str, subject: &str) {
        let embedder = FixedEmbedder::new(DIM);
        use lcg_index::EmbeddingGenerator as _;
        use lcg_index::VectorIndex as _;
        let vector = embedder.embed(text).await.unwrap();
        fx.index
            .upsert(
                Uuid::new_v4(),
                vector,
                text.to_string(),
                PassageMetadata {
                    subject: Some(subject.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn second_identical_query_makes_zero_llm_calls() {
        let fx = fixture(MockLlmClient::fixed("the answer"), RagConfig::default());
        seed_passage(&fx, "fractions are parts of a whole", "Math").await;

        let filters = FilterSet::new().with_subject("Math");
        let cancel = CancelToken::new();

        let first = fx
            .engine
            .query("fractions", &filters, &[], &cancel)
            .await
            .unwrap();
        assert!(!first.cached);
        assert_eq!(fx.llm.calls(), 1);

        let second = fx
            .engine
            .query("fractions", &filters, &[], &cancel)
            .await
            .unwrap();
        assert!(second.cached);
        assert_eq!(second.text, first.text);
        assert_eq!(fx.llm.calls(), 1);
    }

    #[tokio::test]
    async fn zero_matching_passages_still_calls_llm() {
        let fx = fixture(MockLlmClient::fixed("general knowledge answer"), RagConfig::default());
        seed_passage(&fx, "photosynthesis", "Science").await;

        // Filter matches nothing that was indexed
        let filters = FilterSet::new().with_subject("History");
        let answer = fx
            .engine
            .query("the mughal empire", &filters, &[], &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(answer.text, "general knowledge answer");
        assert!(answer.passages.is_empty());
        assert_eq!(fx.llm.calls(), 1);
        let prompt = fx.llm.last_prompt().unwrap();
        assert!(prompt.contains("general knowledge"));
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let fx = fixture(
            MockLlmClient::scripted(vec![
                Err(LlmError::Timeout { timeout_secs: 1 }),
                Ok("recovered".to_string()),
            ]),
            RagConfig::default(),
        );

        let filters = FilterSet::new();
        let cancel = CancelToken::new();

        let err = fx
            .engine
            .query("anything", &filters, &[], &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Llm(LlmError::Timeout { .. })));

        // The failure must not have been cached: the next call reaches
        // the model again and succeeds.
        let answer = fx
            .engine
            .query("anything", &filters, &[], &cancel)
            .await
            .unwrap();
        assert_eq!(answer.text, "recovered");
        assert!(!answer.cached);
        assert_eq!(fx.llm.calls(), 2);
    }

    #[tokio::test]
    async fn cancellation_aborts_before_the_model_call() {
        let fx = fixture(MockLlmClient::fixed("never produced"), RagConfig::default());

        let cancel = CancelToken::new();
        cancel.cancel();

        let err = fx
            .engine
            .query("query", &FilterSet::new(), &[], &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, RagError::Cancelled));
        assert_eq!(fx.llm.calls(), 0);
    }

    #[tokio::test]
    async fn retrieved_passages_appear_in_prompt_and_answer() {
        let config = RagConfig {
            min_score: None,
            ..RagConfig::default()
        };
        let fx = fixture(MockLlmClient::fixed("grounded"), config);
        seed_passage(&fx, "a fraction names part of a whole", "Math").await;

        let answer = fx
            .engine
            .query(
                "a fraction names part of a whole",
                &FilterSet::new().with_subject("Math"),
                &[],
                &CancelToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(answer.passages.len(), 1);
        let prompt = fx.llm.last_prompt().unwrap();
        assert!(prompt.contains("a fraction names part of a whole"));
    }

    #[tokio::test]
    async fn history_is_appended_to_the_prompt() {
        let fx = fixture(MockLlmClient::fixed("simpler answer"), RagConfig::default());

        let history = vec![ConversationTurn::user("explain it for an 8 year old")];
        fx.engine
            .query("fractions", &FilterSet::new(), &history, &CancelToken::new())
            .await
            .unwrap();

        let prompt = fx.llm.last_prompt().unwrap();
        assert!(prompt.contains("explain it for an 8 year old"));
    }
}
