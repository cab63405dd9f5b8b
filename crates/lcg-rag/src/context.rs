//! Retrieval context assembly and prompt building

use lcg_index::{FilterSet, ScoredPassage};
use serde::{Deserialize, Serialize};

/// Who produced a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior turn of conversation, appended to the prompt only.
/// History does not participate in retrieval or cache keying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

impl ConversationTurn {
    /// A user turn
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    /// An assistant turn
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Retrieved grounding for one query.
///
/// Passages are held in descending similarity order and capped at top-k
/// by the search itself; [`RetrievalContext::truncate_to_budget`] then
/// enforces the prompt character budget by dropping the lowest-similarity
/// passages first.
#[derive(Debug, Clone)]
pub struct RetrievalContext {
    pub query: String,
    pub filters: FilterSet,
    pub passages: Vec<ScoredPassage>,
}

impl RetrievalContext {
    /// Build a context from search results (already ordered by score)
    #[must_use]
    pub fn new(query: impl Into<String>, filters: FilterSet, passages: Vec<ScoredPassage>) -> Self {
        Self {
            query: query.into(),
            filters,
            passages,
        }
    }

    /// Whether retrieval produced no usable passages
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Enforce the prompt character budget.
    ///
    /// Passages are dropped from the tail - the lowest-similarity end -
    /// until the rendered context fits.
    pub fn truncate_to_budget(&mut self, char_budget: usize) {
        while !self.passages.is_empty() && self.rendered_len() > char_budget {
            let dropped = self.passages.pop();
            if let Some(passage) = dropped {
                tracing::debug!(
                    passage_id = %passage.id,
                    score = passage.score,
                    "dropping passage to fit context budget"
                );
            }
        }
    }

    fn rendered_len(&self) -> usize {
        self.passages.iter().map(|p| p.text.len() + 16).sum()
    }

    /// Render the passages as a context block for the prompt
    #[must_use]
    pub fn render(&self) -> String {
        let mut block = String::new();
        for (i, passage) in self.passages.iter().enumerate() {
            block.push_str(&format!("[{}] {}\n", i + 1, passage.text));
        }
        block
    }
}

/// Assemble the single prompt sent to the model: conversation history,
/// retrieved context, then the query.
#[must_use]
pub fn build_prompt(
    history: &[ConversationTurn],
    context: &RetrievalContext,
    query: &str,
) -> String {
    let mut prompt = String::new();

    if !history.is_empty() {
        prompt.push_str("Conversation so far:\n");
        for turn in history {
            let speaker = match turn.role {
                TurnRole::User => "User",
                TurnRole::Assistant => "Assistant",
            };
            prompt.push_str(&format!("{speaker}: {}\n", turn.content));
        }
        prompt.push('\n');
    }

    if context.is_empty() {
        prompt.push_str("No reference material was found for this request. Answer from general knowledge.\n\n");
    } else {
        prompt.push_str("Reference material:\n");
        prompt.push_str(&context.render());
        prompt.push('\n');
    }

    prompt.push_str(&format!("Request: {query}\n"));
    prompt
}
