//! Context fusion: deterministic assembly of retrieved fragments and
//! recent conversation turns into one bounded context block
//!
//! `fuse` is a pure function of its inputs: no randomness, no session
//! mutation, byte-identical output for identical inputs.

use serde::{Deserialize, Serialize};

use crate::config::FusionConfig;
use crate::types::{ConversationTurn, Fragment, Role};

/// Ephemeral, request-scoped fusion result. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedContext {
    /// All retrieved fragments in descending similarity order; the prompt
    /// body uses only the top few, the validator sees them all
    pub fragments: Vec<Fragment>,
    /// The paired history excerpt actually included in the context
    pub history: Vec<ConversationTurn>,
    /// Rendered context block: document section first, conversation
    /// section only when at least one valid exchange pair exists
    pub text: String,
}

impl FusedContext {
    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }
}

/// Fuses fragments and history under the configured window and preview
/// bounds
pub struct ContextFusion {
    config: FusionConfig,
}

impl ContextFusion {
    pub fn new(config: FusionConfig) -> Self {
        Self { config }
    }

    /// Merge retrieved fragments and recent history into one bounded
    /// context payload
    pub fn fuse(&self, fragments: &[Fragment], history: &[ConversationTurn]) -> FusedContext {
        let mut ordered: Vec<Fragment> = fragments.to_vec();
        // Stable sort: equal scores keep the retrieval order
        ordered.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let pairs = self.exchange_pairs(history);

        let mut text = self.render_document_section(&ordered);
        if !pairs.is_empty() {
            text.push_str(&self.render_conversation_section(&pairs));
        }

        let included: Vec<ConversationTurn> = pairs
            .into_iter()
            .flat_map(|(q, a)| [q, a])
            .collect();

        FusedContext {
            fragments: ordered,
            history: included,
            text,
        }
    }

    /// Last `history_window` turns, paired positionally as
    /// (user, assistant) exchanges. Pairs whose roles misalign and
    /// unpaired trailing turns are dropped from the context only; the
    /// session itself is untouched.
    fn exchange_pairs(
        &self,
        history: &[ConversationTurn],
    ) -> Vec<(ConversationTurn, ConversationTurn)> {
        let start = history.len().saturating_sub(self.config.history_window);
        let recent = &history[start..];

        let mut pairs = Vec::new();
        let mut i = 0;
        while i + 1 < recent.len() {
            let (first, second) = (&recent[i], &recent[i + 1]);
            if first.role == Role::User && second.role == Role::Assistant {
                pairs.push((first.clone(), second.clone()));
            }
            i += 2;
        }
        pairs
    }

    fn render_document_section(&self, fragments: &[Fragment]) -> String {
        let entries: Vec<String> = fragments
            .iter()
            .take(self.config.max_prompt_fragments)
            .map(|fragment| {
                format!(
                    "Document: {}\nSummary: {}\nContent: {}...",
                    fragment.metadata.title,
                    fragment.metadata.summary,
                    preview(&fragment.text, self.config.fragment_preview_chars)
                )
            })
            .collect();

        format!("Relevant Documents:\n{}", entries.join("\n\n"))
    }

    fn render_conversation_section(
        &self,
        pairs: &[(ConversationTurn, ConversationTurn)],
    ) -> String {
        let exchanges: Vec<String> = pairs
            .iter()
            .map(|(question, answer)| {
                format!(
                    "Previous Q: {}\nPrevious A: {}...",
                    question.content,
                    preview(&answer.content, self.config.answer_preview_chars)
                )
            })
            .collect();

        format!("\n\nConversation History:\n{}", exchanges.join("\n\n"))
    }
}

/// First `max_chars` characters, on a char boundary
fn preview(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
