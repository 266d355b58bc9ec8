// End-to-end answering pipeline: retrieve -> fuse -> generate -> validate,
// with session memory updated after generation and outcomes recorded for
// longitudinal stats.
//
// Infrastructure failures degrade confidence signals; only a generator
// failure (or timeout) aborts the request, and no partial answer is ever
// synthesized.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::RagConfig;
use crate::errors::{RagError, Result};
use crate::feedback::FeedbackAggregator;
use crate::fusion::{ContextFusion, FusedContext};
use crate::providers::{EmbeddingProvider, LanguageModel};
use crate::retrieval::{VectorRetriever, VectorStore};
use crate::session::{SessionBackend, SessionStore};
use crate::types::{ConversationTurn, Fragment};
use crate::validation::{ResponseValidator, ValidationReport};

/// Successful pipeline result. Always carries its validation report so
/// callers can distinguish a fully-validated answer from a degraded one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerOutcome {
    pub session_id: String,
    pub answer: String,
    pub validation: ValidationReport,
    /// Fragments the answer was generated and validated against
    pub fragments: Vec<Fragment>,
    /// True when retrieval used the keyword fallback
    pub retrieval_degraded: bool,
}

/// The retrieval-and-context-fusion pipeline
pub struct AnswerPipeline {
    retriever: VectorRetriever,
    sessions: SessionStore,
    fusion: ContextFusion,
    llm: Arc<dyn LanguageModel>,
    validator: ResponseValidator,
    feedback: FeedbackAggregator,
    config: RagConfig,
}

impl AnswerPipeline {
    /// Assemble the pipeline from its collaborators. Validates the
    /// configuration once, up front.
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        session_backend: Arc<dyn SessionBackend>,
        llm: Arc<dyn LanguageModel>,
        config: RagConfig,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| RagError::ConfigError(e.to_string()))?;

        Ok(Self {
            retriever: VectorRetriever::new(
                embedder.clone(),
                vector_store,
                config.retrieval.clone(),
                config.timeouts.clone(),
            ),
            sessions: SessionStore::new(session_backend, config.session.clone()),
            fusion: ContextFusion::new(config.fusion.clone()),
            llm: llm.clone(),
            validator: ResponseValidator::new(
                embedder,
                llm,
                config.validation.clone(),
                config.timeouts.clone(),
            ),
            feedback: FeedbackAggregator::new(config.validation.approve_threshold),
            config,
        })
    }

    /// Answer one query. Each call is an independent unit of work;
    /// concurrent calls on the same session interleave with
    /// last-writer-appends semantics.
    pub async fn ask(&self, query: &str, session_id: Option<String>) -> Result<AnswerOutcome> {
        let session_id = session_id.unwrap_or_else(|| Uuid::new_v4().to_string());

        let history = self.sessions.read(&session_id).await;

        let retrieved = self
            .retriever
            .retrieve(query, self.config.retrieval.top_k)
            .await;

        let fused = self.fusion.fuse(&retrieved.fragments, &history);
        let prompt = self.build_prompt(query, &fused);

        let answer = self.generate(&prompt).await?;

        let validation = self.validator.validate(query, &answer, &retrieved).await;

        // Turns land in request-completion order; the session store only
        // guarantees no lost updates, not arrival ordering
        self.sessions
            .append(&session_id, ConversationTurn::user(query))
            .await;
        self.sessions
            .append(&session_id, ConversationTurn::assistant(answer.clone()))
            .await;

        self.feedback.record(&validation);

        Ok(AnswerOutcome {
            session_id,
            answer,
            validation,
            fragments: fused.fragments,
            retrieval_degraded: retrieved.degraded,
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let duration_ms = self.config.timeouts.generation_ms;
        tokio::time::timeout(
            Duration::from_millis(duration_ms),
            self.llm.generate(prompt),
        )
        .await
        .map_err(|_| {
            RagError::GenerationFailure(format!(
                "Answer generation timed out after {}ms",
                duration_ms
            ))
        })?
    }

    fn build_prompt(&self, query: &str, fused: &FusedContext) -> String {
        format!(
            "You are an expert assistant. Use the following context to answer the user's \
             question. Consider both the relevant documents and the conversation history to \
             provide a comprehensive answer.\n\n{}\n\nCurrent Question: {}\n\n\
             Answer in detail based on the provided context. If this question relates to \
             previous conversation, reference that context appropriately:",
            fused.text, query
        )
    }

    /// Session store handle, for observability surfaces
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Stats aggregator handle, for feedback submission and reporting
    pub fn feedback(&self) -> &FeedbackAggregator {
        &self.feedback
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }
}
