//! Integration tests for the answering pipeline
//!
//! Runs the full retrieve -> fuse -> generate -> validate flow against
//! in-memory collaborator doubles, without any live backend.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use quickcheck_macros::quickcheck;

use ragline::errors::{RagError, Result};
use ragline::providers::{ConsistencyVerdict, EmbeddingProvider, LanguageModel};
use ragline::retrieval::VectorStore;
use ragline::session::MemoryBackend;
use ragline::types::{ConversationTurn, Fragment, Session, SourceMetadata};
use ragline::validation::Recommendation;
use ragline::{AnswerPipeline, RagConfig};

fn resume_fragment(id: &str, text: &str, similarity: f32) -> Fragment {
    Fragment {
        id: id.to_string(),
        source_doc_id: "resume-1".to_string(),
        text: text.to_string(),
        start_offset: 0,
        end_offset: text.len(),
        similarity,
        metadata: SourceMetadata {
            title: "resume.pdf".to_string(),
            path: "uploads/resume.pdf".to_string(),
            summary: "Candidate profile and work history".to_string(),
        },
    }
}

fn resume_fragments() -> Vec<Fragment> {
    vec![
        resume_fragment("c1", "Masters degree in computer science from MIT", 0.90),
        resume_fragment("c2", "Bachelors degree in mathematics", 0.85),
        resume_fragment("c3", "Worked five years as a systems engineer", 0.80),
    ]
}

/// Letter-histogram embedder: identical text embeds identically
struct HistogramEmbedder;

#[async_trait]
impl EmbeddingProvider for HistogramEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vec = vec![0.0f32; 26];
        for c in text.to_lowercase().chars() {
            if c.is_ascii_lowercase() {
                vec[(c as u8 - b'a') as usize] += 1.0;
            }
        }
        Ok(vec)
    }
}

/// Vector store double serving canned fragments, or failing outright
struct CannedStore {
    fragments: Vec<Fragment>,
    down: bool,
}

#[async_trait]
impl VectorStore for CannedStore {
    async fn similarity_search(
        &self,
        _vector: &[f32],
        top_k: usize,
    ) -> anyhow::Result<Vec<Fragment>> {
        if self.down {
            anyhow::bail!("vector store unreachable");
        }
        Ok(self.fragments.iter().take(top_k).cloned().collect())
    }

    async fn text_search(&self, _query: &str, limit: usize) -> anyhow::Result<Vec<Fragment>> {
        if self.down {
            anyhow::bail!("vector store unreachable");
        }
        Ok(self.fragments.iter().take(limit).cloned().collect())
    }
}

/// Language model double: fixed answer, recorded prompts, always-consistent
/// verdicts
struct ScriptedModel {
    answer: std::result::Result<String, String>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn answering(answer: &str) -> Self {
        Self {
            answer: Ok(answer.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            answer: Err(message.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match &self.answer {
            Ok(answer) => Ok(answer.clone()),
            Err(message) => Err(RagError::GenerationFailure(message.clone())),
        }
    }

    async fn check_consistency(
        &self,
        _answer: &str,
        _sources: &[Fragment],
    ) -> Result<ConsistencyVerdict> {
        Ok(ConsistencyVerdict {
            is_consistent: true,
            confidence: 0.95,
            issues: vec![],
        })
    }
}

fn pipeline_with(model: Arc<ScriptedModel>, store: CannedStore) -> AnswerPipeline {
    AnswerPipeline::new(
        Arc::new(HistogramEmbedder),
        Arc::new(store),
        Arc::new(MemoryBackend::new()),
        model,
        RagConfig::default(),
    )
    .unwrap()
}

#[tokio::test]
async fn test_first_query_without_session() {
    let model = Arc::new(ScriptedModel::answering(
        "Masters degree in computer science from MIT.",
    ));
    let pipeline = pipeline_with(
        model.clone(),
        CannedStore {
            fragments: resume_fragments(),
            down: false,
        },
    );

    let outcome = pipeline
        .ask("What is the education background?", None)
        .await
        .unwrap();

    // A fresh session id was minted
    assert!(!outcome.session_id.is_empty());
    assert!(!outcome.retrieval_degraded);
    assert_eq!(outcome.fragments.len(), 3);

    // Document-only context: no prior exchanges existed
    let prompt = model.last_prompt().unwrap();
    assert!(prompt.contains("Relevant Documents:"));
    assert!(prompt.contains("Document: resume.pdf"));
    assert!(!prompt.contains("Conversation History:"));
    assert!(prompt.contains("Current Question: What is the education background?"));

    // Verbatim answer validates cleanly
    assert!(outcome.validation.is_grounded);
    assert_eq!(outcome.validation.recommendation, Recommendation::Approve);
    assert!(!outcome.validation.degraded);

    // Session now holds the (user, assistant) exchange
    let turns = pipeline.sessions().read(&outcome.session_id).await;
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].content, "What is the education background?");
    assert_eq!(turns[1].content, outcome.answer);
}

#[tokio::test]
async fn test_follow_up_query_carries_history() {
    let model = Arc::new(ScriptedModel::answering(
        "Worked five years as a systems engineer.",
    ));
    let pipeline = pipeline_with(
        model.clone(),
        CannedStore {
            fragments: resume_fragments(),
            down: false,
        },
    );

    let first = pipeline
        .ask("What is the education background?", None)
        .await
        .unwrap();

    let second = pipeline
        .ask("What about work experience?", Some(first.session_id.clone()))
        .await
        .unwrap();

    assert_eq!(second.session_id, first.session_id);

    // The prior exchange shows up in the conversation section
    let prompt = model.last_prompt().unwrap();
    assert!(prompt.contains("Conversation History:"));
    assert!(prompt.contains("Previous Q: What is the education background?"));
    assert!(prompt.contains("Relevant Documents:"));

    let turns = pipeline.sessions().read(&first.session_id).await;
    assert_eq!(turns.len(), 4);
}

#[tokio::test]
async fn test_store_outage_degrades_but_still_answers() {
    let model = Arc::new(ScriptedModel::answering("I could not find any sources."));
    let pipeline = pipeline_with(
        model.clone(),
        CannedStore {
            fragments: vec![],
            down: true,
        },
    );

    let outcome = pipeline.ask("anything at all?", None).await.unwrap();

    assert!(outcome.retrieval_degraded);
    assert!(outcome.fragments.is_empty());
    // Zero retrieval quality can never approve
    assert_eq!(outcome.validation.retrieval_quality, 0.0);
    assert_eq!(outcome.validation.recommendation, Recommendation::Reject);
}

#[tokio::test]
async fn test_generation_failure_is_fatal_and_appends_nothing() {
    let model = Arc::new(ScriptedModel::failing("model offline"));
    let pipeline = pipeline_with(
        model,
        CannedStore {
            fragments: resume_fragments(),
            down: false,
        },
    );

    let result = pipeline.ask("question", Some("s1".to_string())).await;
    assert!(matches!(result, Err(RagError::GenerationFailure(_))));

    // No partial turn was written
    assert!(pipeline.sessions().read("s1").await.is_empty());
    assert_eq!(pipeline.feedback().stats().total_validations, 0);
}

#[tokio::test]
async fn test_outcomes_feed_quality_stats() {
    let model = Arc::new(ScriptedModel::answering(
        "Masters degree in computer science from MIT.",
    ));
    let pipeline = pipeline_with(
        model,
        CannedStore {
            fragments: resume_fragments(),
            down: false,
        },
    );

    pipeline.ask("education?", None).await.unwrap();
    pipeline.ask("education again?", None).await.unwrap();

    let stats = pipeline.feedback().stats();
    assert_eq!(stats.total_validations, 2);
    assert_eq!(stats.approved, 2);
    assert!(stats.average_score >= 0.7);
}

#[tokio::test]
async fn test_concurrent_queries_share_a_session_safely() {
    let model = Arc::new(ScriptedModel::answering("An answer."));
    let pipeline = Arc::new(pipeline_with(
        model,
        CannedStore {
            fragments: resume_fragments(),
            down: false,
        },
    ));

    let mut handles = Vec::new();
    for i in 0..4 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            pipeline
                .ask(&format!("question {}", i), Some("shared".to_string()))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    // No lost updates: every request contributed both of its turns
    let turns = pipeline.sessions().read("shared").await;
    assert_eq!(turns.len(), 8);
}

#[quickcheck]
fn prop_session_turn_bound_keeps_most_recent(contents: Vec<String>) -> bool {
    let max_turns = 5;
    let mut session = Session::new("prop", 3600);
    for content in &contents {
        session.push_turn(ConversationTurn::user(content.clone()), max_turns);
    }

    let expected: Vec<&String> = contents.iter().rev().take(max_turns).rev().collect();
    let actual: Vec<&String> = session.turns().iter().map(|t| &t.content).collect();

    session.turn_count() <= max_turns && actual == expected
}
