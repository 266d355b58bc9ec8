//! Language model service contract and Ollama-backed client
//!
//! Two operations cross this seam: answer generation over a fused prompt,
//! and the factual-consistency check used by the validator.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

use crate::errors::{RagError, Result};
use crate::types::Fragment;

/// Verdict from the consistency-checking collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsistencyVerdict {
    pub is_consistent: bool,
    /// Checker confidence in its own verdict (0.0 to 1.0)
    pub confidence: f64,
    /// Issues the checker flagged, if any
    #[serde(default)]
    pub issues: Vec<String>,
}

/// Natural-language answer generation plus factual consistency checking
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate answer text for a fully assembled prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check whether `answer` is factually consistent with `sources`
    async fn check_consistency(
        &self,
        answer: &str,
        sources: &[Fragment],
    ) -> Result<ConsistencyVerdict>;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// HTTP client for the Ollama completion endpoint
pub struct OllamaCompletionClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaCompletionClient {
    /// Create a new completion client
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the Ollama API (default: http://127.0.0.1:11434)
    /// * `model` - Completion model tag, e.g. "qwen2.5:7b-instruct"
    pub fn new(base_url: Option<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "http://127.0.0.1:11434".to_string()),
            model: model.into(),
        }
    }

    /// Build the fact-checking prompt over the top source fragments
    fn consistency_prompt(answer: &str, sources: &[Fragment]) -> String {
        let source_context = sources
            .iter()
            .take(3)
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        format!(
            "You are a fact-checking expert. Compare the given response with the source \
             documents and determine if the response is factually consistent.\n\n\
             SOURCE DOCUMENTS:\n{}\n\n\
             RESPONSE TO VALIDATE:\n{}\n\n\
             Analyze if the response contains any facts that contradict or are not supported \
             by the source documents.\n\n\
             Respond in JSON format:\n\
             {{\"is_consistent\": true/false, \"confidence\": 0.0-1.0, \
             \"issues\": [\"list\", \"of\", \"potential\", \"issues\"]}}",
            source_context, answer
        )
    }

    /// Extract the first JSON object from model output, tolerating prose
    /// around the verdict
    fn parse_verdict(raw: &str) -> Result<ConsistencyVerdict> {
        let start = raw.find('{');
        let end = raw.rfind('}');
        let json_slice = match (start, end) {
            (Some(s), Some(e)) if e > s => &raw[s..=e],
            _ => {
                return Err(RagError::ValidationPartial(
                    "Consistency checker returned no JSON verdict".to_string(),
                ))
            }
        };

        let verdict: ConsistencyVerdict = serde_json::from_str(json_slice)
            .map_err(|e| RagError::ValidationPartial(format!("Unparseable verdict: {}", e)))?;

        Ok(verdict)
    }
}

#[async_trait]
impl LanguageModel for OllamaCompletionClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
                "options": { "temperature": 0.2 }
            }))
            .send()
            .await
            .map_err(|e| RagError::GenerationFailure(format!("Failed to reach model: {}", e)))?;

        if !response.status().is_success() {
            return Err(RagError::GenerationFailure(format!(
                "Completion API error: {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| RagError::GenerationFailure(format!("Unparseable completion: {}", e)))?;

        Ok(body.response.trim().to_string())
    }

    async fn check_consistency(
        &self,
        answer: &str,
        sources: &[Fragment],
    ) -> Result<ConsistencyVerdict> {
        let prompt = Self::consistency_prompt(answer, sources);

        let raw = self
            .generate(&prompt)
            .await
            .map_err(|e| RagError::ValidationPartial(e.to_string()))?;

        Self::parse_verdict(&raw)
    }
}
