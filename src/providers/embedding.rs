//! Embedding service contract and Ollama-backed client
//!
//! The service is deterministic for identical text + model version, which
//! keeps retrieval and grounding reproducible across a request.

use async_trait::async_trait;
use futures_util::future::join_all;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::errors::{RagError, Result};

/// Produces fixed-length numeric vectors for arbitrary text
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, concurrently
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        join_all(texts.iter().map(|text| self.embed(text)))
            .await
            .into_iter()
            .collect()
    }
}

/// Cosine similarity between two vectors; 0.0 for mismatched or zero-norm
/// inputs rather than NaN
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    embedding: Vec<f32>,
}

/// HTTP client for the Ollama embeddings endpoint
pub struct OllamaEmbeddingClient {
    client: Client,
    base_url: String,
    model: String,
}

impl OllamaEmbeddingClient {
    /// Create a new embedding client
    ///
    /// # Arguments
    /// * `base_url` - Base URL for the Ollama API (default: http://127.0.0.1:11434)
    /// * `model` - Embedding model tag, e.g. "nomic-embed-text"
    pub fn new(base_url: Option<String>, model: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.unwrap_or_else(|| "http://127.0.0.1:11434".to_string()),
            model: model.into(),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&json!({ "model": self.model, "prompt": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(RagError::EmbeddingError(format!(
                "Embedding API error: {}",
                response.status()
            )));
        }

        let body: EmbeddingsResponse = response.json().await?;

        if body.embedding.is_empty() {
            return Err(RagError::EmbeddingError(
                "Embedding API returned an empty vector".to_string(),
            ));
        }

        Ok(body.embedding)
    }
}
