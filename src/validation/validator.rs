//! Response validator
//!
//! Scores a generated answer on three signals: grounding in the retrieved
//! fragments, factual consistency, and retrieval quality. If either
//! external check is unavailable the verdict is computed from retrieval
//! quality alone and capped at review.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{TimeoutConfig, ValidationConfig};
use crate::errors::{RagError, Result};
use crate::providers::{cosine_similarity, EmbeddingProvider, LanguageModel};
use crate::retrieval::RetrievedSet;
use crate::validation::types::{Recommendation, ValidationReport};

/// Split text into sentences on terminal punctuation, dropping empties
fn split_sentences(text: &str) -> Vec<String> {
    text.split(['.', '!', '?'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

struct GroundingOutcome {
    ratio: f64,
    grounded: usize,
    total: usize,
}

/// Validator over the embedding and language model collaborators
pub struct ResponseValidator {
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LanguageModel>,
    config: ValidationConfig,
    timeouts: TimeoutConfig,
}

impl ResponseValidator {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LanguageModel>,
        config: ValidationConfig,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            embedder,
            llm,
            config,
            timeouts,
        }
    }

    /// Score an answer against the fragments it was generated from.
    /// Never fails: check unavailability degrades the verdict instead.
    pub async fn validate(
        &self,
        query: &str,
        answer: &str,
        retrieved: &RetrievedSet,
    ) -> ValidationReport {
        let mut report = ValidationReport::empty(query);
        report.retrieval_quality = retrieved.mean_similarity();

        let grounding = self.check_grounding(answer, retrieved).await;
        let consistency = self.check_consistency(answer, retrieved).await;

        match (grounding, consistency) {
            (Ok(grounding), Ok(verdict)) => {
                report.grounding_score = grounding.ratio;
                report.grounded_sentences = grounding.grounded;
                report.total_sentences = grounding.total;
                report.is_grounded = grounding.ratio >= self.config.grounded_ratio;

                report.is_consistent = verdict.is_consistent;
                report.consistency_score = verdict.confidence;
                let consistency_score = if verdict.is_consistent {
                    verdict.confidence
                } else {
                    0.0
                };

                report.overall_score = self.config.grounding_weight * report.grounding_score
                    + self.config.consistency_weight * consistency_score
                    + self.config.retrieval_weight * report.retrieval_quality;
                report.recommendation = self.recommend(report.overall_score);
            }
            // Partial evidence: retrieval quality only, capped at review
            _ => {
                report.degraded = true;
                report.overall_score = report.retrieval_quality;
                report.recommendation = match self.recommend(report.overall_score) {
                    Recommendation::Approve => Recommendation::Review,
                    other => other,
                };
            }
        }

        report
    }

    /// Fraction of answer sentences whose best similarity against any
    /// fragment clears the grounding threshold
    async fn check_grounding(
        &self,
        answer: &str,
        retrieved: &RetrievedSet,
    ) -> Result<GroundingOutcome> {
        let sentences = split_sentences(answer);
        if sentences.is_empty() || retrieved.fragments.is_empty() {
            return Ok(GroundingOutcome {
                ratio: 0.0,
                grounded: 0,
                total: sentences.len(),
            });
        }

        let fragment_texts: Vec<String> = retrieved
            .fragments
            .iter()
            .map(|f| f.text.clone())
            .collect();

        let duration = Duration::from_millis(self.timeouts.validation_ms);
        let fragment_vectors = tokio::time::timeout(
            duration,
            self.embedder.embed_batch(&fragment_texts),
        )
        .await
        .map_err(|_| RagError::Timeout {
            duration_ms: self.timeouts.validation_ms,
        })??;

        let sentence_vectors =
            tokio::time::timeout(duration, self.embedder.embed_batch(&sentences))
                .await
                .map_err(|_| RagError::Timeout {
                    duration_ms: self.timeouts.validation_ms,
                })??;

        let grounded = sentence_vectors
            .iter()
            .filter(|sentence_vec| {
                let best = fragment_vectors
                    .iter()
                    .map(|fragment_vec| cosine_similarity(sentence_vec, fragment_vec))
                    .fold(0.0f64, f64::max);
                best >= self.config.grounding_threshold
            })
            .count();

        Ok(GroundingOutcome {
            ratio: grounded as f64 / sentences.len() as f64,
            grounded,
            total: sentences.len(),
        })
    }

    async fn check_consistency(
        &self,
        answer: &str,
        retrieved: &RetrievedSet,
    ) -> Result<crate::providers::ConsistencyVerdict> {
        tokio::time::timeout(
            Duration::from_millis(self.timeouts.validation_ms),
            self.llm.check_consistency(answer, &retrieved.fragments),
        )
        .await
        .map_err(|_| RagError::Timeout {
            duration_ms: self.timeouts.validation_ms,
        })?
    }

    fn recommend(&self, overall: f64) -> Recommendation {
        if overall >= self.config.approve_threshold {
            Recommendation::Approve
        } else if overall >= self.config.review_threshold {
            Recommendation::Review
        } else {
            Recommendation::Reject
        }
    }
}
