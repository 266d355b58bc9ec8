//! Validation result type definitions

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Disposition for a validated answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
    /// Overall quality at or above the approve threshold
    Approve,
    /// Needs human review; also the ceiling for degraded validations
    Review,
    /// Overall quality below the review threshold
    Reject,
}

/// Quality verdict for one generated answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Identifier for correlating later user feedback
    pub id: String,

    /// Query the answer responded to
    pub query: String,

    /// Fraction of answer sentences grounded in the fragments (0.0 to 1.0)
    pub grounding_score: f64,

    /// Whether enough of the answer is grounded
    pub is_grounded: bool,

    /// Consistency checker confidence (0.0 to 1.0)
    pub consistency_score: f64,

    /// Consistency checker verdict
    pub is_consistent: bool,

    /// Mean similarity of the fragments used
    pub retrieval_quality: f64,

    /// Weighted combination of the three signals
    pub overall_score: f64,

    pub recommendation: Recommendation,

    /// True when a check could not run and the verdict was capped; the
    /// system never silently claims full validation on partial evidence
    pub degraded: bool,

    /// Grounding detail
    pub grounded_sentences: usize,
    pub total_sentences: usize,
}

impl ValidationReport {
    /// Fresh report with a unique id; scores start zeroed
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            grounding_score: 0.0,
            is_grounded: false,
            consistency_score: 0.0,
            is_consistent: false,
            retrieval_quality: 0.0,
            overall_score: 0.0,
            recommendation: Recommendation::Reject,
            degraded: false,
            grounded_sentences: 0,
            total_sentences: 0,
        }
    }
}
