//! Feedback and stats aggregation
//!
//! Append-only accumulation of validation outcomes and optional user
//! ratings; `stats()` is a pure read-side fold over the recorded entries.
//! No entry is ever mutated after creation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::validation::{Recommendation, ValidationReport};

/// User-submitted feedback tied to an earlier validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub validation_id: String,
    pub query: String,
    pub answer: String,
    /// Star rating, 1 to 5
    pub rating: Option<u8>,
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl FeedbackRecord {
    pub fn new(
        validation_id: impl Into<String>,
        query: impl Into<String>,
        answer: impl Into<String>,
    ) -> Self {
        Self {
            validation_id: validation_id.into(),
            query: query.into(),
            answer: answer.into(),
            rating: None,
            comment: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating.clamp(1, 5));
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Aggregate quality statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityStats {
    pub total_validations: usize,
    /// Fraction of validations at or above the high-quality bar
    pub high_quality_rate: f64,
    pub average_score: f64,
    pub average_user_rating: Option<f64>,
    pub approved: usize,
    pub needs_review: usize,
    pub rejected: usize,
}

/// Retained slice of a validation outcome; full reports are not kept
#[derive(Debug, Clone)]
struct ValidationEntry {
    overall_score: f64,
    recommendation: Recommendation,
}

#[derive(Default)]
struct AggregatorInner {
    validations: Vec<ValidationEntry>,
    feedback: Vec<FeedbackRecord>,
}

/// Longitudinal quality monitor shared across requests
#[derive(Clone, Default)]
pub struct FeedbackAggregator {
    inner: Arc<Mutex<AggregatorInner>>,
    high_quality_threshold: f64,
}

impl FeedbackAggregator {
    pub fn new(high_quality_threshold: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AggregatorInner::default())),
            high_quality_threshold,
        }
    }

    /// Record a validation outcome
    pub fn record(&self, report: &ValidationReport) {
        let mut inner = self.inner.lock().unwrap();
        inner.validations.push(ValidationEntry {
            overall_score: report.overall_score,
            recommendation: report.recommendation,
        });
    }

    /// Record explicit user feedback
    pub fn record_feedback(&self, record: FeedbackRecord) {
        let mut inner = self.inner.lock().unwrap();
        inner.feedback.push(record);
    }

    /// Aggregate statistics over everything recorded so far
    pub fn stats(&self) -> QualityStats {
        let inner = self.inner.lock().unwrap();

        let total = inner.validations.len();
        let mut stats = QualityStats {
            total_validations: total,
            ..Default::default()
        };

        if total > 0 {
            let score_sum: f64 = inner.validations.iter().map(|v| v.overall_score).sum();
            stats.average_score = score_sum / total as f64;

            let high = inner
                .validations
                .iter()
                .filter(|v| v.overall_score >= self.high_quality_threshold)
                .count();
            stats.high_quality_rate = high as f64 / total as f64;

            for entry in &inner.validations {
                match entry.recommendation {
                    Recommendation::Approve => stats.approved += 1,
                    Recommendation::Review => stats.needs_review += 1,
                    Recommendation::Reject => stats.rejected += 1,
                }
            }
        }

        let ratings: Vec<f64> = inner
            .feedback
            .iter()
            .filter_map(|f| f.rating.map(|r| r as f64))
            .collect();
        if !ratings.is_empty() {
            stats.average_user_rating =
                Some(ratings.iter().sum::<f64>() / ratings.len() as f64);
        }

        stats
    }
}
