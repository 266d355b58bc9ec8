//! Error types for the ragline answering core
//!
//! Infrastructure failures (retrieval, session backend, validation) are
//! absorbed and degrade confidence signals instead of aborting a request.
//! Only a generation failure is fatal to its request.

use thiserror::Error;

/// Main error type for the answering pipeline
#[derive(Error, Debug)]
pub enum RagError {
    /// Embedding service or vector store unreachable; recovered via the
    /// keyword fallback and never surfaced as a request failure
    #[error("Retrieval backend unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Session backing store unreachable; recovered via the in-process store
    #[error("Session backend unavailable: {0}")]
    SessionBackendUnavailable(String),

    /// A validation check could not run; recovered by capping the verdict
    #[error("Validation incomplete: {0}")]
    ValidationPartial(String),

    /// The answer generator failed; fatal, no content is fabricated
    #[error("Answer generation failed: {0}")]
    GenerationFailure(String),

    /// Embedding call returned an unusable vector
    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timeout errors
    #[error("Operation timed out after {duration_ms}ms")]
    Timeout { duration_ms: u64 },
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, RagError>;

/// Convert anyhow errors from infrastructure adapters
impl From<anyhow::Error> for RagError {
    fn from(err: anyhow::Error) -> Self {
        RagError::RetrievalUnavailable(err.to_string())
    }
}

impl RagError {
    /// Whether this error aborts the owning request. Everything except a
    /// generator failure is absorbed into a degraded result.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            RagError::GenerationFailure(_) | RagError::ConfigError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RagError::Timeout { duration_ms: 1500 };
        assert!(err.to_string().contains("1500"));
    }

    #[test]
    fn test_generation_failure_is_fatal() {
        let err = RagError::GenerationFailure("model offline".to_string());
        assert!(err.is_fatal());
        assert!(err.to_string().contains("model offline"));
    }

    #[test]
    fn test_infrastructure_errors_are_absorbed() {
        assert!(!RagError::RetrievalUnavailable("down".to_string()).is_fatal());
        assert!(!RagError::SessionBackendUnavailable("down".to_string()).is_fatal());
        assert!(!RagError::ValidationPartial("no embedder".to_string()).is_fatal());
    }
}
