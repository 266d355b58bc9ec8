//! External collaborator contracts
//!
//! The embedding and language model services are opaque backends behind
//! async traits so tests can inject in-memory doubles.

pub mod embedding;
pub mod llm;

// Re-export key types
pub use embedding::{cosine_similarity, EmbeddingProvider, OllamaEmbeddingClient};
pub use llm::{ConsistencyVerdict, LanguageModel, OllamaCompletionClient};
