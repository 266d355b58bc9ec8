//! ragline - Retrieval-Augmented Answering Core
//!
//! Given a natural-language query, ragline retrieves semantically relevant
//! document fragments, fuses them with prior conversation turns into a
//! single bounded context, produces an answer through an external language
//! model, and scores that answer's trustworthiness before returning it.
//!
//! # Architecture
//!
//! - **Retrieval**: query embedding + top-K similarity search with a
//!   degraded keyword fallback
//! - **Session**: TTL-bounded, concurrency-safe conversation memory
//! - **Fusion**: deterministic assembly of fragments and history
//! - **Validation**: grounding, factual consistency, and quality verdicts
//! - **Feedback**: append-only quality statistics
//!
//! The HTTP surface, ingestion pipeline, and concrete embedding/completion
//! vendors are external collaborators behind the traits in [`providers`],
//! [`retrieval`], and [`session`].

pub mod config;
pub mod errors;
pub mod types;

pub mod providers;

pub mod feedback;
pub mod fusion;
pub mod pipeline;
pub mod retrieval;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use config::RagConfig;
pub use errors::{RagError, Result};
pub use pipeline::{AnswerOutcome, AnswerPipeline};
pub use types::{ConversationTurn, Fragment, Role, Session, SourceMetadata};
