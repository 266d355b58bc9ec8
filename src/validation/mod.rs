// Response validation: grounding, factual consistency, and the combined
// quality verdict returned with every answer.

pub mod types;
pub mod validator;

// Re-export key types
pub use types::{Recommendation, ValidationReport};
pub use validator::ResponseValidator;
