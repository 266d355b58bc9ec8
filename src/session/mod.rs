// Session-scoped conversation memory
//
// Components:
// - Session Backend: KV contract with per-key TTL semantics
// - Memory Backend: in-process fallback with identical semantics
// - Session Store: per-session atomic append/read/clear/list

pub mod store;

// Re-export key types
pub use store::{MemoryBackend, SessionBackend, SessionStore, SessionSummary};
