//! Core data model shared across the pipeline
//!
//! - Fragment: a retrieved chunk of source text with its similarity score
//! - ConversationTurn: one user or assistant message in a session
//! - Session: a bounded, TTL-expiring conversation log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Source document metadata joined into each fragment at retrieval time,
/// so a single query stage returns fully described fragments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMetadata {
    /// Document title (filename for uploaded documents)
    pub title: String,
    /// Source path within the document store
    pub path: String,
    /// Document-level summary produced at ingestion
    pub summary: String,
}

/// A retrieved unit of source text. Immutable once retrieved; owned
/// transiently by one retrieval call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    /// Owning document identifier
    pub source_doc_id: String,
    /// Chunk text as stored
    pub text: String,
    /// Character offsets within the source document
    pub start_offset: usize,
    pub end_offset: usize,
    /// Cosine similarity against the query (0.5 default in degraded mode)
    pub similarity: f32,
    pub metadata: SourceMetadata,
}

/// Speaker role for a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a session. Append-only; insertion order is
/// conversational order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A conversation log keyed by an opaque identifier. Turn count is bounded;
/// oldest turns are evicted first. Expiry is decided by the store (absence
/// on lookup is equivalent to deletion).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    turns: VecDeque<ConversationTurn>,
    pub last_activity: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl Session {
    /// Create an empty session
    pub fn new(session_id: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            session_id: session_id.into(),
            turns: VecDeque::new(),
            last_activity: Utc::now(),
            ttl_seconds,
        }
    }

    /// Append a turn, evicting the oldest turn when past `max_turns`.
    /// Resets the activity timestamp (and therefore the TTL countdown).
    ///
    /// # Complexity
    /// O(1) amortized - VecDeque push_back / pop_front
    pub fn push_turn(&mut self, turn: ConversationTurn, max_turns: usize) {
        while self.turns.len() >= max_turns && !self.turns.is_empty() {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
        self.last_activity = Utc::now();
    }

    /// Turns in conversational order
    pub fn turns(&self) -> &VecDeque<ConversationTurn> {
        &self.turns
    }

    /// Turns as an owned vector (for reads across the store boundary)
    pub fn turns_vec(&self) -> Vec<ConversationTurn> {
        self.turns.iter().cloned().collect()
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Whether the session has outlived its TTL as of `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.last_activity);
        age.num_seconds() >= self.ttl_seconds as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn turn(i: usize) -> ConversationTurn {
        if i % 2 == 0 {
            ConversationTurn::user(format!("question {}", i))
        } else {
            ConversationTurn::assistant(format!("answer {}", i))
        }
    }

    #[test]
    fn test_push_turn_bounded() {
        let mut session = Session::new("s1", 3600);
        for i in 0..10 {
            session.push_turn(turn(i), 4);
        }

        assert_eq!(session.turn_count(), 4);
        // Oldest evicted first, relative order preserved
        assert_eq!(session.turns()[0].content, "question 6");
        assert_eq!(session.turns()[3].content, "answer 9");
    }

    #[test]
    fn test_push_turn_resets_activity() {
        let mut session = Session::new("s1", 3600);
        let before = session.last_activity;
        std::thread::sleep(std::time::Duration::from_millis(5));
        session.push_turn(turn(0), 50);
        assert!(session.last_activity >= before);
    }

    #[test]
    fn test_expiry_check() {
        let mut session = Session::new("s1", 60);
        session.push_turn(turn(0), 50);

        let now = session.last_activity;
        assert!(!session.is_expired_at(now + Duration::seconds(59)));
        assert!(session.is_expired_at(now + Duration::seconds(60)));
    }

    #[test]
    fn test_turn_role_serialization() {
        let t = ConversationTurn::user("hello");
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"role\":\"user\""));

        let back: ConversationTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(back.role, Role::User);
    }
}
