//! Durable, TTL-bounded conversation log store
//!
//! Each session is an independently lockable unit: appends are atomic with
//! respect to other appends/reads on the same session id, while different
//! sessions never block each other. Expiry is passive: an expired session
//! behaves exactly like an absent one. If the backing store is unreachable
//! the store degrades to a process-local map with the same TTL and
//! eviction semantics.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::config::SessionConfig;
use crate::types::{ConversationTurn, Session};

/// Observability summary for one session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub turn_count: usize,
    pub last_activity: DateTime<Utc>,
}

/// Key-value contract for session persistence. Implementations store whole
/// sessions; TTL interpretation is uniform in the store layer so the
/// fallback behaves identically to the primary.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    async fn get(&self, session_id: &str) -> anyhow::Result<Option<Session>>;
    async fn put(&self, session: &Session) -> anyhow::Result<()>;
    async fn delete(&self, session_id: &str) -> anyhow::Result<()>;
    async fn list(&self) -> anyhow::Result<Vec<Session>>;
}

/// In-process, non-durable backend. Serves as the degraded-mode fallback
/// and as the default backend for tests.
#[derive(Default)]
pub struct MemoryBackend {
    sessions: RwLock<HashMap<String, Session>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired session. Expiry is otherwise lazy; this exists so
    /// long-lived processes can reclaim memory.
    pub async fn sweep(&self) {
        let now = Utc::now();
        self.sessions
            .write()
            .await
            .retain(|_, session| !session.is_expired_at(now));
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn get(&self, session_id: &str) -> anyhow::Result<Option<Session>> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }

    async fn put(&self, session: &Session) -> anyhow::Result<()> {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> anyhow::Result<()> {
        self.sessions.write().await.remove(session_id);
        Ok(())
    }

    async fn list(&self) -> anyhow::Result<Vec<Session>> {
        Ok(self.sessions.read().await.values().cloned().collect())
    }
}

/// Session store over a primary backend with an in-process fallback
pub struct SessionStore {
    primary: Arc<dyn SessionBackend>,
    fallback: MemoryBackend,
    config: SessionConfig,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionStore {
    pub fn new(primary: Arc<dyn SessionBackend>, config: SessionConfig) -> Self {
        Self {
            primary,
            fallback: MemoryBackend::new(),
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Store backed purely by process memory
    pub fn in_memory(config: SessionConfig) -> Self {
        Self::new(Arc::new(MemoryBackend::new()), config)
    }

    /// Append a turn, creating the session if absent and resetting its TTL
    /// countdown. Atomic per session id.
    pub async fn append(&self, session_id: &str, turn: ConversationTurn) {
        let lock = self.lock_for(session_id).await;
        let _guard = lock.lock().await;

        // Primary first; any primary failure degrades this call to the
        // in-process fallback so conversational continuity survives.
        if self.append_on(&*self.primary, session_id, turn.clone()).await.is_err() {
            // Infallible on the memory backend
            let _ = self.append_on(&self.fallback, session_id, turn).await;
        }
    }

    async fn append_on(
        &self,
        backend: &dyn SessionBackend,
        session_id: &str,
        turn: ConversationTurn,
    ) -> anyhow::Result<()> {
        let now = Utc::now();
        let mut session = match backend.get(session_id).await? {
            Some(existing) if !existing.is_expired_at(now) => existing,
            // Absent or expired: the session never existed
            _ => Session::new(session_id, self.config.ttl_seconds),
        };

        session.push_turn(turn, self.config.max_turns);
        backend.put(&session).await
    }

    /// Ordered conversation log; empty for absent or expired sessions
    pub async fn read(&self, session_id: &str) -> Vec<ConversationTurn> {
        let lock = self.lock_for(session_id).await;
        let _guard = lock.lock().await;

        let session = match self.get_live(session_id).await {
            Some(session) => session,
            None => return Vec::new(),
        };

        session.turns_vec()
    }

    /// Delete the session immediately on both backends
    pub async fn clear(&self, session_id: &str) {
        let lock = self.lock_for(session_id).await;
        let _guard = lock.lock().await;

        let _ = self.primary.delete(session_id).await;
        let _ = self.fallback.delete(session_id).await;
    }

    /// Summaries of all live sessions, for observability
    pub async fn list(&self) -> Vec<SessionSummary> {
        let now = Utc::now();
        let sessions = match self.primary.list().await {
            Ok(sessions) => sessions,
            Err(_) => self.fallback.list().await.unwrap_or_default(),
        };

        sessions
            .into_iter()
            .filter(|session| !session.is_expired_at(now))
            .map(|session| SessionSummary {
                session_id: session.session_id.clone(),
                turn_count: session.turn_count(),
                last_activity: session.last_activity,
            })
            .collect()
    }

    /// Reclaim expired sessions eagerly. Observable behavior is unchanged
    /// (expired already reads as absent); this frees backend storage.
    pub async fn sweep(&self) {
        let now = Utc::now();
        if let Ok(sessions) = self.primary.list().await {
            for session in sessions {
                if session.is_expired_at(now) {
                    let _ = self.primary.delete(&session.session_id).await;
                }
            }
        }
        self.fallback.sweep().await;
    }

    async fn get_live(&self, session_id: &str) -> Option<Session> {
        let now = Utc::now();

        let fetched = match self.primary.get(session_id).await {
            Ok(found) => found,
            Err(_) => self.fallback.get(session_id).await.ok().flatten(),
        };

        match fetched {
            Some(session) if session.is_expired_at(now) => {
                // Lazy reclamation: expired == never existed
                let _ = self.primary.delete(session_id).await;
                let _ = self.fallback.delete(session_id).await;
                None
            }
            other => other,
        }
    }

    async fn lock_for(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
