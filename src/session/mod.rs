//! Session layer
//!
//! One context per conversation: created on session start, discarded on
//! session end. Contexts are never shared between sessions, and the
//! per-session mutex keeps dispatch turn-based.

use crate::display::DisplayCache;
use crate::error::AgentError;
use crate::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Everything the dispatcher may mutate for one session.
#[derive(Debug)]
pub struct SessionContext {
    pub session_id: String,
    pub display: DisplayCache,
    pub started_at: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            display: DisplayCache::new(),
            started_at: Utc::now(),
        }
    }
}

pub type SessionHandle = Arc<Mutex<SessionContext>>;

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self) -> Result<SessionHandle>;
    async fn get(&self, session_id: &str) -> Result<SessionHandle>;
    async fn end(&self, session_id: &str) -> Result<()>;
    async fn count(&self) -> usize;
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, SessionHandle>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self) -> Result<SessionHandle> {
        let session_id = Uuid::new_v4().to_string();
        let handle = Arc::new(Mutex::new(SessionContext::new(session_id.clone())));

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, handle.clone());
        Ok(handle)
    }

    async fn get(&self, session_id: &str) -> Result<SessionHandle> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))
    }

    async fn end(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions
            .remove(session_id)
            .map(|_| ())
            .ok_or_else(|| AgentError::SessionNotFound(session_id.to_string()))
    }

    async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
