//! In-memory session store behind a single coarse lock.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::Mutex;

use vibegate_common::{AuthResult, Session};

use super::{SessionStore, generate_session_id};

/// Single-process session store
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, Session>>,
    /// Session lifetime
    timeout: chrono::Duration,
    /// Attempt budget handed to new sessions
    max_attempts: u32,
}

impl MemorySessionStore {
    pub fn new(timeout: Duration, max_attempts: u32) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout: chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX),
            max_attempts,
        }
    }

    /// Apply `f` to a live session, evicting it first if it has expired
    async fn with_live<T>(&self, id: &str, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();

        let expired = sessions.get(id)?.is_expired_at(now, self.timeout);
        if expired {
            sessions.remove(id);
            tracing::debug!(session_id = %id, "Session expired on read");
            return None;
        }

        sessions.get_mut(id).map(f)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, challenge: &str) -> String {
        let mut sessions = self.sessions.lock().await;

        let mut id = generate_session_id();
        while sessions.contains_key(&id) {
            id = generate_session_id();
        }

        let session = Session::new(id.clone(), challenge.to_string(), self.max_attempts);
        sessions.insert(id.clone(), session);

        tracing::debug!(session_id = %id, "Created challenge session");

        id
    }

    async fn get(&self, id: &str) -> Option<Session> {
        self.with_live(id, |session| session.clone()).await
    }

    async fn increment_attempts(&self, id: &str) -> bool {
        self.with_live(id, |session| {
            if session.completed {
                return false;
            }
            if session.is_exhausted() {
                session.completed = true;
                session.success = Some(false);
                return false;
            }
            session.attempts += 1;
            true
        })
        .await
        .unwrap_or(false)
    }

    async fn complete(&self, id: &str, success: bool) -> bool {
        let done = self
            .with_live(id, |session| {
                if session.completed {
                    return false;
                }
                session.completed = true;
                session.success = Some(success);
                true
            })
            .await
            .unwrap_or(false);

        if done {
            tracing::debug!(session_id = %id, success, "Session completed");
        }
        done
    }

    async fn is_completed(&self, id: &str) -> bool {
        self.with_live(id, |session| session.completed)
            .await
            .unwrap_or(false)
    }

    async fn record_judgment(&self, id: &str, result: AuthResult) -> Option<Session> {
        self.with_live(id, |session| {
            if session.completed {
                tracing::debug!(
                    session_id = %id,
                    granted = result.granted,
                    "Late judgment ignored, session already settled"
                );
                return session.clone();
            }

            if result.granted {
                session.completed = true;
                session.success = Some(true);
            } else if session.is_exhausted() {
                session.completed = true;
                session.success = Some(false);
            }
            session.result = Some(result);
            session.clone()
        })
        .await
    }

    async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let now = Utc::now();
        let before = sessions.len();

        sessions.retain(|_, session| !session.is_expired_at(now, self.timeout));

        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired sessions");
        }
        removed
    }

    async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
