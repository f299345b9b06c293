//! Challenge session storage.
//!
//! The flow only talks to the `SessionStore` trait; `MemorySessionStore`
//! is the single-process backend.

mod memory;

pub use memory::MemorySessionStore;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use vibegate_common::{AuthResult, Session};

/// Ephemeral challenge/attempt state keyed by session id.
///
/// Every method must be atomic with respect to a single id: the attempt
/// counter is check-then-act.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a fresh session and return its id
    async fn create(&self, challenge: &str) -> String;

    /// Snapshot of a live session. Expired entries are dropped on read.
    async fn get(&self, id: &str) -> Option<Session>;

    /// Count one attempt.
    ///
    /// Returns false (and marks the session completed-as-failed) once the
    /// limit is reached; also false for missing or completed sessions.
    async fn increment_attempts(&self, id: &str) -> bool;

    /// Mark the session terminal.
    ///
    /// False for missing sessions and for sessions that are already
    /// terminal; a terminal session is never rewritten.
    async fn complete(&self, id: &str, success: bool) -> bool;

    async fn is_completed(&self, id: &str) -> bool;

    /// Store a judgment and settle the session in one step.
    ///
    /// A grant completes the session as successful; a denial that spent the
    /// last attempt locks it. A session that is already terminal keeps its
    /// result and outcome. Returns the session as stored afterwards.
    async fn record_judgment(&self, id: &str, result: AuthResult) -> Option<Session>;

    /// Drop every expired session, returning how many went
    async fn sweep_expired(&self) -> usize;

    /// Number of stored sessions
    async fn len(&self) -> usize;
}

/// Generate a cryptographically random session id
pub fn generate_session_id() -> String {
    use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
    use rand::Rng;

    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Background worker: periodically sweep expired sessions until shutdown
pub async fn session_sweeper(
    store: Arc<dyn SessionStore>,
    interval: Duration,
    mut shutdown: tokio::sync::broadcast::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    // First tick fires immediately
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let removed = store.sweep_expired().await;
                if removed > 0 {
                    tracing::debug!(removed, "Swept expired sessions");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Session sweeper shutting down");
                break;
            }
        }
    }
}
