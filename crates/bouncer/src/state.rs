//! Application state and shared resources.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::flow::{FlowSettings, VibeCheckFlow};
use crate::llm::{CompletionClient, OpenAiClient};
use crate::ratelimit::RateLimiter;
use crate::sessions::{MemorySessionStore, SessionStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,

    /// Challenge/judge orchestration
    pub flow: Arc<VibeCheckFlow>,

    /// Budget for pages and form posts
    pub general_limiter: Arc<RateLimiter>,

    /// Budget for the result page
    pub result_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Wire the production collaborators: in-memory sessions, HTTP completion client
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let store = Arc::new(MemorySessionStore::new(
            Duration::from_secs(config.session.timeout_secs),
            config.session.max_attempts,
        ));
        let llm = Arc::new(OpenAiClient::new(&config.llm)?);

        Ok(Self::new(config, store, llm))
    }

    /// Build state around injected collaborators
    pub fn new(
        config: AppConfig,
        store: Arc<dyn SessionStore>,
        llm: Arc<dyn CompletionClient>,
    ) -> Self {
        let flow = Arc::new(VibeCheckFlow::new(
            store,
            llm,
            FlowSettings::from_config(&config),
        ));
        let general_limiter = Arc::new(RateLimiter::per_minute(
            "general",
            config.rate_limit.general_per_minute,
        ));
        let result_limiter = Arc::new(RateLimiter::per_minute(
            "result",
            config.rate_limit.result_per_minute,
        ));

        Self {
            config,
            flow,
            general_limiter,
            result_limiter,
        }
    }

    /// Session store shared with the background sweeper
    pub fn sessions(&self) -> Arc<dyn SessionStore> {
        self.flow.store().clone()
    }
}
