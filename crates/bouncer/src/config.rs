//! Configuration management for Bouncer.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use vibegate_common::constants::{
    DEFAULT_API_BASE, DEFAULT_LISTEN_ADDR, DEFAULT_MODEL, GENERAL_RATE_LIMIT, JUDGE_DELAY_MS,
    LLM_TIMEOUT_SECS, MAX_ATTEMPTS, RESULT_RATE_LIMIT, SESSION_TIMEOUT_SECS, SWEEP_INTERVAL_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Verbose errors and debug logging. Never in production.
    #[serde(default)]
    pub debug: bool,

    /// Completion provider settings
    #[serde(default)]
    pub llm: LlmConfig,

    /// Session lifetime and attempt limits
    #[serde(default)]
    pub session: SessionConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Completion provider configuration (OpenAI-compatible API or LiteLLM proxy)
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,

    /// Direct provider API base
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default)]
    pub api_key: Option<String>,

    /// LiteLLM proxy base; used instead of `api_base` when a proxy key is also set
    #[serde(default)]
    pub proxy_api_base: Option<String>,

    #[serde(default)]
    pub proxy_api_key: Option<String>,

    /// Extra headers sent with every completion request
    #[serde(default)]
    pub custom_headers: HashMap<String, String>,

    /// Completion request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_base: default_api_base(),
            api_key: None,
            proxy_api_base: None,
            proxy_api_key: None,
            custom_headers: HashMap::new(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

impl LlmConfig {
    /// Resolve the (base URL, API key) pair requests go to
    pub fn endpoint(&self) -> (&str, Option<&str>) {
        match (&self.proxy_api_base, &self.proxy_api_key) {
            (Some(base), Some(key)) => (base.as_str(), Some(key.as_str())),
            _ => (self.api_base.as_str(), self.api_key.as_deref()),
        }
    }

    /// True when requests are routed through a LiteLLM proxy
    pub fn uses_proxy(&self) -> bool {
        self.proxy_api_base.is_some() && self.proxy_api_key.is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Session-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Session validity in seconds
    #[serde(default = "default_session_timeout")]
    pub timeout_secs: u64,

    /// Answers allowed before the session locks
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Background sweep interval in seconds
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Pause before each judgment in milliseconds
    #[serde(default = "default_judge_delay")]
    pub judge_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_session_timeout(),
            max_attempts: default_max_attempts(),
            sweep_interval_secs: default_sweep_interval(),
            judge_delay_ms: default_judge_delay(),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    /// Requests per minute per client on the page and form endpoints
    #[serde(default = "default_general_limit")]
    pub general_per_minute: u32,

    /// Requests per minute per client on the result page
    #[serde(default = "default_result_limit")]
    pub result_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            general_per_minute: default_general_limit(),
            result_per_minute: default_result_limit(),
        }
    }
}

// Default value functions
fn default_listen_addr() -> String { DEFAULT_LISTEN_ADDR.to_string() }
fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_api_base() -> String { DEFAULT_API_BASE.to_string() }
fn default_llm_timeout() -> u64 { LLM_TIMEOUT_SECS }
fn default_session_timeout() -> u64 { SESSION_TIMEOUT_SECS }
fn default_max_attempts() -> u32 { MAX_ATTEMPTS }
fn default_sweep_interval() -> u64 { SWEEP_INTERVAL_SECS }
fn default_judge_delay() -> u64 { JUDGE_DELAY_MS }
fn default_general_limit() -> u32 { GENERAL_RATE_LIMIT }
fn default_result_limit() -> u32 { RESULT_RATE_LIMIT }

/// Accepts the usual spellings of "on" for boolean env flags
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

impl AppConfig {
    /// Load configuration from file, with CLI/env overrides
    pub fn load(config_path: &str, args: &super::Args) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            // Use defaults if config file doesn't exist
            tracing::warn!("Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides(args)?;

        Ok(config)
    }

    fn apply_overrides(&mut self, args: &super::Args) -> Result<()> {
        if let Some(ref listen) = args.listen {
            self.listen_addr = listen.clone();
        }
        if let Some(ref debug) = args.debug {
            self.debug = is_truthy(debug);
        }
        if let Some(ref model) = args.model {
            self.llm.model = model.clone();
        }
        if let Some(ref base) = args.api_base {
            self.llm.api_base = base.clone();
        }
        if let Some(ref key) = args.api_key {
            self.llm.api_key = Some(key.clone());
        }
        if let Some(ref base) = args.proxy_api_base {
            self.llm.proxy_api_base = Some(base.clone());
        }
        if let Some(ref key) = args.proxy_api_key {
            self.llm.proxy_api_key = Some(key.clone());
        }
        if let Some(ref raw) = args.custom_headers {
            let headers: HashMap<String, String> = serde_json::from_str(raw)
                .context("LITELLM_CUSTOM_HEADERS must be a JSON object of strings")?;
            self.llm.custom_headers.extend(headers);
        }

        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            debug: false,
            llm: LlmConfig::default(),
            session: SessionConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}
