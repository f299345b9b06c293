//! Shared constants for Vibegate components.

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:6969";

/// Default model handed to the completion provider
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default OpenAI-compatible API base
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Session lifetime in seconds (1 hour)
pub const SESSION_TIMEOUT_SECS: u64 = 3600;

/// Answers allowed per session before it locks
pub const MAX_ATTEMPTS: u32 = 3;

/// How often the background sweeper drops expired sessions
pub const SWEEP_INTERVAL_SECS: u64 = 60;

/// Completion request timeout
pub const LLM_TIMEOUT_SECS: u64 = 30;

/// Pause before every judgment, throttles brute force
pub const JUDGE_DELAY_MS: u64 = 2000;

/// Form field limits (characters)
pub const MAX_USER_INPUT_CHARS: usize = 2000;
pub const MAX_CHALLENGE_CHARS: usize = 1000;

/// Rate limits (requests per minute per client)
pub const GENERAL_RATE_LIMIT: u32 = 60;
pub const RESULT_RATE_LIMIT: u32 = 10;

/// Sentinel phrases the judge prefixes its verdict with
pub mod sentinels {
    pub const GRANTED: &str = "ACCESS GRANTED";
    pub const DENIED: &str = "ACCESS DENIED";
}

/// HTTP routes
pub mod paths {
    pub const LANDING: &str = "/";
    pub const SIGNIN_MODAL: &str = "/get-signin-modal";
    pub const CHECK_VIBE: &str = "/check-vibe";
    pub const AUTH_RESULT_PREFIX: &str = "/auth-result/";
    pub const HEALTH: &str = "/health";
}
