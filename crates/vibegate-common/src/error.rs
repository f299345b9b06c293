//! Error taxonomy for the vibe-check flow.
//!
//! Every variant maps to a fixed HTTP status and a user-facing message.
//! Provider details are only ever shown when debug mode is on.

use thiserror::Error;

/// Errors surfaced to the user by the vibe-check flow
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VibeError {
    /// Session id missing, unknown, or past its timeout
    #[error("Session expired")]
    SessionExpired,

    /// Session already reached a terminal state
    #[error("Session already completed")]
    SessionCompleted,

    /// Echoed challenge differs from the stored one
    #[error("Challenge mismatch")]
    ChallengeMismatch,

    /// Attempt budget exhausted
    #[error("Too many attempts")]
    AttemptsExceeded,

    /// Result page requested before any judgment
    #[error("No result available")]
    NoResult,

    /// Rejected form input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Per-client request budget exceeded
    #[error("Rate limit exceeded")]
    RateLimited,

    /// Provider rejected our credentials or model
    #[error("LLM auth error: {0}")]
    LlmAuth(String),

    /// Provider did not answer in time
    #[error("LLM timeout: {0}")]
    LlmTimeout(String),

    /// Anything else the provider threw at us
    #[error("LLM unexpected error: {0}")]
    LlmUnexpected(String),
}

impl VibeError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::SessionExpired
            | Self::SessionCompleted
            | Self::ChallengeMismatch
            | Self::AttemptsExceeded
            | Self::NoResult
            | Self::InvalidInput(_) => 400,
            Self::RateLimited => 429,
            Self::LlmAuth(_) => 503,
            Self::LlmTimeout(_) => 504,
            Self::LlmUnexpected(_) => 500,
        }
    }

    /// Message shown to the user. `debug` exposes provider details.
    pub fn user_message(&self, debug: bool) -> String {
        match self {
            Self::SessionExpired => "Session expired. Please start over.".to_string(),
            Self::SessionCompleted => {
                "This authentication session has already been completed. Please start over."
                    .to_string()
            }
            Self::ChallengeMismatch => "Challenge mismatch. Please start over.".to_string(),
            Self::AttemptsExceeded => "Too many attempts. Please start over.".to_string(),
            Self::NoResult => {
                "No result available. Please complete authentication first.".to_string()
            }
            Self::InvalidInput(detail) => detail.clone(),
            Self::RateLimited => "Too many requests. Slow down.".to_string(),
            Self::LlmAuth(detail) if debug => format!(
                "LLM API Error: {}. Please check your API keys and model configuration.",
                detail
            ),
            Self::LlmAuth(_) => {
                "Authentication system temporarily unavailable. Please try again later."
                    .to_string()
            }
            Self::LlmTimeout(_) => "Request timed out. Please try again.".to_string(),
            Self::LlmUnexpected(detail) if debug => format!("Unexpected error: {}", detail),
            Self::LlmUnexpected(_) => {
                "Authentication system error. Please try again later.".to_string()
            }
        }
    }

    /// True for failures that came from the completion provider
    pub fn is_llm_failure(&self) -> bool {
        matches!(
            self,
            Self::LlmAuth(_) | Self::LlmTimeout(_) | Self::LlmUnexpected(_)
        )
    }
}
