//! Completion provider seam.
//!
//! The flow sees the model as a black box: prompt in, text out.

mod openai;

#[cfg(test)]
pub mod mock;

pub use openai::OpenAiClient;

use async_trait::async_trait;
use thiserror::Error;
use vibegate_common::VibeError;

/// Provider failures, classified the way the user-facing taxonomy needs them
#[derive(Debug, Error)]
pub enum LlmError {
    /// Rejected credentials, unknown model, or other key/config trouble
    #[error("provider rejected request: {0}")]
    Auth(String),

    #[error("provider timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Unexpected(String),
}

impl From<LlmError> for VibeError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Auth(detail) => VibeError::LlmAuth(detail),
            LlmError::Timeout(detail) => VibeError::LlmTimeout(detail),
            LlmError::Unexpected(detail) => VibeError::LlmUnexpected(detail),
        }
    }
}

/// A single-turn chat completion API
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send `prompt` as one user message and return the reply text
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;

    /// Model name, for logging
    fn model(&self) -> &str;
}
