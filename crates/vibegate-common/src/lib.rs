//! # Vibegate Common
//!
//! Shared types, errors, and constants used across Vibegate components.
//!
//! ## Modules
//! - `types` - Session state and judge verdicts
//! - `error` - The user-facing error taxonomy
//! - `constants` - Shared configuration constants

pub mod constants;
pub mod error;
pub mod types;

pub use error::VibeError;
pub use types::*;
