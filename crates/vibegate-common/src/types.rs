//! Core types shared across Vibegate components.

use chrono::{DateTime, Utc};

use crate::constants::sentinels;

/// Where a session sits in the vibe-check flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Challenge handed out, nothing submitted yet
    Issued,
    /// Attempt counted, judgment still pending
    Answered,
    /// Judge said yes (terminal)
    Granted,
    /// Judge said no, retries remain
    Denied,
    /// Session outlived its timeout
    Expired,
    /// Attempt budget exhausted (terminal)
    Locked,
}

impl FlowState {
    /// Returns true if no further submissions are accepted
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Granted | Self::Expired | Self::Locked)
    }
}

/// Outcome of a judgment, stored for the result page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    pub granted: bool,
    pub message: String,
}

impl AuthResult {
    pub const DEFAULT_GRANTED: &'static str = "Authentication successful. Welcome!";
    pub const DEFAULT_DENIED: &'static str = "Authentication failed. Please try again.";

    /// Interpret the judge's raw reply.
    ///
    /// Any occurrence of `ACCESS GRANTED` grants. The message is whatever
    /// follows `ACCESS GRANTED:` / `ACCESS DENIED:`; a reply without the
    /// colon-terminated prefix gets the default message.
    pub fn from_judgment(reply: &str) -> Self {
        let granted = reply.contains(sentinels::GRANTED);
        let (prefix, default) = if granted {
            (sentinels::GRANTED, Self::DEFAULT_GRANTED)
        } else {
            (sentinels::DENIED, Self::DEFAULT_DENIED)
        };

        let marker = format!("{}:", prefix);
        let message = match reply.split_once(&marker) {
            Some((_, rest)) => rest.trim().to_string(),
            None => default.to_string(),
        };

        Self { granted, message }
    }
}

/// Ephemeral state for one challenge/answer cycle
#[derive(Debug, Clone)]
pub struct Session {
    /// Unguessable session token
    pub id: String,

    /// Challenge text the user must answer
    pub challenge: String,

    pub created_at: DateTime<Utc>,

    /// Answers counted so far
    pub attempts: u32,

    pub max_attempts: u32,

    /// No further attempts once set
    pub completed: bool,

    /// Terminal outcome, set together with `completed`
    pub success: Option<bool>,

    /// Latest judgment, shown on the result page
    pub result: Option<AuthResult>,
}

impl Session {
    pub fn new(id: String, challenge: String, max_attempts: u32) -> Self {
        Self {
            id,
            challenge,
            created_at: Utc::now(),
            attempts: 0,
            max_attempts,
            completed: false,
            success: None,
            result: None,
        }
    }

    /// Check whether the session has outlived `timeout` at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>, timeout: chrono::Duration) -> bool {
        now - self.created_at >= timeout
    }

    /// Returns true once every attempt has been spent
    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    /// Derive the flow state from the stored fields
    pub fn state(&self) -> FlowState {
        if self.completed {
            return match self.success {
                Some(true) => FlowState::Granted,
                _ => FlowState::Locked,
            };
        }
        match (&self.result, self.attempts) {
            (_, 0) => FlowState::Issued,
            (Some(result), _) if !result.granted => FlowState::Denied,
            _ => FlowState::Answered,
        }
    }
}
