//! The vibe-check flow.
//!
//! ```text
//! issue_challenge ──► Issued ──submit──► Answered ──judge──► Granted
//!                                            │                Denied ──retry──► Answered
//!                                            └─ limit hit ──► Locked
//! ```
//!
//! Every rejection that can be decided locally (unknown session, completed
//! session, tampered challenge, spent attempts) happens before the model is
//! called.

use std::sync::Arc;
use std::time::Duration;

use vibegate_common::constants::{MAX_CHALLENGE_CHARS, MAX_USER_INPUT_CHARS, paths};
use vibegate_common::{AuthResult, FlowState, Session, VibeError};

use crate::config::AppConfig;
use crate::html::{
    add_session_to_form, clean_llm_response, extract_challenge_from_form, truncate_for_log,
};
use crate::llm::CompletionClient;
use crate::prompts;
use crate::sessions::SessionStore;
use crate::templates;

/// Longest value logged verbatim
const LOG_PREVIEW_CHARS: usize = 100;

/// Flow tuning knobs
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Pause before each judgment
    pub judge_delay: Duration,
}

impl FlowSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            judge_delay: Duration::from_millis(config.session.judge_delay_ms),
        }
    }
}

/// A freshly issued challenge
#[derive(Debug)]
pub struct IssuedChallenge {
    pub session_id: String,
    /// Form fragment for the sign-in modal, session id already embedded
    pub html: String,
}

/// A validated answer submission
#[derive(Debug, Clone)]
pub struct Submission {
    pub session_id: Option<String>,
    pub challenge: String,
    pub user_input: String,
}

impl Submission {
    /// Enforce field limits and strip NUL bytes
    pub fn new(
        session_id: Option<String>,
        challenge: String,
        user_input: String,
    ) -> Result<Self, VibeError> {
        if user_input.chars().count() > MAX_USER_INPUT_CHARS {
            return Err(VibeError::InvalidInput(format!(
                "Input too long (max {} characters)",
                MAX_USER_INPUT_CHARS
            )));
        }
        if challenge.chars().count() > MAX_CHALLENGE_CHARS {
            return Err(VibeError::InvalidInput(format!(
                "Challenge too long (max {} characters)",
                MAX_CHALLENGE_CHARS
            )));
        }

        Ok(Self {
            session_id: session_id.filter(|id| !id.is_empty()),
            challenge: challenge.replace('\0', ""),
            user_input: user_input.replace('\0', ""),
        })
    }
}

/// Outcome of a judged submission
#[derive(Debug)]
pub struct Judgment {
    pub session_id: String,
    pub result: AuthResult,
    pub state: FlowState,
}

impl Judgment {
    /// Where the client is sent to see the result
    pub fn redirect_location(&self) -> String {
        result_path(&self.session_id)
    }
}

/// Path of the result page for a session
pub fn result_path(session_id: &str) -> String {
    format!("{}{}", paths::AUTH_RESULT_PREFIX, session_id)
}

/// Sequences challenge issuance, judging, and result lookup
pub struct VibeCheckFlow {
    store: Arc<dyn SessionStore>,
    llm: Arc<dyn CompletionClient>,
    settings: FlowSettings,
}

impl VibeCheckFlow {
    pub fn new(
        store: Arc<dyn SessionStore>,
        llm: Arc<dyn CompletionClient>,
        settings: FlowSettings,
    ) -> Self {
        Self { store, llm, settings }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Ask the model for a challenge form and open a session for it
    pub async fn issue_challenge(&self) -> Result<IssuedChallenge, VibeError> {
        self.store.sweep_expired().await;

        let prompt = prompts::modal_generation_prompt();
        tracing::debug!(
            model = %self.llm.model(),
            prompt_len = prompt.len(),
            "Requesting challenge form"
        );

        let raw = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| llm_failure("issue_challenge", e.into()))?;

        let content = clean_llm_response(&raw);
        let challenge = extract_challenge_from_form(&content);
        let session_id = self.store.create(&challenge).await;

        let mut html = add_session_to_form(&content, &session_id);
        html.push_str(&templates::hide_auth_button_script());

        tracing::info!(
            session_id = %session_id,
            challenge = %truncate_for_log(&challenge, LOG_PREVIEW_CHARS),
            "Challenge issued"
        );

        Ok(IssuedChallenge { session_id, html })
    }

    /// Judge an answer and record the outcome
    pub async fn submit(&self, submission: Submission) -> Result<Judgment, VibeError> {
        let session_id = submission.session_id.ok_or(VibeError::SessionExpired)?;

        let session = self
            .store
            .get(&session_id)
            .await
            .ok_or(VibeError::SessionExpired)?;

        if self.store.is_completed(&session_id).await {
            return Err(VibeError::SessionCompleted);
        }

        if session.challenge != submission.challenge {
            tracing::warn!(session_id = %session_id, "Challenge mismatch");
            return Err(VibeError::ChallengeMismatch);
        }

        if !self.store.increment_attempts(&session_id).await {
            if self.store.get(&session_id).await.is_none() {
                return Err(VibeError::SessionExpired);
            }
            self.store.complete(&session_id, false).await;
            tracing::warn!(session_id = %session_id, "Attempt limit reached");
            return Err(VibeError::AttemptsExceeded);
        }

        tokio::time::sleep(self.settings.judge_delay).await;

        tracing::debug!(
            session_id = %session_id,
            challenge = %truncate_for_log(&submission.challenge, LOG_PREVIEW_CHARS),
            user_input = %truncate_for_log(&submission.user_input, LOG_PREVIEW_CHARS),
            attempt = session.attempts + 1,
            "Judging answer"
        );

        let prompt = prompts::vibe_check_prompt(&submission.challenge, &submission.user_input);
        let reply = self
            .llm
            .complete(&prompt)
            .await
            .map_err(|e| llm_failure("submit", e.into()))?;

        let result = AuthResult::from_judgment(&reply);
        tracing::debug!(
            session_id = %session_id,
            reply = %truncate_for_log(&reply, LOG_PREVIEW_CHARS),
            granted = result.granted,
            "Judge replied"
        );

        let stored = self
            .store
            .record_judgment(&session_id, result)
            .await
            .ok_or(VibeError::SessionExpired)?;
        let state = stored.state();
        // A concurrent answer may have settled the session first
        let result = stored.result.ok_or(VibeError::NoResult)?;

        tracing::info!(
            session_id = %session_id,
            granted = result.granted,
            state = ?state,
            "Vibe check complete"
        );

        Ok(Judgment {
            session_id,
            result,
            state,
        })
    }

    /// Session snapshot for the result page; it always carries a result
    pub async fn result(&self, session_id: &str) -> Result<Session, VibeError> {
        let session = self
            .store
            .get(session_id)
            .await
            .ok_or(VibeError::SessionExpired)?;

        if session.result.is_none() {
            return Err(VibeError::NoResult);
        }

        Ok(session)
    }
}

fn llm_failure(context: &str, err: VibeError) -> VibeError {
    tracing::error!(context, error = %err, "Completion request failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::llm::mock::MockCompletion;
    use crate::sessions::MemorySessionStore;
    use tokio_test::{assert_err, assert_ok};

    const SKY: &str = "What color is the sky?";

    fn flow_with(replies: Vec<Result<String, LlmError>>) -> (VibeCheckFlow, Arc<MockCompletion>) {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(3600), 3));
        let llm = Arc::new(MockCompletion::new(replies));
        let flow = VibeCheckFlow::new(
            store,
            llm.clone(),
            FlowSettings {
                judge_delay: Duration::ZERO,
            },
        );
        (flow, llm)
    }

    fn replies(texts: &[&str]) -> Vec<Result<String, LlmError>> {
        texts.iter().map(|t| Ok(t.to_string())).collect()
    }

    fn answer(session_id: &str, challenge: &str) -> Submission {
        Submission::new(
            Some(session_id.to_string()),
            challenge.to_string(),
            "Blue, like my mood on Mondays".to_string(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_issue_challenge_opens_session() {
        let form = format!(
            "```html\n<form method=\"post\" action=\"/check-vibe\">\n<input type=\"hidden\" name=\"challenge\" value=\"{}\">\n</form>\n```",
            SKY
        );
        let (flow, llm) = flow_with(vec![Ok(form)]);

        let issued = flow.issue_challenge().await.unwrap();
        assert!(!issued.html.contains("```"));
        assert!(issued.html.contains(&format!(
            r#"<input type="hidden" name="session_id" value="{}">"#,
            issued.session_id
        )));
        assert!(issued.html.contains("auth-button"));

        let session = flow.store().get(&issued.session_id).await.unwrap();
        assert_eq!(session.challenge, SKY);
        assert_eq!(session.state(), FlowState::Issued);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_issue_challenge_llm_failure_creates_nothing() {
        let (flow, _) = flow_with(vec![Err(LlmError::Auth("401".into()))]);

        let err = flow.issue_challenge().await.unwrap_err();
        assert_eq!(err, VibeError::LlmAuth("401".into()));
        assert_eq!(flow.store().len().await, 0);
    }

    #[tokio::test]
    async fn test_granted_redirects_to_result() {
        let (flow, llm) = flow_with(replies(&["ACCESS GRANTED: Welcome"]));
        let id = flow.store().create(SKY).await;

        let judgment = assert_ok!(flow.submit(answer(&id, SKY)).await);
        assert!(judgment.result.granted);
        assert_eq!(judgment.result.message, "Welcome");
        assert_eq!(judgment.state, FlowState::Granted);
        assert_eq!(judgment.redirect_location(), format!("/auth-result/{}", id));

        let session = flow.result(&id).await.unwrap();
        assert_eq!(session.result.unwrap().message, "Welcome");

        // The judge saw both the question and the answer
        let prompt = &llm.prompts()[0];
        assert!(prompt.contains(SKY));
        assert!(prompt.contains("Blue, like my mood on Mondays"));
    }

    #[tokio::test]
    async fn test_challenge_mismatch_skips_llm() {
        let (flow, llm) = flow_with(replies(&["ACCESS GRANTED: should not happen"]));
        let id = flow.store().create(SKY).await;

        let err = assert_err!(flow.submit(answer(&id, "What is 2 + 2?")).await);
        assert_eq!(err, VibeError::ChallengeMismatch);
        assert_eq!(llm.calls(), 0);
        assert_eq!(flow.store().get(&id).await.unwrap().attempts, 0);
    }

    #[tokio::test]
    async fn test_completed_session_rejects_submission() {
        let (flow, llm) = flow_with(replies(&["ACCESS GRANTED: Welcome"]));
        let id = flow.store().create(SKY).await;

        flow.submit(answer(&id, SKY)).await.unwrap();
        let err = flow.submit(answer(&id, SKY)).await.unwrap_err();
        assert_eq!(err, VibeError::SessionCompleted);
        assert_eq!(llm.calls(), 1);
    }

    #[tokio::test]
    async fn test_three_denials_lock_session() {
        let (flow, llm) = flow_with(replies(&[
            "ACCESS DENIED: Bland.",
            "ACCESS DENIED: Still bland.",
            "ACCESS DENIED: Goodbye.",
        ]));
        let id = flow.store().create(SKY).await;

        let first = flow.submit(answer(&id, SKY)).await.unwrap();
        assert_eq!(first.state, FlowState::Denied);
        assert_eq!(first.result.message, "Bland.");

        let second = flow.submit(answer(&id, SKY)).await.unwrap();
        assert_eq!(second.state, FlowState::Denied);

        let third = flow.submit(answer(&id, SKY)).await.unwrap();
        assert_eq!(third.state, FlowState::Locked);
        assert_eq!(third.result.message, "Goodbye.");

        let err = flow.submit(answer(&id, SKY)).await.unwrap_err();
        assert_eq!(err, VibeError::SessionCompleted);
        assert_eq!(llm.calls(), 3);

        let session = flow.store().get(&id).await.unwrap();
        assert_eq!(session.attempts, 3);
        assert_eq!(session.success, Some(false));
    }

    #[tokio::test]
    async fn test_missing_or_unknown_session() {
        let (flow, llm) = flow_with(vec![]);

        let no_id = Submission::new(None, SKY.to_string(), "hi".to_string()).unwrap();
        assert_eq!(flow.submit(no_id).await.unwrap_err(), VibeError::SessionExpired);

        let empty_id =
            Submission::new(Some(String::new()), SKY.to_string(), "hi".to_string()).unwrap();
        assert_eq!(flow.submit(empty_id).await.unwrap_err(), VibeError::SessionExpired);

        let err = flow.submit(answer("ghost", SKY)).await.unwrap_err();
        assert_eq!(err, VibeError::SessionExpired);
        assert_eq!(llm.calls(), 0);
    }

    #[tokio::test]
    async fn test_llm_timeout_surfaces_and_counts_attempt() {
        let (flow, _) = flow_with(vec![Err(LlmError::Timeout("30s".into()))]);
        let id = flow.store().create(SKY).await;

        let err = flow.submit(answer(&id, SKY)).await.unwrap_err();
        assert_eq!(err.status_code(), 504);

        let session = flow.store().get(&id).await.unwrap();
        assert_eq!(session.attempts, 1);
        assert!(session.result.is_none());
    }

    #[tokio::test]
    async fn test_failed_last_attempt_then_resubmit_is_exhausted() {
        let (flow, llm) = flow_with(vec![
            Ok("ACCESS DENIED: Bland.".to_string()),
            Ok("ACCESS DENIED: Still bland.".to_string()),
            Err(LlmError::Timeout("30s".into())),
        ]);
        let id = flow.store().create(SKY).await;

        assert_eq!(flow.submit(answer(&id, SKY)).await.unwrap().state, FlowState::Denied);
        assert_eq!(flow.submit(answer(&id, SKY)).await.unwrap().state, FlowState::Denied);

        // The third attempt is spent even though the judge never answered
        let err = flow.submit(answer(&id, SKY)).await.unwrap_err();
        assert_eq!(err, VibeError::LlmTimeout("30s".into()));
        assert!(!flow.store().is_completed(&id).await);

        let err = assert_err!(flow.submit(answer(&id, SKY)).await);
        assert_eq!(err, VibeError::AttemptsExceeded);
        assert_eq!(llm.calls(), 3);

        let session = flow.store().get(&id).await.unwrap();
        assert_eq!(session.attempts, 3);
        assert!(session.completed);
        assert_eq!(session.success, Some(false));
        assert_eq!(session.state(), FlowState::Locked);
    }

    #[tokio::test]
    async fn test_late_denial_keeps_grant() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(3600), 2));
        let flow = VibeCheckFlow::new(
            store.clone(),
            Arc::new(MockCompletion::replying(&["ACCESS GRANTED: Welcome"])),
            FlowSettings {
                judge_delay: Duration::ZERO,
            },
        );
        let id = flow.store().create(SKY).await;

        // Another answer is already counted and waiting on the judge
        assert!(store.increment_attempts(&id).await);

        let judgment = flow.submit(answer(&id, SKY)).await.unwrap();
        assert_eq!(judgment.state, FlowState::Granted);

        let late = store
            .record_judgment(&id, AuthResult::from_judgment("ACCESS DENIED: too slow"))
            .await
            .unwrap();
        assert_eq!(late.state(), FlowState::Granted);

        let session = flow.result(&id).await.unwrap();
        assert_eq!(session.success, Some(true));
        assert_eq!(session.result.unwrap().message, "Welcome");
    }

    #[tokio::test]
    async fn test_result_before_judgment() {
        let (flow, _) = flow_with(vec![]);
        let id = flow.store().create(SKY).await;

        assert_eq!(flow.result(&id).await.unwrap_err(), VibeError::NoResult);
        assert_eq!(flow.result("ghost").await.unwrap_err(), VibeError::SessionExpired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_judge_delay_applied() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(3600), 3));
        let flow = VibeCheckFlow::new(
            store,
            Arc::new(MockCompletion::replying(&["ACCESS DENIED: slow down"])),
            FlowSettings {
                judge_delay: Duration::from_secs(2),
            },
        );
        let id = flow.store().create(SKY).await;

        let started = tokio::time::Instant::now();
        flow.submit(answer(&id, SKY)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn test_submission_limits_and_nul_stripping() {
        let ok = Submission::new(
            Some("sid".into()),
            "Why?\0".to_string(),
            "be\0cause".to_string(),
        )
        .unwrap();
        assert_eq!(ok.challenge, "Why?");
        assert_eq!(ok.user_input, "because");

        let long_input = "x".repeat(MAX_USER_INPUT_CHARS + 1);
        assert!(matches!(
            Submission::new(None, "q".into(), long_input),
            Err(VibeError::InvalidInput(_))
        ));

        let long_challenge = "é".repeat(MAX_CHALLENGE_CHARS + 1);
        assert!(matches!(
            Submission::new(None, long_challenge, "a".into()),
            Err(VibeError::InvalidInput(_))
        ));

        // Limits count characters, not bytes
        let wide = "é".repeat(MAX_USER_INPUT_CHARS);
        assert!(Submission::new(None, "q".into(), wide).is_ok());
    }
}
