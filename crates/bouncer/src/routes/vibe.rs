//! Challenge issuance and answer submission.

use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{Html, Redirect},
};
use serde::Deserialize;

use crate::flow::Submission;
use crate::state::AppState;

use super::{HtmlError, log_request};

/// Generate a challenge form and open a session for it
pub async fn signin_modal(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Html<String>, HtmlError> {
    log_request("POST /get-signin-modal", &headers);

    let issued = state
        .flow
        .issue_challenge()
        .await
        .map_err(|e| HtmlError::new(e, state.config.debug))?;

    tracing::debug!(session_id = %issued.session_id, "Sign-in modal served");
    Ok(Html(issued.html))
}

#[derive(Deserialize)]
pub struct CheckVibeForm {
    user_input: String,
    challenge: String,
    #[serde(default)]
    session_id: Option<String>,
}

/// Judge an answer, then redirect to the result page
pub async fn check_vibe(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CheckVibeForm>,
) -> Result<Redirect, HtmlError> {
    log_request("POST /check-vibe", &headers);
    let debug = state.config.debug;

    let submission = Submission::new(form.session_id, form.challenge, form.user_input)
        .map_err(|e| HtmlError::new(e, debug))?;

    let judgment = state
        .flow
        .submit(submission)
        .await
        .map_err(|e| HtmlError::new(e, debug))?;

    tracing::debug!(
        session_id = %judgment.session_id,
        granted = judgment.result.granted,
        state = ?judgment.state,
        "Redirecting to result"
    );

    // 303 so a refresh cannot re-submit the answer
    Ok(Redirect::to(&judgment.redirect_location()))
}
