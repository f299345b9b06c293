//! Landing and result pages.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Html,
};

use vibegate_common::VibeError;

use crate::state::AppState;
use crate::templates::{self, RetryForm};

use super::{HtmlError, log_request};

/// Landing page
pub async fn landing(headers: HeaderMap) -> Html<String> {
    log_request("GET /", &headers);
    Html(templates::landing_page())
}

/// Display the stored outcome (the GET half of post/redirect/get)
pub async fn auth_result(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
) -> Result<Html<String>, HtmlError> {
    log_request("GET /auth-result", &headers);

    let session = state
        .flow
        .result(&session_id)
        .await
        .map_err(|e| HtmlError::new(e, state.config.debug))?;

    let Some(result) = session.result.as_ref() else {
        return Err(HtmlError::new(VibeError::NoResult, state.config.debug));
    };

    if result.granted {
        return Ok(Html(templates::access_granted_page(&result.message)));
    }

    let retry = (!session.state().is_terminal()).then(|| RetryForm {
        session_id: &session.id,
        challenge: &session.challenge,
        attempts_remaining: session.attempts_remaining(),
    });

    Ok(Html(templates::access_denied_page(&result.message, retry)))
}
