//! HTTP route handlers for Bouncer.

use axum::{
    Router,
    http::{HeaderMap, Method, StatusCode, header},
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use vibegate_common::VibeError;
use vibegate_common::constants::paths;

use crate::html::truncate_for_log;
use crate::ratelimit::enforce_rate_limit;
use crate::state::AppState;
use crate::templates;

mod health;
mod pages;
mod vibe;

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    // Pages and form posts: the general budget, counted per route
    let general = Router::new()
        .route(paths::LANDING, get(pages::landing))
        .route(paths::SIGNIN_MODAL, post(vibe::signin_modal))
        .route(paths::CHECK_VIBE, post(vibe::check_vibe))
        .route_layer(middleware::from_fn_with_state(
            state.general_limiter.clone(),
            enforce_rate_limit,
        ));

    let results = Router::new()
        .route("/auth-result/{session_id}", get(pages::auth_result))
        .route_layer(middleware::from_fn_with_state(
            state.result_limiter.clone(),
            enforce_rate_limit,
        ));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .route(paths::HEALTH, get(health::health_check))
        .merge(general)
        .merge(results)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A flow error rendered as an HTML fragment with its fixed status
#[derive(Debug)]
pub struct HtmlError {
    error: VibeError,
    debug: bool,
}

impl HtmlError {
    pub fn new(error: VibeError, debug: bool) -> Self {
        Self { error, debug }
    }
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        // Provider failures are logged where they happen
        if !self.error.is_llm_failure() {
            tracing::debug!(status = status.as_u16(), error = %self.error, "Request rejected");
        }
        let body = templates::error_fragment(&self.error.user_message(self.debug));
        (status, Html(body)).into_response()
    }
}

/// Debug-level request log, user agent truncated
fn log_request(endpoint: &str, headers: &HeaderMap) {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    tracing::debug!(
        endpoint,
        user_agent = %truncate_for_log(user_agent, 100),
        "Request"
    );
}
