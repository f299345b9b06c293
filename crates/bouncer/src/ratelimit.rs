//! Per-client fixed-window rate limiting.

use axum::{
    extract::{ConnectInfo, MatchedPath, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use vibegate_common::VibeError;

use crate::routes::HtmlError;

/// Windows kept before stale ones are pruned
const PRUNE_THRESHOLD: usize = 10_000;

struct Window {
    started: Instant,
    count: u32,
}

/// Counts requests per client key in fixed windows
pub struct RateLimiter {
    /// Bucket name, for logs
    name: &'static str,
    max_requests: u32,
    window: Duration,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(name: &'static str, max_requests: u32, window: Duration) -> Self {
        Self {
            name,
            max_requests,
            window,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Requests per minute
    pub fn per_minute(name: &'static str, max_requests: u32) -> Self {
        Self::new(name, max_requests, Duration::from_secs(60))
    }

    /// Count one request for `client`.
    ///
    /// Returns (allowed, remaining).
    pub async fn check(&self, client: &str) -> (bool, u32) {
        let mut windows = self.windows.lock().await;
        let now = Instant::now();

        if windows.len() > PRUNE_THRESHOLD {
            windows.retain(|_, w| now.duration_since(w.started) < self.window);
        }

        let entry = windows.entry(client.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });

        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.count = 0;
        }

        entry.count = entry.count.saturating_add(1);

        let allowed = entry.count <= self.max_requests;
        let remaining = self.max_requests.saturating_sub(entry.count);

        (allowed, remaining)
    }
}

/// Best-effort client address: socket peer, then `X-Forwarded-For`
pub fn client_ip(req: &Request) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    forwarded_for(req.headers()).unwrap_or_else(|| "unknown".to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
}

/// Budget key: client address plus the matched route template.
///
/// Each route gets its own budget, and `/auth-result/{session_id}` shares one
/// budget across all session ids.
pub fn rate_limit_key(req: &Request) -> String {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str())
        .unwrap_or_else(|| req.uri().path());
    format!("{} {}", client_ip(req), route)
}

/// Middleware: reject with 429 once the client's budget is spent
pub async fn enforce_rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request,
    next: Next,
) -> Response {
    let key = rate_limit_key(&req);
    let (allowed, remaining) = limiter.check(&key).await;

    if !allowed {
        tracing::warn!(
            bucket = limiter.name,
            key = %key,
            path = %req.uri().path(),
            "Rate limit exceeded"
        );
        return HtmlError::new(VibeError::RateLimited, false).into_response();
    }

    tracing::trace!(bucket = limiter.name, key = %key, remaining, "Rate limit ok");
    next.run(req).await
}
