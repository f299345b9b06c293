//! OpenAI-compatible chat completions client.
//!
//! Works against the OpenAI API itself and anything speaking its dialect,
//! LiteLLM proxies included.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};

use super::{CompletionClient, LlmError};
use crate::config::LlmConfig;

/// Chat completions client
pub struct OpenAiClient {
    http: reqwest::Client,
    model: String,
    url: String,
    api_key: Option<String>,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        for (name, value) in &config.custom_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid custom header name: {}", name))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for custom header {}", name))?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        let (base, key) = config.endpoint();

        Ok(Self {
            http,
            model: config.model.clone(),
            url: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key: key.map(str::to_string),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let mut req = self.http.post(&self.url).json(&body);
        if let Some(ref key) = self.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.send().await.map_err(transport_error)?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(classify_status(status, &text));
        }

        let parsed: ChatResponse = resp.json().await.map_err(transport_error)?;
        extract_reply(parsed)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn transport_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout(err.to_string())
    } else {
        LlmError::Unexpected(err.to_string())
    }
}

/// Map a non-2xx provider response onto the error taxonomy
fn classify_status(status: StatusCode, body: &str) -> LlmError {
    let detail = format!("provider returned {}: {}", status, body.trim());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Auth(detail),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => LlmError::Timeout(detail),
        _ => {
            let lower = body.to_lowercase();
            if lower.contains("api key") || lower.contains("api_key") || lower.contains("auth") {
                LlmError::Auth(detail)
            } else {
                LlmError::Unexpected(detail)
            }
        }
    }
}

fn extract_reply(resp: ChatResponse) -> Result<String, LlmError> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| LlmError::Unexpected("provider returned an empty completion".to_string()))
}

// --- API types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap as AxumHeaders, routing::post};
    use std::time::Duration;

    /// Serve `router` on an ephemeral port, returning its base URL
    async fn spawn_provider(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn config_for(base: String) -> LlmConfig {
        LlmConfig {
            model: "test-model".to_string(),
            api_base: base,
            api_key: Some("sk-test".to_string()),
            timeout_secs: 1,
            ..Default::default()
        }
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED, "nope"),
            LlmError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, r#"{"error":"Invalid API key"}"#),
            LlmError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::GATEWAY_TIMEOUT, ""),
            LlmError::Timeout(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR, "overloaded"),
            LlmError::Unexpected(_)
        ));
    }

    #[test]
    fn test_empty_completion_is_unexpected() {
        let resp: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(extract_reply(resp), Err(LlmError::Unexpected(_))));

        let resp: ChatResponse =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(extract_reply(resp).is_err());
    }

    #[tokio::test]
    async fn test_complete_round_trip() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: AxumHeaders, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(headers.get("authorization").unwrap(), "Bearer sk-test");
                assert_eq!(headers.get("x-team").unwrap(), "vibes");
                assert_eq!(body["model"], "test-model");
                assert_eq!(body["messages"][0]["role"], "user");
                let prompt = body["messages"][0]["content"].as_str().unwrap().to_string();
                Json(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": format!("echo: {}", prompt)}}]
                }))
            }),
        );
        let base = spawn_provider(router).await;

        let mut config = config_for(base);
        config
            .custom_headers
            .insert("X-Team".to_string(), "vibes".to_string());
        let client = OpenAiClient::new(&config).unwrap();

        let reply = client.complete("hello").await.unwrap();
        assert_eq!(reply, "echo: hello");
        assert_eq!(client.model(), "test-model");
    }

    #[tokio::test]
    async fn test_unauthorized_maps_to_auth() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (axum::http::StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let client = OpenAiClient::new(&config_for(spawn_provider(router).await)).unwrap();

        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Auth(_)));
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "too late"
            }),
        );
        let client = OpenAiClient::new(&config_for(spawn_provider(router).await)).unwrap();

        let err = client.complete("hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout(_)));
    }

    #[test]
    fn test_invalid_custom_header_rejected() {
        let mut config = config_for("http://localhost".to_string());
        config
            .custom_headers
            .insert("bad header".to_string(), "x".to_string());
        assert!(OpenAiClient::new(&config).is_err());
    }
}
