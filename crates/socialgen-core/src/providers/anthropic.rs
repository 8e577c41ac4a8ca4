//! Anthropic Claude backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::types::{BackendError, CompletionBackend};

pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AnthropicBackend {
    pub fn new(
        api_key: String,
        base_url: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url,
            max_tokens,
        })
    }

    fn build_request<'a>(&self, model: &'a str, prompt: &'a str) -> AnthropicRequest<'a> {
        AnthropicRequest {
            model,
            max_tokens: self.max_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        }
    }

    /// Concatenate the text blocks of a response
    fn extract_text(resp: AnthropicApiResponse) -> Result<String, BackendError> {
        let text: String = resp
            .content
            .into_iter()
            .filter_map(|block| match block {
                AnthropicBlock::Text { text } => Some(text),
                AnthropicBlock::Other => None,
            })
            .collect();

        if text.trim().is_empty() {
            return match resp.stop_reason.as_deref() {
                Some("refusal") => Err(BackendError::Blocked {
                    reason: "refusal".to_string(),
                }),
                _ => Err(BackendError::EmptyResponse),
            };
        }

        Ok(text)
    }
}

#[async_trait]
impl CompletionBackend for AnthropicBackend {
    fn backend_name(&self) -> &str {
        "anthropic"
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        debug!("Anthropic request: model={}, prompt_len={}", model, prompt.len());

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&self.build_request(model, prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = match serde_json::from_str::<AnthropicErrorEnvelope>(&error_text) {
                Ok(envelope) => format!("{}: {}", envelope.error.error_type, envelope.error.message),
                Err(_) => error_text,
            };
            return Err(BackendError::from_status(status, message));
        }

        let api_response: AnthropicApiResponse = response.json().await.map_err(|e| {
            BackendError::invalid_response(format!("Anthropic decode failed: {e}"))
        })?;

        debug!(
            "Anthropic response: blocks={}, stop_reason={:?}",
            api_response.content.len(),
            api_response.stop_reason
        );

        Self::extract_text(api_response)
    }
}

// ── Anthropic wire types ──

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct AnthropicApiResponse {
    #[serde(default)]
    content: Vec<AnthropicBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorEnvelope {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> AnthropicBackend {
        AnthropicBackend::new(
            "sk-ant-secret".to_string(),
            base_url.to_string(),
            1024,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn parse(body: &str) -> AnthropicApiResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_build_request_single_user_message() {
        let b = backend(DEFAULT_ANTHROPIC_BASE_URL);
        let body = serde_json::to_value(b.build_request("claude-test", "hi")).unwrap();
        assert_eq!(body["model"], "claude-test");
        assert_eq!(body["max_tokens"], 1024);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "hi");
    }

    #[test]
    fn test_extract_text_skips_non_text_blocks() {
        let resp = parse(
            r#"{"content":[{"type":"thinking","thinking":"..."},{"type":"text","text":"Hello!"}],"stop_reason":"end_turn"}"#,
        );
        assert_eq!(AnthropicBackend::extract_text(resp).unwrap(), "Hello!");
    }

    #[test]
    fn test_extract_text_empty_content() {
        let resp = parse(r#"{"content":[],"stop_reason":"end_turn"}"#);
        assert_eq!(
            AnthropicBackend::extract_text(resp),
            Err(BackendError::EmptyResponse)
        );
    }

    #[test]
    fn test_extract_text_refusal_is_blocked() {
        let resp = parse(r#"{"content":[],"stop_reason":"refusal"}"#);
        assert!(matches!(
            AnthropicBackend::extract_text(resp),
            Err(BackendError::Blocked { .. })
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", backend(DEFAULT_ANTHROPIC_BASE_URL));
        assert!(!debug.contains("sk-ant-secret"));
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "sk-ant-secret")
            .match_header("anthropic-version", API_VERSION)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"msg_1","content":[{"type":"text","text":"LINKEDIN POST: hi"}],"stop_reason":"end_turn"}"#)
            .create_async()
            .await;

        let text = backend(&server.url())
            .complete("claude-test", "prompt")
            .await
            .unwrap();

        assert_eq!(text, "LINKEDIN POST: hi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_maps_auth_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body(r#"{"type":"error","error":{"type":"authentication_error","message":"invalid x-api-key"}}"#)
            .create_async()
            .await;

        let err = backend(&server.url())
            .complete("claude-test", "prompt")
            .await
            .unwrap_err();

        assert_eq!(err, BackendError::Auth { status: 401 });
    }

    #[tokio::test]
    async fn test_complete_maps_overloaded() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(529)
            .with_body(r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#)
            .create_async()
            .await;

        let err = backend(&server.url())
            .complete("claude-test", "prompt")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BackendError::Http {
                status: 529,
                message: "overloaded_error: Overloaded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_complete_rejects_malformed_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/messages")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let err = backend(&server.url())
            .complete("claude-test", "prompt")
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::InvalidResponse { .. }));
    }
}
