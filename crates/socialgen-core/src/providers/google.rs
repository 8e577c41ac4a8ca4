//! Google Gemini backend

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::types::{BackendError, CompletionBackend};

pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini `generateContent` client
pub struct GoogleBackend {
    client: Client,
    api_key: String,
    base_url: String,
    max_tokens: u32,
}

impl std::fmt::Debug for GoogleBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleBackend")
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GoogleBackend {
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

    fn endpoint_url(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    fn build_request(&self, prompt: &str) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.max_tokens,
            },
        }
    }

    /// Pull the generated text out of a Gemini response
    fn extract_text(resp: GeminiApiResponse) -> Result<String, BackendError> {
        if let Some(reason) = resp
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
        {
            return Err(BackendError::Blocked { reason });
        }

        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or(BackendError::EmptyResponse)?;

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return match candidate.finish_reason.as_deref() {
                Some(reason @ ("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT")) => {
                    Err(BackendError::Blocked {
                        reason: reason.to_string(),
                    })
                }
                _ => Err(BackendError::EmptyResponse),
            };
        }

        Ok(text)
    }
}

#[async_trait]
impl CompletionBackend for GoogleBackend {
    fn backend_name(&self) -> &str {
        "google"
    }

    async fn complete(&self, model: &str, prompt: &str) -> Result<String, BackendError> {
        debug!("Gemini request: model={}, prompt_len={}", model, prompt.len());

        let response = self
            .client
            .post(self.endpoint_url(model))
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<GeminiErrorEnvelope>(&error_text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(error_text);
            return Err(BackendError::from_status(status, message));
        }

        let api_response: GeminiApiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::invalid_response(format!("Gemini decode failed: {e}")))?;

        debug!("Gemini response: candidates={}", api_response.candidates.len());

        Self::extract_text(api_response)
    }
}

// ── Gemini wire types ──

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> GoogleBackend {
        GoogleBackend::new(
            "AIza-secret".to_string(),
            base_url.to_string(),
            2048,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn parse(body: &str) -> GeminiApiResponse {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_build_request_wraps_prompt() {
        let body = serde_json::to_value(backend(DEFAULT_GOOGLE_BASE_URL).build_request("hi")).unwrap();
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_endpoint_url_trims_trailing_slash() {
        let b = backend("http://localhost:1234/");
        assert_eq!(
            b.endpoint_url("gemini-2.5-pro"),
            "http://localhost:1234/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let resp = parse(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hello "},{"text":"world"}]},"finishReason":"STOP"}]}"#,
        );
        assert_eq!(GoogleBackend::extract_text(resp).unwrap(), "Hello world");
    }

    #[test]
    fn test_extract_text_no_candidates_is_empty() {
        let resp = parse(r#"{"candidates":[]}"#);
        assert_eq!(
            GoogleBackend::extract_text(resp),
            Err(BackendError::EmptyResponse)
        );
    }

    #[test]
    fn test_extract_text_prompt_blocked() {
        let resp = parse(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert_eq!(
            GoogleBackend::extract_text(resp),
            Err(BackendError::Blocked {
                reason: "SAFETY".to_string()
            })
        );
    }

    #[test]
    fn test_extract_text_safety_finish_without_text() {
        let resp = parse(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#);
        assert!(matches!(
            GoogleBackend::extract_text(resp),
            Err(BackendError::Blocked { reason }) if reason == "SAFETY"
        ));
    }

    #[test]
    fn test_debug_hides_key() {
        let debug = format!("{:?}", backend(DEFAULT_GOOGLE_BASE_URL));
        assert!(!debug.contains("AIza-secret"));
    }

    #[tokio::test]
    async fn test_complete_against_mock_server() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "AIza-secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"TITLE: ok"}]},"finishReason":"STOP"}]}"#)
            .create_async()
            .await;

        let text = backend(&server.url())
            .complete("gemini-test", "prompt")
            .await
            .unwrap();

        assert_eq!(text, "TITLE: ok");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_complete_maps_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(429)
            .with_body(r#"{"error":{"code":429,"message":"quota exceeded"}}"#)
            .create_async()
            .await;

        let err = backend(&server.url())
            .complete("gemini-test", "prompt")
            .await
            .unwrap_err();

        assert_eq!(err, BackendError::RateLimited);
    }

    #[tokio::test]
    async fn test_complete_surfaces_error_message() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(500)
            .with_body(r#"{"error":{"code":500,"message":"internal"}}"#)
            .create_async()
            .await;

        let err = backend(&server.url())
            .complete("gemini-test", "prompt")
            .await
            .unwrap_err();

        assert_eq!(
            err,
            BackendError::Http {
                status: 500,
                message: "internal".to_string()
            }
        );
    }
}
