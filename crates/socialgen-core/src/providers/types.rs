//! Provider-agnostic types shared by every completion backend

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Successful outcome of one generation attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionResult {
    pub text: String,
    /// Model that produced `text`; telemetry only
    pub model: String,
}

/// Why a single backend call failed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("rate limited (HTTP 429)")]
    RateLimited,
    #[error("authentication failed (HTTP {status})")]
    Auth { status: u16 },
    #[error("response blocked by content filter: {reason}")]
    Blocked { reason: String },
    #[error("backend returned an empty response")]
    EmptyResponse,
    #[error("backend returned an invalid response: {message}")]
    InvalidResponse { message: String },
    #[error("transport error: {message}")]
    Transport { message: String },
    #[error("request timed out")]
    Timeout,
}

impl BackendError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Numeric status code, when the failure carried one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::Auth { status } => Some(*status),
            Self::RateLimited => Some(429),
            _ => None,
        }
    }

    /// Map a non-success HTTP status plus its body to an error
    ///
    /// Upstream 408/504 stay `Http` so the numeric code survives into failure
    /// records; `Timeout` is reserved for the local attempt deadline.
    pub fn from_status(status: reqwest::StatusCode, message: String) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Auth {
                status: status.as_u16(),
            },
            429 => Self::RateLimited,
            code => Self::Http {
                status: code,
                message,
            },
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::invalid_response(e.to_string())
        } else {
            Self::Transport {
                message: e.to_string(),
            }
        }
    }
}

/// One model of a provider failed; recorded, never surfaced on its own
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{model}: {error}")]
pub struct ModelAttemptFailed {
    pub model: String,
    pub error: BackendError,
}

/// Every model of one provider failed, in trial order
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} failed: {}", summarize_attempts(.attempts))]
pub struct ProviderExhausted {
    pub provider: String,
    pub attempts: Vec<ModelAttemptFailed>,
}

impl ProviderExhausted {
    /// Status code of the last attempt that carried one
    pub fn status(&self) -> Option<u16> {
        self.attempts.iter().rev().find_map(|a| a.error.status())
    }

    /// One-line reason listing each model's failure
    pub fn summary(&self) -> String {
        summarize_attempts(&self.attempts)
    }
}

/// One exhausted provider in a call's failure log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub provider: String,
    pub message: String,
    pub status: Option<u16>,
}

impl From<&ProviderExhausted> for FailureRecord {
    fn from(exhausted: &ProviderExhausted) -> Self {
        Self {
            provider: exhausted.provider.clone(),
            message: exhausted.summary(),
            status: exhausted.status(),
        }
    }
}

impl std::fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} [{}]: {}", self.provider, status, self.message),
            None => write!(f, "{}: {}", self.provider, self.message),
        }
    }
}

/// Errors surfaced by the provider manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("no API keys provided for AI providers")]
    NoProvidersConfigured,
    #[error("invalid provider configuration: {message}")]
    InvalidProvider { message: String },
    #[error("all AI providers failed: {}", summarize_failures(.failures))]
    AllProvidersFailed { failures: Vec<FailureRecord> },
}

impl GenerationError {
    /// Failure log of the call that produced this error
    pub fn failures(&self) -> &[FailureRecord] {
        match self {
            Self::AllProvidersFailed { failures } => failures,
            _ => &[],
        }
    }
}

fn summarize_failures(failures: &[FailureRecord]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn summarize_attempts(attempts: &[ModelAttemptFailed]) -> String {
    if attempts.is_empty() {
        return "no models attempted".to_string();
    }
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Wire-level client for one vendor's text-generation API
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Vendor name used in logs (e.g. "google", "anthropic")
    fn backend_name(&self) -> &str;

    /// Generate a completion for `prompt` using `model`
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, BackendError>;
}
