//! A single LLM provider: one backend plus its ordered model list

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::anthropic::{AnthropicBackend, DEFAULT_ANTHROPIC_BASE_URL};
use super::google::{DEFAULT_GOOGLE_BASE_URL, GoogleBackend};
use super::types::{
    BackendError, CompletionBackend, CompletionResult, GenerationError, ModelAttemptFailed,
    ProviderExhausted,
};

pub const GOOGLE_PROVIDER_NAME: &str = "Google Gemini";
pub const ANTHROPIC_PROVIDER_NAME: &str = "Anthropic Claude";

pub const DEFAULT_GOOGLE_MODELS: &[&str] = &["gemini-2.5-pro", "gemini-2.5-flash"];
pub const DEFAULT_ANTHROPIC_MODELS: &[&str] = &["claude-sonnet-4-5", "claude-3-5-haiku-latest"];

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Connection settings for one backend
#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Models in trial order, most preferred first
    pub models: Vec<String>,
    pub base_url: String,
    pub max_tokens: u32,
}

impl BackendSettings {
    pub fn google_defaults() -> Self {
        Self {
            models: DEFAULT_GOOGLE_MODELS.iter().map(ToString::to_string).collect(),
            base_url: DEFAULT_GOOGLE_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    pub fn anthropic_defaults() -> Self {
        Self {
            models: DEFAULT_ANTHROPIC_MODELS.iter().map(ToString::to_string).collect(),
            base_url: DEFAULT_ANTHROPIC_BASE_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Trim whitespace and strip quote characters from a raw API key
pub fn normalize_api_key(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\''))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Adapter around one backend that tries each of its models in order
pub struct Provider {
    name: String,
    models: Vec<String>,
    backend: Arc<dyn CompletionBackend>,
    attempt_timeout: Duration,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("backend", &self.backend.backend_name())
            .field("models", &self.models)
            .field("attempt_timeout", &self.attempt_timeout)
            .finish()
    }
}

impl Provider {
    /// Build a provider; blank model entries are dropped and at least one must remain
    pub fn new(
        name: impl Into<String>,
        models: Vec<String>,
        backend: Arc<dyn CompletionBackend>,
    ) -> Result<Self, GenerationError> {
        let name = name.into();
        let models: Vec<String> = models
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if models.is_empty() {
            return Err(GenerationError::InvalidProvider {
                message: format!("provider '{name}' has no models configured"),
            });
        }

        Ok(Self {
            name,
            models,
            backend,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        })
    }

    /// Bound every model attempt by `timeout`
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn google(
        api_key: &str,
        settings: &BackendSettings,
        attempt_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let backend = GoogleBackend::new(
            normalize_api_key(api_key),
            settings.base_url.clone(),
            settings.max_tokens,
            attempt_timeout,
        )
        .map_err(invalid_backend)?;
        Ok(Self::new(GOOGLE_PROVIDER_NAME, settings.models.clone(), Arc::new(backend))?
            .with_attempt_timeout(attempt_timeout))
    }

    pub fn anthropic(
        api_key: &str,
        settings: &BackendSettings,
        attempt_timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let backend = AnthropicBackend::new(
            normalize_api_key(api_key),
            settings.base_url.clone(),
            settings.max_tokens,
            attempt_timeout,
        )
        .map_err(invalid_backend)?;
        Ok(
            Self::new(ANTHROPIC_PROVIDER_NAME, settings.models.clone(), Arc::new(backend))?
                .with_attempt_timeout(attempt_timeout),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Try each model once, in order, returning the first non-empty completion
    pub async fn generate_content(
        &self,
        prompt: &str,
    ) -> Result<CompletionResult, ProviderExhausted> {
        let mut attempts = Vec::with_capacity(self.models.len());

        for (idx, model) in self.models.iter().enumerate() {
            debug!(
                "Trying {} model {} ({}/{})",
                self.name,
                model,
                idx + 1,
                self.models.len()
            );

            let outcome = match tokio::time::timeout(
                self.attempt_timeout,
                self.backend.complete(model, prompt),
            )
            .await
            {
                Ok(Ok(text)) if text.trim().is_empty() => Err(BackendError::EmptyResponse),
                Ok(result) => result,
                Err(_) => Err(BackendError::Timeout),
            };

            match outcome {
                Ok(text) => {
                    return Ok(CompletionResult {
                        text,
                        model: model.clone(),
                    });
                }
                Err(error) => {
                    warn!("{} model {} failed: {}", self.name, model, error);
                    attempts.push(ModelAttemptFailed {
                        model: model.clone(),
                        error,
                    });
                }
            }
        }

        Err(ProviderExhausted {
            provider: self.name.clone(),
            attempts,
        })
    }
}

fn invalid_backend(error: BackendError) -> GenerationError {
    GenerationError::InvalidProvider {
        message: error.to_string(),
    }
}
