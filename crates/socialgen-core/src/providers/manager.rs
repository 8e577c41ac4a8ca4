//! Provider manager with ordered failover across providers and their models

use std::time::Duration;
use tracing::{debug, info, warn};

use super::provider::{BackendSettings, DEFAULT_ATTEMPT_TIMEOUT, Provider, normalize_api_key};
use super::types::{CompletionResult, FailureRecord, GenerationError};

/// API keys for the supported backends; absent or blank keys are skipped
#[derive(Clone, Default)]
pub struct Credentials {
    pub google_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &self.google_api_key.as_ref().map(|_| "***"))
            .field(
                "anthropic_api_key",
                &self.anthropic_api_key.as_ref().map(|_| "***"),
            )
            .finish()
    }
}

/// Per-backend settings plus the per-attempt timeout
#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub google: BackendSettings,
    pub anthropic: BackendSettings,
    pub attempt_timeout: Duration,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self {
            google: BackendSettings::google_defaults(),
            anthropic: BackendSettings::anthropic_defaults(),
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

/// Outcome of a successful `generate_content` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub result: CompletionResult,
    /// Providers exhausted before `result` was produced
    pub failures: Vec<FailureRecord>,
}

impl Generation {
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    pub fn into_result(self) -> CompletionResult {
        self.result
    }
}

/// Tries providers in registration order until one produces a completion
#[derive(Debug)]
pub struct ProviderManager {
    /// Providers in failover order (index 0 = primary)
    providers: Vec<Provider>,
}

impl ProviderManager {
    /// Register Google Gemini, then Anthropic Claude, for each key present
    pub fn from_credentials(
        credentials: &Credentials,
        settings: &ManagerSettings,
    ) -> Result<Self, GenerationError> {
        let mut providers = Vec::new();

        if let Some(key) = present_key(&credentials.google_api_key) {
            providers.push(Provider::google(
                &key,
                &settings.google,
                settings.attempt_timeout,
            )?);
        }
        if let Some(key) = present_key(&credentials.anthropic_api_key) {
            providers.push(Provider::anthropic(
                &key,
                &settings.anthropic,
                settings.attempt_timeout,
            )?);
        }

        Self::with_providers(providers)
    }

    /// Use pre-built providers in the given order
    pub fn with_providers(providers: Vec<Provider>) -> Result<Self, GenerationError> {
        if providers.is_empty() {
            return Err(GenerationError::NoProvidersConfigured);
        }
        debug!(
            "Provider manager configured with: {}",
            providers
                .iter()
                .map(Provider::name)
                .collect::<Vec<_>>()
                .join(", ")
        );
        Ok(Self { providers })
    }

    /// Generate a completion, failing over provider by provider
    ///
    /// The failure log starts empty on every call and is returned inside the
    /// `Generation` or the `AllProvidersFailed` error, never stored here.
    pub async fn generate_content(&self, prompt: &str) -> Result<Generation, GenerationError> {
        let mut failures = Vec::new();

        for (idx, provider) in self.providers.iter().enumerate() {
            match provider.generate_content(prompt).await {
                Ok(result) => {
                    if idx > 0 {
                        info!(
                            "Request served by failover provider {} ({})",
                            provider.name(),
                            result.model
                        );
                    }
                    return Ok(Generation { result, failures });
                }
                Err(exhausted) => {
                    warn!("{}", exhausted);
                    failures.push(FailureRecord::from(&exhausted));

                    if let Some(next) = self.providers.get(idx + 1) {
                        info!("Failing over from {} to {}", provider.name(), next.name());
                    }
                }
            }
        }

        Err(GenerationError::AllProvidersFailed { failures })
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(Provider::name).collect()
    }

    /// Number of configured providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }
}

fn present_key(raw: &Option<String>) -> Option<String> {
    raw.as_deref()
        .map(normalize_api_key)
        .filter(|key| !key.is_empty())
}
