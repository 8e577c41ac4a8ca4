//! Multi-provider text generation with ordered failover
//!
//! Each [`Provider`] wraps one [`CompletionBackend`] (Google Gemini or
//! Anthropic Claude) and its ordered model list. [`ProviderManager`] tries the
//! providers in registration order and returns the first non-empty completion.

pub mod anthropic;
pub mod google;
pub mod manager;
pub mod provider;
pub mod types;

#[cfg(test)]
mod testing;

pub use manager::{Credentials, Generation, ManagerSettings, ProviderManager};
pub use provider::{BackendSettings, Provider, normalize_api_key};
pub use types::{
    BackendError, CompletionBackend, CompletionResult, FailureRecord, GenerationError,
    ModelAttemptFailed, ProviderExhausted,
};
