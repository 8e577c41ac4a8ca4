//! socialgen-core - content generation with multi-provider LLM failover
//!
//! This crate provides:
//! - Google Gemini and Anthropic Claude completion backends
//! - Providers that try their own models in order, and a manager that fails
//!   over between providers with a per-call failure log
//! - Transcript cleanup, per-platform prompts and response section parsing

pub mod parsing;
pub mod prompts;
pub mod providers;
pub mod transcript;

// Re-export main types for convenience
pub use parsing::{GeneratedContent, YoutubeContent, parse_response};
pub use prompts::{Platform, PromptOptions, build_prompt};
pub use providers::{
    BackendError, BackendSettings, CompletionBackend, CompletionResult, Credentials,
    FailureRecord, Generation, GenerationError, ManagerSettings, Provider, ProviderManager,
};
pub use transcript::{
    InputError, PreparedTranscript, normalize_video_duration, prepare_transcript,
    validate_video_duration,
};
