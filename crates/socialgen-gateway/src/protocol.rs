//! JSON bodies exchanged over the HTTP API

use serde::{Deserialize, Serialize};
use socialgen_core::{FailureRecord, GeneratedContent, PromptOptions};

/// Client → Gateway generation request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Missing is treated like empty and rejected during validation
    #[serde(default)]
    pub transcript: String,
    #[serde(rename = "type", default = "default_content_type")]
    pub content_type: String,
    #[serde(default)]
    pub video_duration: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_content_type() -> String {
    "youtube".to_string()
}

impl GenerateRequest {
    /// Prompt options with an already normalized video duration
    pub fn prompt_options(&self, video_duration: Option<String>) -> PromptOptions {
        PromptOptions {
            video_duration,
            keywords: self.keywords.clone(),
        }
    }
}

/// Gateway → Client successful generation
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(flatten)]
    pub content: GeneratedContent,
    pub transcript_cleaned: bool,
    pub model_used: String,
}

/// Error body for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    /// Per-provider breakdown when every provider failed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FailureRecord>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Vec::new(),
        }
    }
}
