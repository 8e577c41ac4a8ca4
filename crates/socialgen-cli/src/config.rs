use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use socialgen_core::providers::provider::{
    DEFAULT_ANTHROPIC_MODELS, DEFAULT_ATTEMPT_TIMEOUT, DEFAULT_GOOGLE_MODELS, DEFAULT_MAX_TOKENS,
};
use socialgen_core::providers::anthropic::DEFAULT_ANTHROPIC_BASE_URL;
use socialgen_core::providers::google::DEFAULT_GOOGLE_BASE_URL;
use socialgen_core::{BackendSettings, Credentials, ManagerSettings};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_GEMINI_API_KEY";
pub const ANTHROPIC_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialgenConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub google: GoogleProviderConfig,
    #[serde(default)]
    pub anthropic: AnthropicConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleProviderConfig {
    #[serde(default)]
    pub api_key: String,
    /// Tried in order, most preferred first
    #[serde(default = "default_google_models")]
    pub models: Vec<String>,
    #[serde(default = "default_google_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for GoogleProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProviderConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("models", &self.models)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for GoogleProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            models: default_google_models(),
            base_url: default_google_base_url(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_google_models() -> Vec<String> {
    DEFAULT_GOOGLE_MODELS.iter().map(ToString::to_string).collect()
}
fn default_google_base_url() -> String {
    DEFAULT_GOOGLE_BASE_URL.to_string()
}

#[derive(Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_anthropic_models")]
    pub models: Vec<String>,
    #[serde(default = "default_anthropic_base_url")]
    pub base_url: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &mask_secret(&self.api_key))
            .field("models", &self.models)
            .field("base_url", &self.base_url)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            models: default_anthropic_models(),
            base_url: default_anthropic_base_url(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_anthropic_models() -> Vec<String> {
    DEFAULT_ANTHROPIC_MODELS.iter().map(ToString::to_string).collect()
}
fn default_anthropic_base_url() -> String {
    DEFAULT_ANTHROPIC_BASE_URL.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Upper bound for a single model attempt
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_attempt_timeout_secs() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT.as_secs()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_bind() -> String {
    "127.0.0.1:4321".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: default_gateway_bind(),
        }
    }
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for keys longer than 7 chars, otherwise "***".
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".socialgen")
}

pub fn default_config_path() -> PathBuf {
    config_dir().join("config.toml")
}

impl SocialgenConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path.clone().unwrap_or_else(default_config_path);
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        // Refuse files other users could read; they hold API keys
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Ok(metadata) = std::fs::metadata(path) {
                let mode = metadata.permissions().mode();
                if mode & 0o077 != 0 {
                    return Err(anyhow::anyhow!(
                        "Config file {:?} has overly permissive permissions ({:o}). \
                         It may contain secrets. Fix with: chmod 600 {:?}",
                        path,
                        mode & 0o777,
                        path
                    ));
                }
            }
        }

        let content = std::fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read config at {}. Run `socialgen init` first.",
                path.display()
            )
        })?;

        let config = Self::parse(&content)
            .with_context(|| format!("Failed to parse config at {}", path.display()))?;

        for (name, key, env) in [
            ("Google", &config.providers.google.api_key, GOOGLE_API_KEY_ENV),
            ("Anthropic", &config.providers.anthropic.api_key, ANTHROPIC_API_KEY_ENV),
        ] {
            if !key.is_empty() && !content.contains(&format!("${{{env}}}")) {
                warn!(
                    "{} API key is hardcoded in config file. For security, use environment variables: api_key = \"${{{}}}\"",
                    name, env
                );
            }
        }

        Ok(config)
    }

    /// Parse TOML after expanding allow-listed `${VAR}` references
    pub fn parse(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content, |name| std::env::var(name).ok());
        Ok(toml::from_str(&expanded)?)
    }

    /// API keys from the file, falling back to the environment for blank ones
    pub fn credentials(&self) -> Credentials {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    fn credentials_with(&self, env: impl Fn(&str) -> Option<String>) -> Credentials {
        let pick = |configured: &str, var: &str| {
            if configured.trim().is_empty() {
                env(var).filter(|v| !v.trim().is_empty())
            } else {
                Some(configured.to_string())
            }
        };
        Credentials {
            google_api_key: pick(&self.providers.google.api_key, GOOGLE_API_KEY_ENV),
            anthropic_api_key: pick(&self.providers.anthropic.api_key, ANTHROPIC_API_KEY_ENV),
        }
    }

    pub fn manager_settings(&self) -> ManagerSettings {
        let google = &self.providers.google;
        let anthropic = &self.providers.anthropic;
        ManagerSettings {
            google: BackendSettings {
                models: google.models.clone(),
                base_url: google.base_url.clone(),
                max_tokens: google.max_tokens,
            },
            anthropic: BackendSettings {
                models: anthropic.models.clone(),
                base_url: anthropic.base_url.clone(),
                max_tokens: anthropic.max_tokens,
            },
            attempt_timeout: Duration::from_secs(self.generation.attempt_timeout_secs.max(1)),
        }
    }

    pub fn gateway_bind(&self) -> Result<SocketAddr> {
        self.gateway
            .bind
            .parse()
            .with_context(|| format!("Invalid gateway bind address '{}'", self.gateway.bind))
    }

    /// Copy with API keys masked, for display
    pub fn masked(&self) -> Self {
        let mut copy = self.clone();
        copy.providers.google.api_key = mask_secret(&copy.providers.google.api_key);
        copy.providers.anthropic.api_key = mask_secret(&copy.providers.anthropic.api_key);
        copy
    }
}

/// Allowlist of environment variable names that may be expanded in config files.
/// This prevents an attacker who can modify the config from reading arbitrary env vars.
const ALLOWED_ENV_VARS: &[&str] = &[GOOGLE_API_KEY_ENV, ANTHROPIC_API_KEY_ENV, "HOME", "USER"];

fn expand_env_vars(s: &str, env: impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        let Some(start) = result[pos..].find("${") else {
            break;
        };
        let abs_start = pos + start;
        let Some(end) = result[abs_start..].find('}') else {
            break;
        };
        let var_name = result[abs_start + 2..abs_start + end].to_string();

        if !ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
            warn!(
                "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                var_name
            );
            // Leave the ${VAR} unexpanded so it's obvious
            pos = abs_start + end + 1;
            continue;
        }

        let value = env(&var_name).unwrap_or_default();
        result = format!(
            "{}{}{}",
            &result[..abs_start],
            value,
            &result[abs_start + end + 1..]
        );
        pos = abs_start + value.len();
    }
    result
}
