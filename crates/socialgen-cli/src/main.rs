use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use socialgen_core::{
    GenerationError, Platform, PromptOptions, ProviderManager, build_prompt,
    normalize_video_duration, parse_response, prepare_transcript,
};
use socialgen_gateway::GatewayServer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;

use config::SocialgenConfig;

#[derive(Parser)]
#[command(name = "socialgen")]
#[command(version)]
#[command(about = "socialgen: social media content from speech transcripts")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory and default config
    Init,

    /// Show current configuration (API keys masked)
    Config,

    /// Generate content for one transcript and print it as JSON
    Generate {
        /// youtube, linkedin, twitter, instagram, tiktok or keywords
        #[arg(short = 't', long = "type", default_value = "youtube")]
        content_type: String,

        /// Video length (m:ss or h:mm:ss); adds YouTube timestamps
        #[arg(long)]
        duration: Option<String>,

        /// Keyword to feature prominently (repeatable)
        #[arg(short, long = "keyword")]
        keywords: Vec<String>,

        /// Transcript file, or "-" for stdin
        input: PathBuf,
    },

    /// Serve the HTTP API
    Serve {
        /// Address to listen on (overrides [gateway] bind)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config).await,
        Commands::Generate {
            content_type,
            duration,
            keywords,
            input,
        } => cmd_generate(&cli.config, &content_type, duration, keywords, &input).await,
        Commands::Serve { bind } => cmd_serve(&cli.config, bind).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config::default_config_path();
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
    } else {
        let default_config = include_str!("../../../config/default.toml");
        tokio::fs::write(&config_path, default_config).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600))
                .await?;
        }
        info!("Created default config at {}", config_path.display());
    }

    println!("socialgen initialized at {}", config_dir.display());
    println!(
        "Set {} and/or {} or edit {} to configure your API keys.",
        config::GOOGLE_API_KEY_ENV,
        config::ANTHROPIC_API_KEY_ENV,
        config_path.display()
    );
    Ok(())
}

async fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SocialgenConfig::load(config_path)?;
    println!("{}", toml::to_string_pretty(&cfg.masked())?);

    let creds = cfg.credentials();
    let configured: Vec<&str> = [
        ("Google Gemini", creds.google_api_key.is_some()),
        ("Anthropic Claude", creds.anthropic_api_key.is_some()),
    ]
    .into_iter()
    .filter_map(|(name, present)| present.then_some(name))
    .collect();
    println!("# providers with credentials: {}", configured.join(", "));
    Ok(())
}

fn build_manager(cfg: &SocialgenConfig) -> Result<ProviderManager> {
    let manager = ProviderManager::from_credentials(&cfg.credentials(), &cfg.manager_settings())
        .with_context(|| {
            format!(
                "Set {} or {} (or api_key in the config file)",
                config::GOOGLE_API_KEY_ENV,
                config::ANTHROPIC_API_KEY_ENV
            )
        })?;
    info!("Providers: {}", manager.provider_names().join(" -> "));
    Ok(manager)
}

async fn read_transcript(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read transcript from stdin")?;
        Ok(buf)
    } else {
        tokio::fs::read_to_string(input)
            .await
            .with_context(|| format!("Failed to read transcript {}", input.display()))
    }
}

/// Parse the content type and validate options before any file or network work
fn generation_options(
    content_type: &str,
    duration: Option<String>,
    keywords: Vec<String>,
) -> Result<(Platform, PromptOptions)> {
    let platform: Platform = content_type.parse()?;
    let options = PromptOptions {
        video_duration: normalize_video_duration(duration.as_deref())?,
        keywords,
    };
    Ok((platform, options))
}

async fn cmd_generate(
    config_path: &Option<PathBuf>,
    content_type: &str,
    duration: Option<String>,
    keywords: Vec<String>,
    input: &Path,
) -> Result<()> {
    let (platform, options) = generation_options(content_type, duration, keywords)?;

    let raw = read_transcript(input).await?;
    let prepared = prepare_transcript(&raw)?;
    if prepared.cleaned {
        info!("Removed a trailing single-character word from the transcript");
    }

    let cfg = SocialgenConfig::load(config_path)?;
    let manager = build_manager(&cfg)?;

    let prompt = build_prompt(platform, &prepared.text, &options);

    let generation = match manager.generate_content(&prompt).await {
        Ok(generation) => generation,
        Err(e @ GenerationError::AllProvidersFailed { .. }) => {
            eprintln!("All providers failed:");
            for failure in e.failures() {
                eprintln!("  - {}", failure);
            }
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };

    for failure in generation.failures() {
        warn!("Skipped {}", failure);
    }

    let result = generation.into_result();
    let content = parse_response(platform, &result.text);
    if content.is_empty() {
        warn!("Model reply contained none of the expected sections");
    }

    let output = serde_json::json!({
        "content": content,
        "transcriptCleaned": prepared.cleaned,
        "modelUsed": result.model,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn cmd_serve(config_path: &Option<PathBuf>, bind: Option<String>) -> Result<()> {
    let mut cfg = SocialgenConfig::load(config_path)?;
    if let Some(bind) = bind {
        cfg.gateway.bind = bind;
    }
    let addr = cfg.gateway_bind()?;
    let manager = Arc::new(build_manager(&cfg)?);

    let cancel = CancellationToken::new();
    let server = GatewayServer::new(addr, manager);
    let handle = server.spawn(cancel.clone());

    // Wait for shutdown signal
    signal::ctrl_c().await?;
    info!("Shutting down...");
    cancel.cancel();

    handle.await.context("Gateway task panicked")??;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_generate_args() {
        let cli = Cli::try_parse_from([
            "socialgen",
            "--debug",
            "generate",
            "--type",
            "linkedin",
            "-k",
            "Rust",
            "--keyword",
            "Testing",
            "talk.txt",
        ])
        .unwrap();

        assert!(cli.debug);
        match cli.command {
            Commands::Generate {
                content_type,
                duration,
                keywords,
                input,
            } => {
                assert_eq!(content_type, "linkedin");
                assert!(duration.is_none());
                assert_eq!(keywords, vec!["Rust", "Testing"]);
                assert_eq!(input, PathBuf::from("talk.txt"));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_parse_serve_with_global_config() {
        let cli = Cli::try_parse_from(["socialgen", "serve", "--bind", "0.0.0.0:9000", "-c", "x.toml"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Serve { bind: Some(b) } if b == "0.0.0.0:9000"));
    }

    #[test]
    fn test_build_manager_uses_configured_key() {
        let mut cfg = SocialgenConfig::default();
        cfg.providers.google.api_key = "AIza-test-key".to_string();
        let manager = build_manager(&cfg).unwrap();
        assert_eq!(manager.provider_names()[0], "Google Gemini");
    }

    #[test]
    fn test_generation_options_ignore_blank_duration() {
        let (platform, options) =
            generation_options("youtube", Some("  ".to_string()), Vec::new()).unwrap();
        assert_eq!(platform, Platform::Youtube);
        assert!(options.video_duration.is_none());

        let (_, options) = generation_options("youtube", Some(" 4:30".to_string()), Vec::new()).unwrap();
        assert_eq!(options.video_duration.as_deref(), Some("4:30"));

        assert!(generation_options("youtube", Some("5".to_string()), Vec::new()).is_err());
        assert!(generation_options("myspace", None, Vec::new()).is_err());
    }

    #[tokio::test]
    async fn test_read_transcript_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("talk.txt");
        std::fs::write(&path, "hallo zusammen").unwrap();
        assert_eq!(read_transcript(&path).await.unwrap(), "hallo zusammen");
    }
}
