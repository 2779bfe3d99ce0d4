//! Runtime configuration for ask-relay.
//!
//! Non-secret settings can be loaded from a JSON file or constructed
//! programmatically. The upstream API credential is environment-only: it is
//! read once at startup and the process refuses to start without it.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Environment variable holding the upstream API credential.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the listen port.
pub const PORT_ENV: &str = "PORT";

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(name = "ask-relay", about = "Ask-an-LLM web backend with SSE streaming")]
pub struct Cli {
    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Upstream chat-completion API settings.
    pub upstream: UpstreamConfig,

    /// Prompt text settings.
    pub prompt: PromptConfig,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port.
    pub port: u16,

    /// Directory holding the static browser client.
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Upstream chat-completion API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the OpenAI-compatible API.
    pub base_url: String,

    /// Model identifier, fixed for the process lifetime.
    pub model: String,

    /// Whole-request timeout for upstream calls, in seconds.
    pub request_timeout_secs: u64,

    /// API credential. Never read from the config file; populated from the
    /// environment at startup.
    #[serde(skip)]
    pub api_key: Option<SecretString>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            request_timeout_secs: 120,
            api_key: None,
        }
    }
}

/// Prompt text settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// System instruction sent with text-only questions.
    pub system: String,

    /// Question used when an image arrives without one.
    pub image_fallback_question: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system: "You are a helpful assistant. Answer clearly and concisely.".to_string(),
            image_fallback_question: "What is in this image?".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults when the
    /// file is absent, then apply environment overrides. Fails if the API
    /// credential is missing from the environment.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            serde_json::from_str(&data)
                .with_context(|| format!("failed to parse config file {}", path.display()))?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };

        config.apply_env(
            std::env::var(API_KEY_ENV).ok(),
            std::env::var(PORT_ENV).ok(),
        )?;
        Ok(config)
    }

    /// Apply environment values. The credential is mandatory; the port
    /// override is optional.
    fn apply_env(&mut self, api_key: Option<String>, port: Option<String>) -> anyhow::Result<()> {
        match api_key.filter(|key| !key.trim().is_empty()) {
            Some(key) => self.upstream.api_key = Some(SecretString::from(key)),
            None => anyhow::bail!("{API_KEY_ENV} must be set"),
        }

        if let Some(port) = port {
            self.server.port = port
                .parse()
                .with_context(|| format!("invalid {PORT_ENV} value {port:?}"))?;
        }

        Ok(())
    }
}
