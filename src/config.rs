//! TOML configuration.
//!
//! Loaded once at startup by [`load_config`], validated, and passed by
//! reference into the LLM client, extractor and pipeline constructors. Every
//! section is optional; missing keys fall back to the defaults below. The
//! LLM API key is read from the environment variable named by
//! `llm.api_key_env` and stored on [`LlmConfig::api_key`]; a missing key for
//! a hosted provider is a startup error.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::llm::RetryPolicy;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub pipeline: PipelineConfig,
    pub chunking: ChunkingConfig,
    pub extract: ExtractConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub max_upload_bytes: usize,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 25 * 1024 * 1024,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LlmConfig {
    /// `groq`, `openai` or `ollama`.
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    /// Map calls in flight at once per request.
    pub max_concurrency: usize,
    pub temperature: Option<f32>,
    /// Resolved from `api_key_env` at load time, never read from the file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "openai/gpt-oss-20b".to_string(),
            base_url: None,
            api_key_env: "GROQ_API_KEY".to_string(),
            timeout_secs: 60,
            max_attempts: 3,
            backoff_base_ms: 500,
            backoff_max_ms: 8_000,
            max_concurrency: 4,
            temperature: None,
            api_key: None,
        }
    }
}

impl LlmConfig {
    pub fn requires_api_key(&self) -> bool {
        matches!(self.provider.as_str(), "groq" | "openai")
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.backoff_base_ms),
            max_delay: Duration::from_millis(self.backoff_max_ms),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PipelineConfig {
    /// Text at or above this many characters goes through map-reduce.
    pub direct_threshold_chars: usize,
    /// Web and video text is truncated to this many characters.
    pub url_max_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            direct_threshold_chars: 16_000,
            url_max_chars: 12_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProfile {
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl ChunkProfile {
    pub const fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self {
            max_chars,
            overlap_chars,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChunkingConfig {
    pub text: ChunkProfile,
    pub pdf: ChunkProfile,
    pub office: ChunkProfile,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            text: ChunkProfile::new(3000, 300),
            pdf: ChunkProfile::new(3000, 300),
            office: ChunkProfile::new(1000, 100),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractConfig {
    pub user_agent: String,
    pub fetch_timeout_secs: u64,
    /// Caption language tried for video sources.
    pub caption_language: String,
    pub youtube_watch_url: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0".to_string(),
            fetch_timeout_secs: 30,
            caption_language: "en".to_string(),
            youtube_watch_url: "https://www.youtube.com/watch".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    /// `pretty` or `json`.
    pub format: String,
    /// Default filter directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: "pretty".to_string(),
            filter: "info".to_string(),
        }
    }
}

/// Parse TOML into a [`Config`] and validate it. Does not touch the environment.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Read, parse and validate the config file, then resolve the API key.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;
    resolve_api_key(&mut config)?;
    Ok(config)
}

/// Reads the key named by `llm.api_key_env` into `llm.api_key`.
///
/// Hosted providers without a key fail here, before the server binds.
pub fn resolve_api_key(config: &mut Config) -> Result<()> {
    let key = std::env::var(&config.llm.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());

    if key.is_none() && config.llm.requires_api_key() {
        bail!(
            "{} environment variable not set (required for llm.provider = '{}')",
            config.llm.api_key_env,
            config.llm.provider
        );
    }

    config.llm.api_key = key;
    Ok(())
}

fn validate(config: &Config) -> Result<()> {
    for (name, profile) in [
        ("text", &config.chunking.text),
        ("pdf", &config.chunking.pdf),
        ("office", &config.chunking.office),
    ] {
        if profile.max_chars == 0 {
            bail!("chunking.{}.max_chars must be > 0", name);
        }
        if profile.overlap_chars >= profile.max_chars {
            bail!(
                "chunking.{}.overlap_chars must be smaller than max_chars",
                name
            );
        }
    }

    if config.pipeline.direct_threshold_chars == 0 {
        bail!("pipeline.direct_threshold_chars must be > 0");
    }
    if config.pipeline.url_max_chars == 0 {
        bail!("pipeline.url_max_chars must be > 0");
    }

    if config.llm.max_attempts == 0 {
        bail!("llm.max_attempts must be >= 1");
    }
    if config.llm.max_concurrency == 0 {
        bail!("llm.max_concurrency must be >= 1");
    }
    if config.llm.model.trim().is_empty() {
        bail!("llm.model must not be empty");
    }

    match config.llm.provider.as_str() {
        "groq" | "openai" | "ollama" => {}
        other => bail!(
            "Unknown llm provider: '{}'. Must be groq, openai, or ollama.",
            other
        ),
    }

    match config.logging.format.as_str() {
        "pretty" | "json" => {}
        other => bail!("Unknown logging format: '{}'. Must be pretty or json.", other),
    }

    Ok(())
}
