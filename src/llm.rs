//! LLM client abstraction and provider implementations.
//!
//! Defines the [`LlmClient`] trait (a single `complete(prompt) -> text`
//! capability) and two HTTP backends:
//! - **[`OpenAiCompatClient`]**: OpenAI-compatible `chat/completions`
//!   (Groq, OpenAI).
//! - **[`OllamaClient`]**: a local Ollama instance's `/api/generate`.
//!
//! # Retry Strategy
//!
//! Clients never retry on their own. [`complete_with_retry`] wraps any client
//! with an explicit [`RetryPolicy`]:
//! - [`LlmError::RateLimited`] and [`LlmError::Timeout`] → retry with
//!   exponential backoff (`base`, `2×base`, `4×base`, … capped at `max_delay`)
//! - [`LlmError::Provider`] → fail immediately
//!
//! # Provider Selection
//!
//! ```rust
//! # use skimmer::config::LlmConfig;
//! # use skimmer::llm::create_client;
//! let config = LlmConfig {
//!     provider: "ollama".to_string(),
//!     model: "gemma:2b".to_string(),
//!     ..LlmConfig::default()
//! };
//! let client = create_client(&config).unwrap();
//! assert_eq!(client.model_name(), "gemma:2b");
//! ```

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LlmConfig;

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const OLLAMA_BASE_URL: &str = "http://localhost:11434";

/// Failure modes of a single completion attempt.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LlmError {
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("provider error: {0}")]
    Provider(String),
}

impl LlmError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::RateLimited(_) | LlmError::Timeout(_))
    }

    fn from_status(status: StatusCode, body: String) -> Self {
        let msg = format!("{}: {}", status, body);
        match status {
            StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited(msg),
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => LlmError::Timeout(msg),
            _ => LlmError::Provider(msg),
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(err.to_string())
        } else {
            LlmError::Provider(err.to_string())
        }
    }
}

/// A text-completion backend.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the model identifier (e.g. `"openai/gpt-oss-20b"`).
    fn model_name(&self) -> &str;

    /// Run one completion. Implementations do not retry.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Bounded exponential backoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// No sleeping between attempts.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

/// Calls `client.complete` until it succeeds, fails with a non-retryable
/// error, or `policy.max_attempts` is used up. Returns the last error.
pub async fn complete_with_retry(
    client: &dyn LlmClient,
    prompt: &str,
    policy: &RetryPolicy,
) -> Result<String, LlmError> {
    let attempts = policy.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 0..attempts {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        match client.complete(prompt).await {
            Ok(text) => return Ok(text),
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    model = client.model_name(),
                    attempt = attempt + 1,
                    max_attempts = attempts,
                    error = %e,
                    "LLM call failed, retrying"
                );
                last_err = Some(e);
            }
            Err(e) => {
                tracing::error!(model = client.model_name(), error = %e, "LLM call failed");
                return Err(e);
            }
        }
    }

    let err = last_err.unwrap_or_else(|| LlmError::Provider("no attempts made".to_string()));
    tracing::error!(model = client.model_name(), error = %err, "LLM retries exhausted");
    Err(err)
}

fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?)
}

async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    LlmError::from_status(status, body)
}

// ============ OpenAI-compatible (Groq, OpenAI) ============

/// Client for OpenAI-compatible `POST {base_url}/chat/completions`.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f32>,
}

impl OpenAiCompatClient {
    pub fn new(config: &LlmConfig, default_base_url: &str) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            anyhow::anyhow!("{} not set for provider '{}'", config.api_key_env, config.provider)
        })?;

        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| default_base_url.to_string()),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "user", "content": prompt }
            ],
        });
        if let Some(t) = self.temperature {
            body["temperature"] = serde_json::json!(t);
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url.trim_end_matches('/')))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let json: serde_json::Value = response.json().await?;
        parse_chat_response(&json)
    }
}

/// Extracts `choices[0].message.content`.
fn parse_chat_response(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LlmError::Provider("No content in chat completion response".to_string()))
}

// ============ Ollama ============

/// Client for a local Ollama instance (`POST {base_url}/api/generate`).
pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f32>,
}

impl OllamaClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        Ok(Self {
            http: http_client(config.timeout_secs)?,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| OLLAMA_BASE_URL.to_string()),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });
        if let Some(t) = self.temperature {
            body["options"] = serde_json::json!({ "temperature": t });
        }

        let response = self
            .http
            .post(format!("{}/api/generate", self.base_url.trim_end_matches('/')))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(e.to_string())
                } else {
                    LlmError::Provider(format!(
                        "Ollama connection error (is Ollama running at {}?): {}",
                        self.base_url, e
                    ))
                }
            })?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let json: serde_json::Value = response.json().await?;
        parse_ollama_response(&json)
    }
}

fn parse_ollama_response(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("response")
        .and_then(|r| r.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| LlmError::Provider("No content in Ollama response".to_string()))
}

/// Create the [`LlmClient`] named by `config.provider`.
///
/// | Config Value | Client |
/// |-------------|--------|
/// | `"groq"` | [`OpenAiCompatClient`] against Groq |
/// | `"openai"` | [`OpenAiCompatClient`] against OpenAI |
/// | `"ollama"` | [`OllamaClient`] |
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    match config.provider.as_str() {
        "groq" => Ok(Arc::new(OpenAiCompatClient::new(config, GROQ_BASE_URL)?)),
        "openai" => Ok(Arc::new(OpenAiCompatClient::new(config, OPENAI_BASE_URL)?)),
        "ollama" => Ok(Arc::new(OllamaClient::new(config)?)),
        other => bail!("Unknown llm provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and counts calls.
    struct Scripted {
        results: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(results: Vec<Result<String, LlmError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl LlmClient for Scripted {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
            *self.calls.lock().unwrap() += 1;
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("default".to_string()))
        }
    }

    #[tokio::test]
    async fn retries_rate_limit_then_succeeds() {
        let client = Scripted::new(vec![
            Err(LlmError::RateLimited("429".into())),
            Err(LlmError::Timeout("slow".into())),
            Ok("summary".into()),
        ]);
        let out = complete_with_retry(&client, "p", &RetryPolicy::immediate(3))
            .await
            .unwrap();
        assert_eq!(out, "summary");
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let client = Scripted::new(vec![
            Err(LlmError::Timeout("1".into())),
            Err(LlmError::Timeout("2".into())),
            Err(LlmError::Timeout("3".into())),
            Ok("never reached".into()),
        ]);
        let err = complete_with_retry(&client, "p", &RetryPolicy::immediate(3))
            .await
            .unwrap_err();
        assert_eq!(err, LlmError::Timeout("3".into()));
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn provider_error_is_not_retried() {
        let client = Scripted::new(vec![
            Err(LlmError::Provider("401 unauthorized".into())),
            Ok("never reached".into()),
        ]);
        let err = complete_with_retry(&client, "p", &RetryPolicy::immediate(3))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Provider(_)));
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn backoff_schedule_is_exponential_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 6,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(4), Duration::from_secs(3));
        assert_eq!(policy.delay_for(40), Duration::from_secs(3));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(
            LlmError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            LlmError::RateLimited(_)
        ));
        assert!(matches!(
            LlmError::from_status(StatusCode::GATEWAY_TIMEOUT, String::new()),
            LlmError::Timeout(_)
        ));
        assert!(matches!(
            LlmError::from_status(StatusCode::UNAUTHORIZED, String::new()),
            LlmError::Provider(_)
        ));
        assert!(matches!(
            LlmError::from_status(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            LlmError::Provider(_)
        ));
    }

    #[test]
    fn parses_chat_completion() {
        let json = serde_json::json!({
            "id": "x",
            "choices": [{ "index": 0, "message": { "role": "assistant", "content": "  Hello  " } }]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "Hello");

        let empty = serde_json::json!({ "choices": [] });
        assert!(matches!(
            parse_chat_response(&empty),
            Err(LlmError::Provider(_))
        ));
    }

    #[test]
    fn parses_ollama_generate() {
        let json = serde_json::json!({ "model": "gemma:2b", "response": "Sum.", "done": true });
        assert_eq!(parse_ollama_response(&json).unwrap(), "Sum.");
    }

    #[test]
    fn hosted_provider_without_key_cannot_be_created() {
        let config = LlmConfig::default();
        assert!(create_client(&config).is_err());

        let config = LlmConfig {
            api_key: Some("k".into()),
            ..LlmConfig::default()
        };
        let client = create_client(&config).unwrap();
        assert_eq!(client.model_name(), "openai/gpt-oss-20b");
    }
}
