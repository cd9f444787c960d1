//! LLM Provider Abstraction Layer
//!
//! This module provides a common interface for the language-generation service
//! used by the planner, the narrator and the price explainer. The LLMProvider
//! trait is the only seam the conductor depends on, so tests can swap the
//! HTTP-backed providers for a scripted one.
//!
//! Calls are single-shot: no retries, and no timeout unless the provider was
//! built with one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LLMConfig;
use crate::secrets::{SecretManager, OPENAI_API_KEY};
use sdk::errors::EngineError;

pub mod ollama;
pub mod openai;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<LLMError> for EngineError {
    fn from(err: LLMError) -> Self {
        EngineError::LLMProvider(crate::secrets::scrub_secrets(&err.to_string()))
    }
}

/// Message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// Per-call generation settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f64,

    /// Ask the provider to constrain output to a single JSON object
    pub json_object: bool,
}

impl GenerationOptions {
    pub fn text(temperature: f64) -> Self {
        Self {
            temperature,
            json_object: false,
        }
    }

    pub fn json(temperature: f64) -> Self {
        Self {
            temperature,
            json_object: true,
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::text(0.5)
    }
}

/// LLM Provider trait that all providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "openai", "ollama")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Generate a completion and return the raw text of the reply
    async fn generate(&self, messages: &[Message], options: GenerationOptions) -> Result<String>;
}

/// Build the configured default provider.
///
/// The OpenAI key is resolved once here; a missing key is reported now
/// rather than on the first agent request.
pub fn build_provider(
    config: &LLMConfig,
    secrets: &SecretManager,
) -> std::result::Result<Arc<dyn LLMProvider>, EngineError> {
    let timeout = config.request_timeout_secs.map(Duration::from_secs);

    match config.default_provider.as_str() {
        "openai" => {
            let api_key = secrets.get_secret(OPENAI_API_KEY)?;
            let provider = openai::OpenAIProvider::new(config.openai.clone(), api_key, timeout)
                .map_err(EngineError::from)?;
            Ok(Arc::new(provider))
        }
        "ollama" => {
            let provider = ollama::OllamaProvider::new(
                config.ollama.base_url.clone(),
                config.ollama.model.clone(),
                timeout,
            )
            .map_err(EngineError::from)?;
            Ok(Arc::new(provider))
        }
        other => Err(EngineError::Config(format!(
            "Unknown LLM provider '{}'",
            other
        ))),
    }
}

/// Build a reqwest client, with a request timeout only when one is configured
pub(crate) fn http_client(timeout: Option<Duration>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder
        .build()
        .map_err(|e| LLMError::ProviderUnavailable(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport failure to an LLM error
pub(crate) fn map_send_error(e: reqwest::Error, base_url: &str) -> LLMError {
    if e.is_timeout() {
        LLMError::Timeout
    } else if e.is_connect() {
        LLMError::ProviderUnavailable(format!("Cannot connect to {}", base_url))
    } else {
        LLMError::NetworkError(e.to_string())
    }
}

/// Locate the JSON object in a model reply.
///
/// Handles, in order:
/// 1. The whole reply is the object
/// 2. The object sits inside a markdown code fence
/// 3. The object is embedded in prose; the first balanced `{...}` is taken
///
/// Returns `None` if no candidate object text is found. The caller still has
/// to parse and validate the candidate.
pub fn extract_json_object(content: &str) -> Option<&str> {
    let trimmed = content.trim();

    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }

    if let Some(inner) = extract_fenced_block(trimmed) {
        let inner = inner.trim();
        if inner.starts_with('{') {
            return Some(inner);
        }
    }

    let pos = trimmed.find('{')?;
    extract_balanced_json(&trimmed[pos..])
}

/// Extract the body of the first markdown code fence in the text.
///
/// Works even when there is trailing prose after the closing ```.
fn extract_fenced_block(content: &str) -> Option<&str> {
    let fence_start = content.find("```")?;
    let after_opening = &content[fence_start + 3..];

    // Skip the language tag line (e.g. "json\n")
    let body_start_rel = after_opening.find('\n')? + 1;
    let body_start = fence_start + 3 + body_start_rel;

    let closing = content[body_start..].find("```")?;
    let body_end = body_start + closing;

    if body_start >= body_end {
        return None;
    }

    Some(&content[body_start..body_end])
}

/// Extract a balanced JSON object starting at position 0 of `s`.
///
/// Counts `{` / `}` depth, respecting string literals.
fn extract_balanced_json(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}
