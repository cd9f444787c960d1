//! Ollama LLM Provider
//!
//! Implements the LLMProvider trait for Ollama, a local LLM runtime typically
//! listening at http://localhost:11434. No API key is required.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{http_client, map_send_error, GenerationOptions, LLMError, LLMProvider, Message, Result};

/// Ollama provider
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for Ollama API (typically http://localhost:11434)
    base_url: String,

    /// Model name to use (e.g., "llama3.1:8b")
    model: String,

    /// HTTP client for API requests
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    ///
    /// # Arguments
    /// * `base_url` - Base URL for Ollama API (e.g., "http://localhost:11434")
    /// * `model` - Model name to use (e.g., "llama3.1:8b")
    /// * `timeout` - Optional HTTP timeout; `None` waits indefinitely
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            client: http_client(timeout)?,
        })
    }

    fn build_request(&self, messages: &[Message], options: GenerationOptions) -> OllamaRequest {
        OllamaRequest {
            model: self.model.clone(),
            messages: messages
                .iter()
                .map(|msg| OllamaMessage {
                    role: msg.role.to_string(),
                    content: msg.content.clone(),
                })
                .collect(),
            stream: false,
            format: options.json_object.then(|| "json".to_string()),
            options: OllamaOptions {
                temperature: options.temperature,
            },
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn generate(&self, messages: &[Message], options: GenerationOptions) -> Result<String> {
        let request = self.build_request(messages, options);

        tracing::debug!(
            "Ollama request: model={}, messages={}, total_chars={}",
            self.model,
            request.messages.len(),
            request.messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let url = format!("{}/api/chat", self.base_url);
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_send_error(e, &self.base_url))?;

        tracing::info!(
            "Ollama response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::ProviderUnavailable(format!(
                "Ollama API error ({}): {}",
                status, error_text
            )));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(ollama_response.message.content.trim().to_string())
    }
}

/// Ollama API request format
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<String>,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f64,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Ollama API response format
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: OllamaMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ollama_provider_properties() {
        let provider = OllamaProvider::new("http://localhost:11434", "llama3.1:8b", None).unwrap();

        assert_eq!(provider.name(), "ollama");
        assert!(provider.is_local());
    }

    #[test]
    fn test_request_conversion() {
        let provider = OllamaProvider::new("http://localhost:11434", "llama3.1:8b", None).unwrap();

        let messages = vec![
            Message::system("You are a planner"),
            Message::user("Hello"),
            Message::assistant("Hi there"),
        ];

        let request = provider.build_request(&messages, GenerationOptions::json(0.0));
        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0].role, "system");
        assert_eq!(request.messages[2].role, "assistant");
        assert_eq!(request.format.as_deref(), Some("json"));
        assert!(!request.stream);

        let request = provider.build_request(&messages, GenerationOptions::text(0.5));
        assert!(request.format.is_none());
    }
}
