use super::{http_client, map_send_error, GenerationOptions, LLMError, LLMProvider, Message};
use crate::config::OpenAIConfig;
use crate::secrets::SecretString;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

pub struct OpenAIProvider {
    config: OpenAIConfig,
    api_key: SecretString,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(
        config: OpenAIConfig,
        api_key: SecretString,
        timeout: Option<Duration>,
    ) -> super::Result<Self> {
        Ok(Self {
            config,
            api_key,
            client: http_client(timeout)?,
        })
    }

    fn build_payload(&self, messages: &[Message], options: GenerationOptions) -> serde_json::Value {
        let api_messages: Vec<_> = messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let mut payload = json!({
            "model": self.config.model,
            "messages": api_messages,
            "temperature": options.temperature,
        });

        if options.json_object {
            payload["response_format"] = json!({"type": "json_object"});
        }

        payload
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn generate(
        &self,
        messages: &[Message],
        options: GenerationOptions,
    ) -> super::Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let payload = self.build_payload(messages, options);

        tracing::debug!(
            "OpenAI request: model={}, messages={}, json_object={}",
            self.config.model,
            messages.len(),
            options.json_object
        );

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key.unsecure()))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| map_send_error(e, &self.config.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                _ => LLMError::InvalidRequest(format!("OpenAI API error ({}): {}", status, text)),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        tracing::info!(
            "OpenAI response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|content| content.trim().to_string())
            .ok_or_else(|| LLMError::ParseError("Empty content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new(OpenAIConfig::default(), SecretString::new("test-key"), None).unwrap()
    }

    #[test]
    fn test_openai_provider_properties() {
        let provider = provider();
        assert_eq!(provider.name(), "openai");
        assert!(!provider.is_local());
    }

    #[test]
    fn test_payload_json_mode() {
        let provider = provider();
        let messages = vec![Message::system("plan"), Message::user("question")];

        let payload = provider.build_payload(&messages, GenerationOptions::json(0.2));
        assert_eq!(payload["response_format"]["type"], "json_object");
        assert_eq!(payload["temperature"], 0.2);
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["content"], "question");

        let payload = provider.build_payload(&messages, GenerationOptions::text(0.5));
        assert!(payload.get("response_format").is_none());
    }
}
