//! OpenAI-compatible LLM Provider
//!
//! Talks to any `/chat/completions` endpoint that follows the OpenAI wire
//! format. The same implementation backs both `openai` and `groq`; only the
//! provider name, base URL, model and key differ.

use super::{GenerationRequest, LLMError, LLMProvider, LLMResponse};
use crate::config::OpenAIConfig;
use async_trait::async_trait;
use serde_json::json;

pub struct OpenAIProvider {
    name: String,
    config: OpenAIConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(name: impl Into<String>, config: OpenAIConfig, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config,
            api_key: api_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn build_payload(&self, request: &GenerationRequest) -> serde_json::Value {
        let api_messages: Vec<serde_json::Value> = request
            .messages
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
        });

        if let Some(schema) = &request.schema {
            payload["response_format"] = json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.schema,
                }
            });
        }

        payload
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_local(&self) -> bool {
        false
    }

    fn supports_structured_output(&self) -> bool {
        true
    }

    async fn check_health(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    async fn generate(&self, request: &GenerationRequest) -> super::Result<LLMResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let payload = self.build_payload(request);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => LLMError::AuthenticationFailed(text),
                429 => LLMError::RateLimitExceeded,
                500..=599 => LLMError::ProviderUnavailable(format!(
                    "{} API error ({}): {}",
                    self.name, status, text
                )),
                _ => LLMError::InvalidRequest(text),
            });
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let content = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(|content| content.as_str())
            .ok_or_else(|| LLMError::ParseError("No message content in response".to_string()))?;

        if request.schema.is_some() {
            let value = super::parse_json_lenient(content).ok_or_else(|| {
                LLMError::ParseError(format!("{} returned non-JSON structured output", self.name))
            })?;
            Ok(LLMResponse::Structured(value))
        } else {
            Ok(LLMResponse::Text(content.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Message, OutputSchema};

    fn provider() -> OpenAIProvider {
        OpenAIProvider::new("groq", OpenAIConfig::default(), "gsk_test")
    }

    #[test]
    fn test_provider_properties() {
        let provider = provider();
        assert_eq!(provider.name(), "groq");
        assert!(!provider.is_local());
        assert!(provider.supports_structured_output());
    }

    #[test]
    fn test_payload_without_schema() {
        let provider = provider();
        let request = GenerationRequest::text(vec![Message::user("hello")]);
        let payload = provider.build_payload(&request);

        assert_eq!(payload["model"], "gpt-4o-mini");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert!(payload.get("response_format").is_none());
    }

    #[test]
    fn test_payload_with_schema() {
        let provider = provider();
        let schema = OutputSchema::new("plan", json!({"type": "object"}));
        let request = GenerationRequest::structured(vec![Message::user("hello")], schema);
        let payload = provider.build_payload(&request);

        assert_eq!(payload["response_format"]["type"], "json_schema");
        assert_eq!(payload["response_format"]["json_schema"]["name"], "plan");
    }
}
