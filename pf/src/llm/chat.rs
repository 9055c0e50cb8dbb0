//! Chat-completions adapter
//!
//! Translates an OpenAI-style `/v1/chat/completions` API into the uniform
//! [`ModelClient`] interface. Serves both the llama and the local provider.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::{LlmError, ModelClient};
use crate::config::ChatProviderConfig;

/// A single chat message
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// Chat-completions API client
pub struct ChatCompletionsClient {
    provider: String,
    model: String,
    api_key: String,
    endpoint: String,
    temperature: Option<f32>,
    system_prompt: Option<String>,
    http: Client,
}

impl ChatCompletionsClient {
    /// Create a new client from provider configuration
    ///
    /// Fails when the provider is not enabled, so the router can move on to the
    /// next provider in its preference list.
    pub fn from_config(provider: &str, config: &ChatProviderConfig) -> Result<Self, LlmError> {
        debug!(%provider, ?config, "ChatCompletionsClient::from_config: called");
        if !config.is_enabled() {
            debug!(%provider, "from_config: provider disabled");
            return Err(LlmError::NotConfigured(provider.to_string()));
        }

        let endpoint = config.resolved_endpoint();
        if endpoint.is_empty() {
            debug!(%provider, "from_config: no endpoint");
            return Err(LlmError::NotConfigured(provider.to_string()));
        }

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(LlmError::Network)?;

        Ok(Self {
            provider: provider.to_string(),
            model: config.resolved_model(),
            api_key: config.api_key(),
            endpoint,
            temperature: config.temperature,
            system_prompt: None,
            http,
        })
    }

    /// Prefix every request with a system message
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Build the request body for the chat-completions API
    fn build_request_body(&self, messages: &[ChatMessage]) -> serde_json::Value {
        debug!(%self.model, message_count = messages.len(), "build_request_body: called");
        let messages: Vec<_> = messages
            .iter()
            .map(|m| serde_json::json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
        });

        if let Some(temperature) = self.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        body
    }

    /// Send a full message list and return the first choice's text
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        debug!(provider = %self.provider, endpoint = %self.endpoint, "chat: called");
        let body = self.build_request_body(messages);

        let mut request = self.http.post(&self.endpoint).header("content-type", "application/json");
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.json(&body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "chat: API error");
            return Err(LlmError::ApiError {
                provider: self.provider.clone(),
                status: status.as_u16(),
                body: text,
            });
        }

        let api_response: ChatResponse = response.json().await?;
        Ok(api_response.into_text())
    }
}

#[async_trait]
impl ModelClient for ChatCompletionsClient {
    async fn generate_content(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(%self.model, prompt_len = prompt.len(), "generate_content: called");
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system_prompt {
            messages.push(ChatMessage::system(system.clone()));
        }
        messages.push(ChatMessage::user(prompt));
        self.chat(&messages).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// Chat-completions API response types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatChoiceMessage>,
    /// Legacy completions shape
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl ChatResponse {
    /// First choice's message content, then legacy text, then empty
    fn into_text(self) -> String {
        let Some(choice) = self.choices.into_iter().next() else {
            return String::new();
        };
        choice
            .message
            .and_then(|m| m.content)
            .filter(|c| !c.is_empty())
            .or(choice.text)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> ChatProviderConfig {
        ChatProviderConfig {
            enabled: true,
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            endpoint_env: "PF_TEST_UNSET_ENDPOINT".to_string(),
            api_key_env: "PF_TEST_UNSET_KEY".to_string(),
            model_env: "PF_TEST_UNSET_MODEL".to_string(),
            ..ChatProviderConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generate_content_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({ "model": "llama-3" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"ok\":true}" } }]
            })))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::from_config("llama", &config_for(&server)).unwrap();
        let text = client.generate_content("hello").await.unwrap();
        assert_eq!(text, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_non_success_status_carries_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::from_config("llama", &config_for(&server)).unwrap();
        let err = client.generate_content("hello").await.unwrap_err();
        match err {
            LlmError::ApiError { provider, status, body } => {
                assert_eq!(provider, "llama");
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_system_prompt_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "hi" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "text": "legacy" }]
            })))
            .mount(&server)
            .await;

        let client = ChatCompletionsClient::from_config("llama", &config_for(&server))
            .unwrap()
            .with_system_prompt("be brief");
        assert_eq!(client.generate_content("hi").await.unwrap(), "legacy");
    }

    #[tokio::test]
    async fn test_bearer_header_only_when_key_present() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let mut client = ChatCompletionsClient::from_config("llama", &config_for(&server)).unwrap();
        client.api_key = "secret".to_string();
        assert_eq!(client.generate_content("hi").await.unwrap(), "");
    }

    #[test]
    fn test_disabled_provider_is_not_configured() {
        let config = ChatProviderConfig {
            enabled: false,
            endpoint_env: "PF_TEST_UNSET_ENDPOINT".to_string(),
            api_key_env: "PF_TEST_UNSET_KEY".to_string(),
            ..ChatProviderConfig::default()
        };
        let err = ChatCompletionsClient::from_config("llama", &config).err().unwrap();
        assert!(matches!(err, LlmError::NotConfigured(_)));
    }
}
