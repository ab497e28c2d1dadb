//! Anthropic messages API adapter

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{AiError, AiProvider, AiResponse, AiResult};
use crate::config::AiProviderConfig;
use crate::metrics;

const API_VERSION: &str = "2023-06-01";
const VENDOR: &str = "Anthropic";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    id: String,
    model: String,
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

/// Claude models through `POST /v1/messages`
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(config: &AiProviderConfig) -> AiResult<Self> {
        let api_key = config
            .api_key()
            .map(str::to_string)
            .ok_or_else(|| AiError::MissingApiKey(VENDOR.to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| AiError::Request {
                provider: VENDOR.to_string(),
                source,
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send(&self, prompt: &str) -> AiResult<MessagesResponse> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|source| AiError::Request {
                provider: VENDOR.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                provider: VENDOR.to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json::<MessagesResponse>()
            .await
            .map_err(|e| AiError::InvalidResponse {
                provider: VENDOR.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    async fn analyze_content(&self, prompt: &str) -> AiResult<AiResponse> {
        let started = Instant::now();
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Sending Anthropic request");

        let result = self.send(prompt).await;
        let elapsed = started.elapsed().as_secs_f64();

        let message = match result {
            Ok(message) => message,
            Err(e) => {
                metrics::record_ai_request(self.name(), elapsed, 0, false);
                tracing::error!(error = %e, "Anthropic request failed");
                return Err(e);
            }
        };

        let content = match message.content.into_iter().next() {
            Some(ContentBlock::Text { text }) => text,
            _ => String::new(),
        };
        let tokens = message.usage.input_tokens + message.usage.output_tokens;
        metrics::record_ai_request(self.name(), elapsed, tokens, true);

        Ok(AiResponse {
            content,
            tokens,
            model: message.model,
            metadata: serde_json::json!({
                "id": message.id,
                "stopReason": message.stop_reason,
            }),
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let err = AnthropicProvider::new(&AiProviderConfig::anthropic()).err().unwrap();
        assert_eq!(err.to_string(), "Anthropic API key is not configured");
    }

    #[test]
    fn test_response_with_non_text_block() {
        let body = r#"{
            "id": "msg_1",
            "model": "claude-3-5-sonnet-20241022",
            "content": [{"type": "tool_use", "id": "t", "name": "x", "input": {}}],
            "stop_reason": "tool_use",
            "usage": {"input_tokens": 3, "output_tokens": 4}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(parsed.content[0], ContentBlock::Other));
        assert_eq!(parsed.usage.input_tokens + parsed.usage.output_tokens, 7);
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let config = AiProviderConfig::anthropic()
            .with_api_key("k")
            .with_base_url("http://localhost:9999/");
        let provider = AnthropicProvider::new(&config).unwrap();
        assert_eq!(provider.base_url, "http://localhost:9999");
    }
}
