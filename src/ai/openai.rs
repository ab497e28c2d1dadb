//! OpenAI chat completions adapter

use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{AiError, AiProvider, AiResponse, AiResult};
use crate::config::AiProviderConfig;
use crate::metrics;

const VENDOR: &str = "OpenAI";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    id: String,
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    total_tokens: u64,
}

/// GPT models through `POST /v1/chat/completions`
pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl OpenAiProvider {
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

    async fn send(&self, prompt: &str) -> AiResult<ChatResponse> {
        let request = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
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
            .json::<ChatResponse>()
            .await
            .map_err(|e| AiError::InvalidResponse {
                provider: VENDOR.to_string(),
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    async fn analyze_content(&self, prompt: &str) -> AiResult<AiResponse> {
        let started = Instant::now();
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Sending OpenAI request");

        let completion = match self.send(prompt).await {
            Ok(completion) => completion,
            Err(e) => {
                metrics::record_ai_request(self.name(), started.elapsed().as_secs_f64(), 0, false);
                tracing::error!(error = %e, "OpenAI request failed");
                return Err(e);
            }
        };

        let tokens = completion.usage.map(|u| u.total_tokens).unwrap_or(0);
        metrics::record_ai_request(self.name(), started.elapsed().as_secs_f64(), tokens, true);

        let (content, finish_reason) = completion
            .choices
            .into_iter()
            .next()
            .map(|c| (c.message.content.unwrap_or_default(), c.finish_reason))
            .unwrap_or_default();

        Ok(AiResponse {
            content,
            tokens,
            model: completion.model,
            metadata: serde_json::json!({
                "id": completion.id,
                "finishReason": finish_reason,
            }),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        let err = OpenAiProvider::new(&AiProviderConfig::openai()).err().unwrap();
        assert!(matches!(err, AiError::MissingApiKey(ref v) if v == "OpenAI"));
    }

    #[test]
    fn test_response_without_usage_or_content() {
        let body = r#"{
            "id": "chatcmpl-1",
            "model": "gpt-4-turbo-preview",
            "choices": [{"index": 0, "message": {"role": "assistant", "content": null}, "finish_reason": "length"}]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
        assert!(parsed.choices[0].message.content.is_none());
    }
}
