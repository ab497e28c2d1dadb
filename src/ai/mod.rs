//! AI provider integration
//!
//! This module defines the [`AiProvider`] trait implemented by the vendor
//! adapters (Anthropic messages API, OpenAI chat completions) and the
//! [`ProviderRegistry`] that resolves a provider by name.
//!
//! Only `analyze_content` talks to a vendor. The other operations build a
//! prompt, delegate to it, and post-process the text.

pub mod anthropic;
pub mod openai;
pub mod prompts;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AiConfig;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

/// Errors raised by AI providers and the registry
#[derive(Debug, Error)]
pub enum AiError {
    /// Requested provider is not registered
    #[error("AI Provider '{name}' not found. Available providers: {available}")]
    ProviderNotFound { name: String, available: String },

    /// Provider cannot be built without an API key
    #[error("{0} API key is not configured")]
    MissingApiKey(String),

    /// Vendor answered with a non-success status
    #[error("{provider} API error: {status} - {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    /// Request never produced a response (connect, timeout)
    #[error("{provider} API error: {source}")]
    Request {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    /// Response body did not have the expected shape
    #[error("{provider} API error: invalid response: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl AiError {
    /// Rate limits, overload and server-side failures can be retried
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Request { source, .. } => source.is_timeout() || source.is_connect(),
            Self::ProviderNotFound { .. } | Self::MissingApiKey(_) | Self::InvalidResponse { .. } => {
                false
            }
        }
    }
}

/// Result type for AI operations
pub type AiResult<T> = Result<T, AiError>;

/// Text returned by a provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiResponse {
    pub content: String,

    /// Total tokens billed for the call (prompt + completion)
    pub tokens: u64,

    pub model: String,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Engagement estimate inside a performance prediction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatedEngagement {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
}

/// Factors the model considered when predicting performance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PredictionFactors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hashtags: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_engagement: Option<EstimatedEngagement>,
}

/// Predicted performance of a piece of content on a platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformancePrediction {
    /// 0-100
    pub score: f64,
    /// 0-1
    pub confidence: f64,
    #[serde(default)]
    pub factors: PredictionFactors,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl PerformancePrediction {
    /// Returned when the model reply holds no usable JSON
    pub fn fallback() -> Self {
        Self {
            score: 50.0,
            confidence: 0.5,
            factors: PredictionFactors::default(),
            recommendations: vec!["Unable to parse AI response. Please try again.".to_string()],
        }
    }

    /// Parse a model reply, falling back when it holds no usable JSON
    pub fn from_reply(text: &str) -> Self {
        let Some(json) = prompts::extract_json_object(text) else {
            tracing::warn!("No JSON object found in prediction reply");
            return Self::fallback();
        };

        match serde_json::from_str::<Self>(json) {
            Ok(prediction) => prediction,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    reply = %text.chars().take(200).collect::<String>(),
                    "Failed to parse prediction reply"
                );
                Self::fallback()
            }
        }
    }
}

/// Common interface for AI vendors
#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Send a prompt and return the generated text
    async fn analyze_content(&self, prompt: &str) -> AiResult<AiResponse>;

    /// Generate free-form insights over collected platform data
    async fn generate_insights(&self, data: &serde_json::Value) -> AiResult<AiResponse> {
        self.analyze_content(&prompts::insights_prompt(data)).await
    }

    /// Short (2-3 sentence) summary of a set of trends
    async fn summarize_trends(&self, trends: &serde_json::Value) -> AiResult<String> {
        let response = self.analyze_content(&prompts::summary_prompt(trends)).await?;
        Ok(response.content)
    }

    /// Predict how a piece of content will perform on a platform
    async fn predict_performance(
        &self,
        content: &serde_json::Value,
        platform: &str,
    ) -> AiResult<PerformancePrediction> {
        let response = self
            .analyze_content(&prompts::prediction_prompt(content, platform))
            .await?;
        Ok(PerformancePrediction::from_reply(&response.content))
    }

    /// Registry name ("anthropic", "openai")
    fn name(&self) -> &str;
}

/// Lookup table from provider name to provider
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: BTreeMap<String, Arc<dyn AiProvider>>,
    default_provider: String,
}

impl ProviderRegistry {
    /// Build a registry from already constructed providers
    pub fn new(providers: Vec<Arc<dyn AiProvider>>, default_provider: impl Into<String>) -> Self {
        let providers = providers
            .into_iter()
            .map(|p| (p.name().to_string(), p))
            .collect();
        Self {
            providers,
            default_provider: default_provider.into(),
        }
    }

    /// Register every vendor that has an API key configured
    pub fn from_config(config: &AiConfig) -> AiResult<Self> {
        let mut providers: Vec<Arc<dyn AiProvider>> = Vec::new();

        if config.anthropic.api_key().is_some() {
            providers.push(Arc::new(AnthropicProvider::new(&config.anthropic)?));
        } else {
            tracing::warn!("Anthropic API key not configured; provider disabled");
        }

        if config.openai.api_key().is_some() {
            providers.push(Arc::new(OpenAiProvider::new(&config.openai)?));
        } else {
            tracing::warn!("OpenAI API key not configured; provider disabled");
        }

        let registry = Self::new(providers, config.default_provider.clone());
        if !registry.has(&registry.default_provider) {
            tracing::warn!(
                provider = %registry.default_provider,
                available = %registry.available().join(", "),
                "Default AI provider is not registered"
            );
        }

        Ok(registry)
    }

    /// Resolve a provider by name, or the default when `name` is `None`
    pub fn get(&self, name: Option<&str>) -> AiResult<Arc<dyn AiProvider>> {
        let name = name
            .map(|n| n.trim().to_lowercase())
            .unwrap_or_else(|| self.default_provider.clone());

        self.providers
            .get(&name)
            .cloned()
            .ok_or_else(|| AiError::ProviderNotFound {
                available: self.available().join(", "),
                name,
            })
    }

    /// Registered provider names, sorted
    pub fn available(&self) -> Vec<String> {
        self.providers.keys().cloned().collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.providers.contains_key(&name.to_lowercase())
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }
}
