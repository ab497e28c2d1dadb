//! Common test utilities

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, Response};
use http_body_util::BodyExt;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trendscope::ai::ProviderRegistry;
use trendscope::api::{ApiServer, AppState};
use trendscope::config::{AiConfig, AiProviderConfig, AnalysisConfig, ServerConfig};
use trendscope::notifications::{WebhookConfig, WebhookNotifier};
use trendscope::platforms::PlatformRegistry;
use trendscope::services::TrendsAnalyzer;
use trendscope::storage::TrendStore;

/// Anthropic messages API reply carrying `text`
pub fn anthropic_reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "msg_test",
        "type": "message",
        "role": "assistant",
        "model": "claude-3-5-sonnet-20241022",
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 120, "output_tokens": 80}
    })
}

/// OpenAI chat completions reply carrying `text`
pub fn openai_reply(text: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "gpt-4-turbo-preview",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": text},
            "finish_reason": "stop"
        }],
        "usage": {"prompt_tokens": 50, "completion_tokens": 25, "total_tokens": 75}
    })
}

/// Mount an Anthropic endpoint that always answers with `text`
pub async fn mount_anthropic(server: &MockServer, text: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(anthropic_reply(text)))
        .mount(server)
        .await;
}

/// AI configuration pointing Anthropic at a mock server
pub fn ai_config(anthropic_base: &str) -> AiConfig {
    AiConfig {
        default_provider: "anthropic".to_string(),
        anthropic: AiProviderConfig::anthropic()
            .with_api_key("test-key")
            .with_base_url(anthropic_base),
        openai: AiProviderConfig::openai(),
    }
}

/// Analyzer backed by a temporary SQLite file
pub fn test_analyzer(dir: &TempDir, ai: &AiConfig, analysis: AnalysisConfig) -> TrendsAnalyzer {
    let store = Arc::new(TrendStore::new(dir.path().join("trends.db")).unwrap());
    let providers = ProviderRegistry::from_config(ai).unwrap();
    let notifier = WebhookNotifier::new(
        WebhookConfig::default().with_retry_base_delay(std::time::Duration::from_millis(10)),
    )
    .unwrap();

    TrendsAnalyzer::new(
        store,
        PlatformRegistry::with_defaults(),
        providers,
        notifier,
        analysis,
    )
}

/// Router for an analyzer, with default server settings
pub fn test_router(analyzer: TrendsAnalyzer) -> axum::Router {
    ApiServer::with_state(ServerConfig::default(), AppState::new(analyzer)).build_router()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Collect a response body as JSON
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Collect a response body as text
#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
