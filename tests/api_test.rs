//! HTTP API tests
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`; the
//! Anthropic API and webhook targets are wiremock servers.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use trendscope::config::AnalysisConfig;

use common::{ai_config, body_json, get, mount_anthropic, post_json, test_analyzer, test_router};

const ANALYSIS_TEXT: &str =
    "Sentiment is very positive across platforms and the topic is rising steadily.";

async fn setup(reply: &str) -> (TempDir, MockServer, axum::Router) {
    let dir = TempDir::new().unwrap();
    let ai_server = MockServer::start().await;
    mount_anthropic(&ai_server, reply).await;

    let analyzer = test_analyzer(&dir, &ai_config(&ai_server.uri()), AnalysisConfig::default());
    (dir, ai_server, test_router(analyzer))
}

// ============================================================================
// Analyze
// ============================================================================

#[tokio::test]
async fn test_analyze_returns_full_response() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;

    let response = app
        .oneshot(post_json(
            "/api/trends/analyze",
            &serde_json::json!({"topic": "AI", "platforms": ["twitter", "instagram"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["topic"], "AI");
    assert_eq!(body["analysis"]["summary"], ANALYSIS_TEXT);
    assert_eq!(body["analysis"]["sentiment"], 0.8);
    assert_eq!(body["analysis"]["predictedGrowth"], "rising");
    assert_eq!(body["analysis"]["confidence"], 0.85);
    assert_eq!(body["fromCache"], false);
    assert_eq!(body["aiProvider"], "anthropic");
    assert_eq!(body["tokensUsed"], 200);
    assert!(body["analyzedAt"].is_string());

    let insights = body["insights"].as_array().unwrap();
    assert_eq!(insights.len(), 8);
    assert_eq!(insights[0]["type"], "best_time");
    assert_eq!(insights[0]["title"], "Optimal Posting Time for twitter");
    assert_eq!(insights[0]["actionable"], true);
}

#[tokio::test]
async fn test_analyze_second_call_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let ai_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(common::anthropic_reply("stable")))
        .expect(1)
        .mount(&ai_server)
        .await;

    let analyzer = test_analyzer(&dir, &ai_config(&ai_server.uri()), AnalysisConfig::default());
    let app = test_router(analyzer);
    let request = serde_json::json!({"topic": "Gaming", "platforms": ["twitter"]});

    let first = body_json(
        app.clone()
            .oneshot(post_json("/api/trends/analyze", &request))
            .await
            .unwrap(),
    )
    .await;
    let second = body_json(
        app.oneshot(post_json("/api/trends/analyze", &request))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(first["fromCache"], false);
    assert_eq!(second["fromCache"], true);
    assert_eq!(second["analysisId"], first["analysisId"]);
    assert_eq!(second["insights"], first["insights"]);
}

#[tokio::test]
async fn test_analyze_rejects_bad_requests() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;

    let cases = [
        serde_json::json!({"topic": "", "platforms": ["twitter"]}),
        serde_json::json!({"topic": "AI", "platforms": []}),
        serde_json::json!({"topic": "AI", "platforms": ["myspace"]}),
        serde_json::json!({"topic": "AI", "platforms": ["twitter"], "unexpected": true}),
        serde_json::json!({"topic": "AI", "platforms": ["twitter"], "webhookUrl": "not-a-url"}),
        serde_json::json!({"topic": "AI", "platforms": ["twitter"], "aiProvider": "gemini"}),
        serde_json::json!({"platforms": ["twitter"]}),
    ];

    for case in cases {
        let response = app
            .clone()
            .oneshot(post_json("/api/trends/analyze", &case))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "case: {case}");

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_analyze_unknown_provider_lists_available() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;

    let response = app
        .oneshot(post_json(
            "/api/trends/analyze",
            &serde_json::json!({"topic": "AI", "platforms": ["twitter"], "aiProvider": "openai"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("AI Provider 'openai' not found"));
    assert!(error.contains("anthropic"));
}

#[tokio::test]
async fn test_analyze_ai_failure_is_bad_gateway() {
    let dir = TempDir::new().unwrap();
    let ai_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&ai_server)
        .await;

    let analyzer = test_analyzer(&dir, &ai_config(&ai_server.uri()), AnalysisConfig::default());
    let response = test_router(analyzer)
        .oneshot(post_json(
            "/api/trends/analyze",
            &serde_json::json!({"topic": "AI", "platforms": ["twitter"]}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("500"));
}

#[tokio::test]
async fn test_analyze_calls_webhook() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;

    let hook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/hook"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&hook)
        .await;

    let response = app
        .oneshot(post_json(
            "/api/trends/analyze",
            &serde_json::json!({
                "topic": "AI",
                "platforms": ["twitter"],
                "webhookUrl": format!("{}/hook", hook.uri()),
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    // delivery runs in the background
    let mut received = Vec::new();
    for _ in 0..50 {
        received = hook.received_requests().await.unwrap_or_default();
        if !received.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    assert_eq!(received.len(), 1);
    let payload: serde_json::Value = serde_json::from_slice(&received[0].body).unwrap();
    assert_eq!(payload["analysisId"], body["analysisId"]);
    assert_eq!(payload["topic"], "AI");
}

// ============================================================================
// Queries
// ============================================================================

#[tokio::test]
async fn test_trending_after_analysis() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;

    app.clone()
        .oneshot(post_json(
            "/api/trends/analyze",
            &serde_json::json!({"topic": "AI", "platforms": ["twitter", "instagram"]}),
        ))
        .await
        .unwrap();

    let all = body_json(app.clone().oneshot(get("/api/trends/trending")).await.unwrap()).await;
    assert_eq!(all["platform"], "all");
    assert_eq!(all["count"], 20);

    let twitter = body_json(
        app.clone()
            .oneshot(get("/api/trends/trending?platform=twitter&limit=3"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(twitter["platform"], "twitter");
    assert_eq!(twitter["count"], 3);
    let first = &twitter["trends"][0];
    assert_eq!(first["platform"], "twitter");
    assert!(first["score"].is_number());
    assert!(first["detectedAt"].is_string());

    let bad = app
        .oneshot(get("/api/trends/trending?platform=myspace"))
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_history_and_insights_endpoints() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;

    app.clone()
        .oneshot(post_json(
            "/api/trends/analyze",
            &serde_json::json!({"topic": "AI", "platforms": ["twitter"]}),
        ))
        .await
        .unwrap();

    let history = body_json(
        app.clone()
            .oneshot(get("/api/trends/history?topic=AI&platform=twitter"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(history["topic"], "AI");
    assert_eq!(history["period"], "7 days");
    assert_eq!(history["timeline"][0]["volume"], 50_000);
    assert_eq!(history["timeline"][0]["sentiment"], 0.5);
    assert_eq!(history["trend"], "stable");
    assert_eq!(history["growthRate"], 0.0);

    let insights = body_json(
        app.clone()
            .oneshot(get("/api/trends/insights?topic=AI&days=30"))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(insights["platform"], "all");
    assert_eq!(insights["count"], 4);

    for uri in [
        "/api/trends/history?topic=AI&days=0",
        "/api/trends/history?topic=AI&days=91",
        "/api/trends/history",
        "/api/trends/insights?topic=AI&days=31",
        "/api/trends/insights?topic=AI&days=abc",
    ] {
        let response = app.clone().oneshot(get(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
    }
}

#[tokio::test]
async fn test_compare_endpoint() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;

    let response = app
        .clone()
        .oneshot(get("/api/trends/compare?topic=AI&platforms=twitter,instagram"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let comparison = body["comparison"].as_array().unwrap();
    assert_eq!(comparison.len(), 2);
    assert_eq!(comparison[1]["platform"], "instagram");
    assert_eq!(comparison[1]["optimalPostingTime"]["day"], "Wednesday");
    assert_eq!(comparison[1]["optimalPostingTime"]["hour"], 15);
    assert!(body["recommendation"].as_str().unwrap().starts_with("Focus on "));

    let missing = app.oneshot(get("/api/trends/compare")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// AI endpoints
// ============================================================================

#[tokio::test]
async fn test_predict_endpoint_parses_json_reply() {
    let reply = "Here you go:\n```json\n{\"score\": 72, \"confidence\": 0.8, \"factors\": {\"timing\": \"good\"}, \"recommendations\": [\"Post at noon\"]}\n```";
    let (_dir, _ai, app) = setup(reply).await;

    let response = app
        .oneshot(post_json(
            "/api/trends/predict",
            &serde_json::json!({"content": {"text": "New launch"}, "platform": "twitter"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["platform"], "twitter");
    assert_eq!(body["score"], 72.0);
    assert_eq!(body["factors"]["timing"], "good");
    assert_eq!(body["recommendations"][0], "Post at noon");
    assert_eq!(body["aiProvider"], "anthropic");
}

#[tokio::test]
async fn test_predict_endpoint_falls_back_on_prose() {
    let (_dir, _ai, app) = setup("I cannot predict that.").await;

    let body = body_json(
        app.oneshot(post_json(
            "/api/trends/predict",
            &serde_json::json!({"content": "hello", "platform": "instagram"}),
        ))
        .await
        .unwrap(),
    )
    .await;

    assert_eq!(body["score"], 50.0);
    assert_eq!(body["confidence"], 0.5);
    assert_eq!(
        body["recommendations"][0],
        "Unable to parse AI response. Please try again."
    );
}

#[tokio::test]
async fn test_summary_and_ai_insights_endpoints() {
    let (_dir, _ai, app) = setup("A short summary.").await;

    let insights = body_json(
        app.clone()
            .oneshot(post_json(
                "/api/trends/ai-insights",
                &serde_json::json!({"topic": "AI", "platforms": ["twitter"]}),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(insights["insights"], "A short summary.");
    assert_eq!(insights["tokensUsed"], 200);

    let summary = body_json(
        app.oneshot(post_json(
            "/api/trends/summary",
            &serde_json::json!({"platform": "twitter", "limit": 5}),
        ))
        .await
        .unwrap(),
    )
    .await;
    assert_eq!(summary["platform"], "twitter");
    assert_eq!(summary["count"], 5);
    assert_eq!(summary["summary"], "A short summary.");
}

// ============================================================================
// Service endpoints
// ============================================================================

#[tokio::test]
async fn test_health_and_providers() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;

    let health = body_json(app.clone().oneshot(get("/api/trends/health")).await.unwrap()).await;
    assert_eq!(health["status"], "ok");
    assert_eq!(health["service"], "Social Trends Analyzer");
    assert!(health["timestamp"].is_string());

    let providers = body_json(app.oneshot(get("/api/trends/providers")).await.unwrap()).await;
    assert_eq!(providers["providers"], serde_json::json!(["anthropic"]));
    assert_eq!(providers["defaultProvider"], "anthropic");
    assert_eq!(providers["platforms"], serde_json::json!(["twitter", "instagram"]));
}

#[tokio::test]
async fn test_metrics_endpoint_is_text() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;

    let response = app.oneshot(get("/api/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (_dir, _ai, app) = setup(ANALYSIS_TEXT).await;
    let response = app.oneshot(get("/api/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
