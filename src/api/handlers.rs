//! REST API handlers
//!
//! Every route lives under `/api`. Handlers return `Result<_, Error>`; the
//! error is rendered as `{ "success": false, "error": "..." }` with a status
//! derived from its category.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, MatchedPath, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::metrics;
use crate::models::PlatformType;
use crate::services::analyzer::{
    AiInsightsReport, AnalysisResponse, AnalyzeRequest, InsightsReport, PlatformComparison,
    PredictionReport, TrendHistory, TrendSummary,
};

use super::server::AppState;

const DEFAULT_TRENDING_LIMIT: usize = 20;
const MAX_TRENDING_LIMIT: usize = 100;
const DEFAULT_DAYS: i64 = 7;
const SERVICE_NAME: &str = "Social Trends Analyzer";

// ============================================================================
// Error rendering
// ============================================================================

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let category = self.category();
        let status = StatusCode::from_u16(category.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error = %self, category = category.as_str(), "Request failed");
        } else {
            tracing::debug!(error = %self, category = category.as_str(), "Request rejected");
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Error::validation(rejection.body_text())
    }
}

type ApiResult<T> = Result<Json<T>, Error>;

fn parse_platform(raw: Option<&str>) -> Result<Option<PlatformType>, Error> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(name) => PlatformType::parse(name)
            .map(Some)
            .ok_or_else(|| Error::validation(format!("Unknown platform '{name}'"))),
    }
}

fn required_topic(topic: Option<String>) -> Result<String, Error> {
    topic
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::validation("topic query parameter is required"))
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub platform: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct TopicQuery {
    pub topic: Option<String>,
    pub platform: Option<String>,
    pub days: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    pub topic: Option<String>,
    /// Comma-separated platform names
    pub platforms: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SummaryRequest {
    #[serde(default)]
    pub platform: Option<PlatformType>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub ai_provider: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PredictRequest {
    pub content: serde_json::Value,
    pub platform: PlatformType,
    #[serde(default)]
    pub ai_provider: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AiInsightsRequest {
    pub topic: String,
    pub platforms: Vec<PlatformType>,
    #[serde(default)]
    pub ai_provider: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingItem {
    pub topic: String,
    pub platform: PlatformType,
    pub volume: u64,
    pub score: f64,
    pub detected_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TrendingResponse {
    pub platform: String,
    pub count: usize,
    pub trends: Vec<TrendingItem>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersResponse {
    pub providers: Vec<String>,
    pub default_provider: String,
    pub platforms: Vec<PlatformType>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub service: String,
    pub version: String,
    pub uptime_secs: u64,
}

// ============================================================================
// Router
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let trends = Router::new()
        .route("/trends/analyze", post(analyze_trends))
        .route("/trends/trending", get(get_trending))
        .route("/trends/history", get(get_history))
        .route("/trends/insights", get(get_insights))
        .route("/trends/compare", get(compare_platforms))
        .route("/trends/summary", post(summarize_trends))
        .route("/trends/predict", post(predict_performance))
        .route("/trends/ai-insights", post(ai_insights))
        .route("/trends/providers", get(list_providers))
        .route("/trends/health", get(health_check))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .nest("/api", trends)
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}

/// Record request count and latency per matched route
async fn track_requests(request: Request, next: Next) -> Response {
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let started = Instant::now();

    let response = next.run(request).await;

    metrics::record_api_request(
        &endpoint,
        response.status().as_u16(),
        started.elapsed().as_secs_f64(),
    );
    response
}

// ============================================================================
// Analysis handlers
// ============================================================================

async fn analyze_trends(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<AnalysisResponse> {
    let Json(request) = body?;
    let response = state.analyzer.analyze_trends(request).await?;
    Ok(Json(response))
}

async fn get_trending(
    State(state): State<AppState>,
    query: Result<Query<TrendingQuery>, QueryRejection>,
) -> ApiResult<TrendingResponse> {
    let Query(query) = query?;
    let platform = parse_platform(query.platform.as_deref())?;
    let limit = query.limit.unwrap_or(DEFAULT_TRENDING_LIMIT);
    if !(1..=MAX_TRENDING_LIMIT).contains(&limit) {
        return Err(Error::validation(format!(
            "limit must be between 1 and {MAX_TRENDING_LIMIT}"
        )));
    }

    let trends: Vec<TrendingItem> = state
        .analyzer
        .collector()
        .get_recent_trends(platform, limit)?
        .into_iter()
        .map(|t| TrendingItem {
            topic: t.topic,
            platform: t.platform,
            volume: t.volume,
            score: t.trending_score,
            detected_at: t.detected_at,
        })
        .collect();

    Ok(Json(TrendingResponse {
        platform: platform.map_or_else(|| "all".to_string(), |p| p.to_string()),
        count: trends.len(),
        trends,
    }))
}

async fn get_history(
    State(state): State<AppState>,
    query: Result<Query<TopicQuery>, QueryRejection>,
) -> ApiResult<TrendHistory> {
    let Query(query) = query?;
    let topic = required_topic(query.topic)?;
    let platform = parse_platform(query.platform.as_deref())?;

    let history = state.analyzer.get_trend_history(
        &topic,
        platform,
        query.days.unwrap_or(DEFAULT_DAYS),
    )?;
    Ok(Json(history))
}

async fn get_insights(
    State(state): State<AppState>,
    query: Result<Query<TopicQuery>, QueryRejection>,
) -> ApiResult<InsightsReport> {
    let Query(query) = query?;
    let topic = required_topic(query.topic)?;
    let platform = parse_platform(query.platform.as_deref())?;

    let report = state
        .analyzer
        .get_insights(&topic, platform, query.days.unwrap_or(DEFAULT_DAYS))?;
    Ok(Json(report))
}

async fn compare_platforms(
    State(state): State<AppState>,
    query: Result<Query<CompareQuery>, QueryRejection>,
) -> ApiResult<PlatformComparison> {
    let Query(query) = query?;
    let topic = required_topic(query.topic)?;

    let platforms = match query.platforms.as_deref() {
        Some(list) => list
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|name| parse_platform(Some(name))?.ok_or_else(|| Error::validation("empty platform")))
            .collect::<Result<Vec<_>, _>>()?,
        None => state.analyzer.collector().platforms().available(),
    };

    let comparison = state.analyzer.compare_platforms(&topic, &platforms).await?;
    Ok(Json(comparison))
}

// ============================================================================
// AI handlers
// ============================================================================

async fn summarize_trends(
    State(state): State<AppState>,
    body: Result<Json<SummaryRequest>, JsonRejection>,
) -> ApiResult<TrendSummary> {
    let Json(request) = body?;
    let limit = request.limit.unwrap_or(DEFAULT_TRENDING_LIMIT);
    if !(1..=MAX_TRENDING_LIMIT).contains(&limit) {
        return Err(Error::validation(format!(
            "limit must be between 1 and {MAX_TRENDING_LIMIT}"
        )));
    }

    let summary = state
        .analyzer
        .summarize_recent_trends(request.platform, limit, request.ai_provider.as_deref())
        .await?;
    Ok(Json(summary))
}

async fn predict_performance(
    State(state): State<AppState>,
    body: Result<Json<PredictRequest>, JsonRejection>,
) -> ApiResult<PredictionReport> {
    let Json(request) = body?;
    let report = state
        .analyzer
        .predict_performance(&request.content, request.platform, request.ai_provider.as_deref())
        .await?;
    Ok(Json(report))
}

async fn ai_insights(
    State(state): State<AppState>,
    body: Result<Json<AiInsightsRequest>, JsonRejection>,
) -> ApiResult<AiInsightsReport> {
    let Json(request) = body?;
    let report = state
        .analyzer
        .generate_ai_insights(
            request.topic.trim(),
            &request.platforms,
            request.ai_provider.as_deref(),
        )
        .await?;
    Ok(Json(report))
}

// ============================================================================
// Service handlers
// ============================================================================

async fn list_providers(State(state): State<AppState>) -> Json<ProvidersResponse> {
    let providers = state.analyzer.providers();
    Json(ProvidersResponse {
        providers: providers.available(),
        default_provider: providers.default_provider().to_string(),
        platforms: state.analyzer.collector().platforms().available(),
    })
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

async fn metrics_handler() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => Error::other(format!("Failed to encode metrics: {e}")).into_response(),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiError;

    #[test]
    fn test_error_response_shape() {
        let response = ErrorResponse::new("bad input");
        assert!(!response.success);
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["error"], "bad input");
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e: Error| e.into_response().status();

        assert_eq!(status(Error::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(Error::Ai(AiError::ProviderNotFound {
                name: "gemini".to_string(),
                available: "anthropic".to_string(),
            })),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status(Error::Ai(AiError::Api {
                provider: "Anthropic".to_string(),
                status: 500,
                message: "boom".to_string(),
            })),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(Error::storage(anyhow::anyhow!("disk"))), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!(parse_platform(None).unwrap(), None);
        assert_eq!(parse_platform(Some("")).unwrap(), None);
        assert_eq!(
            parse_platform(Some("Instagram")).unwrap(),
            Some(PlatformType::Instagram)
        );
        assert!(parse_platform(Some("myspace")).is_err());
    }

    #[test]
    fn test_required_topic() {
        assert_eq!(required_topic(Some(" AI ".to_string())).unwrap(), "AI");
        assert!(required_topic(Some("  ".to_string())).is_err());
        assert!(required_topic(None).is_err());
    }
}
