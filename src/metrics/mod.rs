//! Prometheus metrics for the trends analyzer
//!
//! This module provides metrics tracking for:
//! - Analysis pipeline: analyses per provider, cache hits/misses, platform failures
//! - AI providers: request duration, token usage, errors
//! - Delivery: webhook outcomes
//! - HTTP API: requests by endpoint and status
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_histogram_vec, Counter, CounterVec, Encoder,
    HistogramVec, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all analyzer metrics
struct AnalyzerMetrics {
    analyses: CounterVec,
    cache_hits: Counter,
    cache_misses: Counter,
    trends_collected: CounterVec,
    platform_failures: CounterVec,
    ai_requests: CounterVec,
    ai_tokens: CounterVec,
    ai_duration: HistogramVec,
    webhook_deliveries: CounterVec,
    api_requests: CounterVec,
    api_duration: HistogramVec,
}

static ANALYZER_METRICS: OnceLock<AnalyzerMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, subsequent metric operations become
/// no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = trendscope::metrics::init_metrics() {
///     tracing::warn!("Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = AnalyzerMetrics {
        analyses: register_counter_vec!(
            "trendscope_analyses_total",
            "Total analyses produced by AI provider",
            &["provider"]
        )?,
        cache_hits: register_counter!(
            "trendscope_analysis_cache_hits_total",
            "Analyses served from a recent stored result"
        )?,
        cache_misses: register_counter!(
            "trendscope_analysis_cache_misses_total",
            "Analyses that required a fresh AI call"
        )?,
        trends_collected: register_counter_vec!(
            "trendscope_trends_collected_total",
            "Trending topics collected by platform",
            &["platform"]
        )?,
        platform_failures: register_counter_vec!(
            "trendscope_platform_failures_total",
            "Platform collection failures by platform",
            &["platform"]
        )?,
        ai_requests: register_counter_vec!(
            "trendscope_ai_requests_total",
            "AI provider requests by provider and outcome",
            &["provider", "outcome"]
        )?,
        ai_tokens: register_counter_vec!(
            "trendscope_ai_tokens_total",
            "Tokens consumed by AI provider",
            &["provider"]
        )?,
        ai_duration: register_histogram_vec!(
            "trendscope_ai_request_duration_seconds",
            "AI provider request duration in seconds",
            &["provider"],
            vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0]
        )?,
        webhook_deliveries: register_counter_vec!(
            "trendscope_webhook_deliveries_total",
            "Webhook deliveries by outcome",
            &["outcome"]
        )?,
        api_requests: register_counter_vec!(
            "trendscope_api_requests_total",
            "Total API requests by endpoint and status",
            &["endpoint", "status"]
        )?,
        api_duration: register_histogram_vec!(
            "trendscope_api_request_duration_seconds",
            "API request duration in seconds",
            &["endpoint"],
            vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
    };

    ANALYZER_METRICS
        .set(metrics)
        .map_err(|_| "Analyzer metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized");
    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

/// Record a completed analysis and whether it came from the cache
pub fn record_analysis(provider: &str, from_cache: bool) {
    let Some(m) = ANALYZER_METRICS.get() else {
        return;
    };

    if from_cache {
        m.cache_hits.inc();
    } else {
        m.cache_misses.inc();
        m.analyses.with_label_values(&[provider]).inc();
    }
}

/// Record the outcome of collecting one platform
pub fn record_platform_collection(platform: &str, trends: usize, failed: bool) {
    let Some(m) = ANALYZER_METRICS.get() else {
        return;
    };

    if failed {
        m.platform_failures.with_label_values(&[platform]).inc();
    } else if trends > 0 {
        m.trends_collected
            .with_label_values(&[platform])
            .inc_by(trends as f64);
    }
}

/// Record an AI provider call
pub fn record_ai_request(provider: &str, duration_secs: f64, tokens: u64, success: bool) {
    let Some(m) = ANALYZER_METRICS.get() else {
        return;
    };

    m.ai_requests
        .with_label_values(&[provider, outcome(success)])
        .inc();
    m.ai_duration
        .with_label_values(&[provider])
        .observe(duration_secs);

    if tokens > 0 {
        m.ai_tokens
            .with_label_values(&[provider])
            .inc_by(tokens as f64);
    }
}

/// Record a webhook delivery outcome
pub fn record_webhook_delivery(success: bool) {
    if let Some(m) = ANALYZER_METRICS.get() {
        m.webhook_deliveries
            .with_label_values(&[outcome(success)])
            .inc();
    }
}

/// Record API request
pub fn record_api_request(endpoint: &str, status: u16, duration_secs: f64) {
    let Some(m) = ANALYZER_METRICS.get() else {
        return;
    };

    let status_str = status.to_string();
    m.api_requests
        .with_label_values(&[endpoint, &status_str])
        .inc();
    m.api_duration
        .with_label_values(&[endpoint])
        .observe(duration_secs);
}

// ============================================================================
// Tests
// ============================================================================
