//! Analysis orchestration
//!
//! `analyze_trends` runs the whole pipeline: cache lookup, platform
//! collection, AI analysis, persistence, insight generation and the
//! optional webhook. The remaining operations are read-side queries over
//! stored data plus thin wrappers around the secondary AI calls.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ai::{prompts, AiProvider, PerformancePrediction, ProviderRegistry};
use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{
    AnalysisRecord, GrowthTrend, InsightRecord, InsightType, PlatformData, PlatformType,
    PostRecord, TrendRecord,
};
use crate::notifications::{validate_webhook_url, WebhookNotifier};
use crate::platforms::PlatformRegistry;
use crate::services::collector::TrendsCollector;
use crate::services::insights::{self, InsightsGenerator};
use crate::storage::TrendStore;

/// Confidence reported for every AI analysis
const ANALYSIS_CONFIDENCE: f64 = 0.85;

/// Maximum look-back for trend history, in days
pub const MAX_HISTORY_DAYS: i64 = 90;

/// Maximum look-back for stored insights, in days
pub const MAX_INSIGHT_DAYS: i64 = 30;

// ============================================================================
// Requests & responses
// ============================================================================

/// Request to analyze a topic across platforms
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AnalyzeRequest {
    pub topic: String,
    pub platforms: Vec<PlatformType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_cache: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
}

impl AnalyzeRequest {
    pub fn new(topic: impl Into<String>, platforms: Vec<PlatformType>) -> Self {
        Self {
            topic: topic.into(),
            platforms,
            ai_provider: None,
            use_cache: None,
            webhook_url: None,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.ai_provider = Some(provider.into());
        self
    }

    pub fn with_cache(mut self, use_cache: bool) -> Self {
        self.use_cache = Some(use_cache);
        self
    }

    pub fn with_webhook(mut self, url: impl Into<String>) -> Self {
        self.webhook_url = Some(url.into());
        self
    }

    /// Reject empty topics, empty platform lists and bad webhook URLs
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(Error::validation("topic must not be empty"));
        }
        if self.platforms.is_empty() {
            return Err(Error::validation("platforms must contain at least one platform"));
        }
        if let Some(url) = &self.webhook_url {
            validate_webhook_url(url).map_err(|e| Error::validation(e.to_string()))?;
        }
        Ok(())
    }
}

/// Narrative part of an analysis response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub summary: String,
    pub sentiment: f64,
    pub predicted_growth: GrowthTrend,
    pub confidence: f64,
}

/// Insight as returned to API clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightView {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub confidence: f64,
    pub actionable: bool,
    pub metadata: serde_json::Value,
}

impl From<InsightRecord> for InsightView {
    fn from(record: InsightRecord) -> Self {
        Self {
            insight_type: record.insight_type,
            title: record.title,
            description: record.description,
            confidence: record.confidence_score,
            actionable: record.actionable,
            metadata: record.metadata,
        }
    }
}

/// Result of `analyze_trends`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub topic: String,
    pub analysis: AnalysisSummary,
    pub insights: Vec<InsightView>,
    pub analyzed_at: DateTime<Utc>,
    pub from_cache: bool,
    pub analysis_id: String,
    pub ai_provider: String,
    pub tokens_used: u64,
}

impl AnalysisResponse {
    fn build(analysis: &AnalysisRecord, insights: Vec<InsightRecord>, from_cache: bool) -> Self {
        Self {
            topic: analysis.topic.clone(),
            analysis: AnalysisSummary {
                summary: analysis.analysis_text.clone(),
                sentiment: analysis.sentiment_score.unwrap_or(0.0),
                predicted_growth: analysis.predicted_growth.unwrap_or_default(),
                confidence: ANALYSIS_CONFIDENCE,
            },
            insights: insights.into_iter().map(InsightView::from).collect(),
            analyzed_at: analysis.analyzed_at,
            from_cache,
            analysis_id: analysis.id.clone(),
            ai_provider: analysis.ai_provider.clone(),
            tokens_used: analysis.tokens_used,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// YYYY-MM-DD
    pub date: String,
    pub volume: u64,
    pub sentiment: f64,
}

/// Volume history of a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendHistory {
    pub topic: String,
    pub platform: String,
    pub period: String,
    pub timeline: Vec<TimelinePoint>,
    pub trend: GrowthTrend,
    pub growth_rate: f64,
}

/// Stored insights for a topic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsReport {
    pub topic: String,
    pub platform: String,
    pub count: usize,
    pub insights: Vec<InsightView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostingTime {
    pub day: String,
    pub hour: u8,
}

/// One platform's row in a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformComparisonItem {
    pub platform: PlatformType,
    pub volume: u64,
    pub engagement: String,
    pub best_content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimal_posting_time: Option<PostingTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformComparison {
    pub topic: String,
    pub comparison: Vec<PlatformComparisonItem>,
    pub recommendation: String,
}

/// AI summary of the latest stored trends
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendSummary {
    pub platform: String,
    pub count: usize,
    pub summary: String,
    pub ai_provider: String,
}

/// AI narrative insights over freshly collected data
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiInsightsReport {
    pub topic: String,
    pub insights: String,
    pub ai_provider: String,
    pub model: String,
    pub tokens_used: u64,
}

/// Performance prediction tagged with the provider that produced it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionReport {
    pub platform: PlatformType,
    #[serde(flatten)]
    pub prediction: PerformancePrediction,
    pub ai_provider: String,
}

// ============================================================================
// Text heuristics
// ============================================================================

/// Sentiment score from keywords in the analysis text
///
/// Intensified phrases are checked before their plain forms.
pub fn extract_sentiment(text: &str) -> f64 {
    let lower = text.to_lowercase();

    if lower.contains("very positive") || lower.contains("highly positive") {
        0.8
    } else if lower.contains("very negative") || lower.contains("highly negative") {
        -0.8
    } else if lower.contains("positive") {
        0.5
    } else if lower.contains("neutral") {
        0.0
    } else if lower.contains("negative") {
        -0.5
    } else {
        0.0
    }
}

/// Growth prediction from keywords in the analysis text
pub fn extract_growth(text: &str) -> GrowthTrend {
    let lower = text.to_lowercase();

    if lower.contains("viral") || lower.contains("explosive growth") {
        GrowthTrend::Viral
    } else if lower.contains("rising") || lower.contains("growing") {
        GrowthTrend::Rising
    } else if lower.contains("declining") || lower.contains("decreasing") {
        GrowthTrend::Declining
    } else {
        GrowthTrend::Stable
    }
}

fn mean_volume(trends: &[TrendRecord]) -> f64 {
    trends.iter().map(|t| t.volume as f64).sum::<f64>() / trends.len() as f64
}

/// Compare the mean volume of the older half against the newer half
pub fn growth_trend(trends: &[TrendRecord]) -> GrowthTrend {
    if trends.len() < 2 {
        return GrowthTrend::Stable;
    }

    let (first, second) = trends.split_at(trends.len() / 2);
    let first_avg = mean_volume(first);
    if first_avg == 0.0 {
        return GrowthTrend::Stable;
    }

    let change = (mean_volume(second) - first_avg) / first_avg;
    if change > 0.5 {
        GrowthTrend::Viral
    } else if change > 0.1 {
        GrowthTrend::Rising
    } else if change < -0.1 {
        GrowthTrend::Declining
    } else {
        GrowthTrend::Stable
    }
}

/// Relative change between the first and last observation
pub fn growth_rate(trends: &[TrendRecord]) -> f64 {
    match (trends.first(), trends.last()) {
        (Some(first), Some(last)) if trends.len() >= 2 && first.volume > 0 => {
            (last.volume as f64 - first.volume as f64) / first.volume as f64
        }
        _ => 0.0,
    }
}

fn platform_label(platform: Option<PlatformType>) -> String {
    platform.map_or_else(|| "all".to_string(), |p| p.as_str().to_string())
}

fn check_days(days: i64, max: i64) -> Result<()> {
    if !(1..=max).contains(&days) {
        return Err(Error::validation(format!(
            "days must be between 1 and {max}, got {days}"
        )));
    }
    Ok(())
}

// ============================================================================
// Analyzer
// ============================================================================

/// Orchestrates collection, AI analysis, persistence and insights
#[derive(Clone)]
pub struct TrendsAnalyzer {
    store: Arc<TrendStore>,
    collector: TrendsCollector,
    insights: InsightsGenerator,
    providers: ProviderRegistry,
    notifier: WebhookNotifier,
    config: AnalysisConfig,
}

impl TrendsAnalyzer {
    pub fn new(
        store: Arc<TrendStore>,
        platforms: PlatformRegistry,
        providers: ProviderRegistry,
        notifier: WebhookNotifier,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            collector: TrendsCollector::new(platforms, store.clone(), &config),
            insights: InsightsGenerator::new(store.clone()),
            store,
            providers,
            notifier,
            config,
        }
    }

    pub fn collector(&self) -> &TrendsCollector {
        &self.collector
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn store(&self) -> &Arc<TrendStore> {
        &self.store
    }

    /// Run the full analysis pipeline for a topic
    pub async fn analyze_trends(&self, request: AnalyzeRequest) -> Result<AnalysisResponse> {
        request.validate()?;
        let topic = request.topic.trim();
        let provider = self.providers.get(request.ai_provider.as_deref())?;

        tracing::info!(topic = %topic, provider = %provider.name(), "Analyzing trends");

        if request.use_cache != Some(false) && self.config.cache_enabled {
            if let Some(cached) = self.cached_response(topic) {
                metrics::record_analysis(&cached.ai_provider, true);
                return Ok(cached);
            }
        }

        let platform_data = self
            .collector
            .collect_trends_data(topic, &request.platforms)
            .await;

        let prompt = prompts::analysis_prompt(topic, &platform_data);
        let ai_response = provider.analyze_content(&prompt).await?;

        let data_summary: Vec<serde_json::Value> = platform_data
            .iter()
            .map(|pd| {
                serde_json::json!({
                    "platform": pd.platform,
                    "trendCount": pd.trends.len(),
                    "postCount": pd.posts.len(),
                })
            })
            .collect();

        let now = Utc::now();
        let analysis = AnalysisRecord {
            id: Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            platforms: request.platforms.clone(),
            ai_provider: provider.name().to_string(),
            sentiment_score: Some(extract_sentiment(&ai_response.content)),
            predicted_growth: Some(extract_growth(&ai_response.content)),
            analysis_text: ai_response.content,
            tokens_used: ai_response.tokens,
            analyzed_at: now,
            metadata: serde_json::json!({ "platformDataSummary": data_summary }),
            created_at: now,
        };

        self.store.save_analysis(&analysis).map_err(Error::storage)?;
        self.save_posts(&analysis.id, &platform_data);
        let insights = self.insights.generate_and_save(&analysis, &platform_data);

        metrics::record_analysis(&analysis.ai_provider, false);
        tracing::info!(
            analysis_id = %analysis.id,
            tokens = analysis.tokens_used,
            insights = insights.len(),
            "Analysis complete"
        );

        let response = AnalysisResponse::build(&analysis, insights, false);

        if let Some(url) = request.webhook_url {
            self.spawn_webhook(url, &response);
        }

        Ok(response)
    }

    /// Most recent analysis of `topic` inside the cache window, if any
    fn cached_response(&self, topic: &str) -> Option<AnalysisResponse> {
        let since = Utc::now() - self.config.cache_window();

        let cached = match self.store.find_recent_analysis(topic, since) {
            Ok(found) => found?,
            Err(e) => {
                tracing::warn!(topic = %topic, error = %format!("{e:#}"), "Cache lookup failed");
                return None;
            }
        };

        let insights = match self.store.insights_for_analysis(&cached.id) {
            Ok(insights) => insights,
            Err(e) => {
                tracing::warn!(analysis_id = %cached.id, error = %format!("{e:#}"), "Failed to load cached insights");
                return None;
            }
        };

        tracing::info!(topic = %topic, analysis_id = %cached.id, "Returning cached analysis");
        Some(AnalysisResponse::build(&cached, insights, true))
    }

    fn save_posts(&self, analysis_id: &str, platform_data: &[PlatformData]) {
        let posts: Vec<PostRecord> = platform_data
            .iter()
            .flat_map(|pd| pd.posts.iter())
            .map(|post| PostRecord::from_post(analysis_id, post))
            .collect();

        if let Err(e) = self.store.save_posts(&posts) {
            tracing::error!(analysis_id = %analysis_id, error = %format!("{e:#}"), "Failed to save posts");
        }
    }

    fn spawn_webhook(&self, url: String, response: &AnalysisResponse) {
        let payload = match serde_json::to_value(response) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize webhook payload");
                return;
            }
        };

        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            let status = notifier.notify(&url, &payload).await;
            if status.success {
                tracing::info!(url = %url, attempts = status.attempts, "Webhook called successfully");
            }
        });
    }

    /// Volume timeline of a topic over the last `days` days
    pub fn get_trend_history(
        &self,
        topic: &str,
        platform: Option<PlatformType>,
        days: i64,
    ) -> Result<TrendHistory> {
        check_days(days, MAX_HISTORY_DAYS)?;

        let until = Utc::now();
        let since = until - Duration::days(days);
        let trends = self
            .store
            .trend_history(topic, platform, since, until)
            .map_err(Error::storage)?;

        let timeline = trends
            .iter()
            .map(|t| TimelinePoint {
                date: t.detected_at.format("%Y-%m-%d").to_string(),
                volume: t.volume,
                sentiment: 0.5,
            })
            .collect();

        Ok(TrendHistory {
            topic: topic.to_string(),
            platform: platform_label(platform),
            period: format!("{days} days"),
            timeline,
            trend: growth_trend(&trends),
            growth_rate: growth_rate(&trends),
        })
    }

    /// Stored insights on a topic from the last `days` days
    pub fn get_insights(
        &self,
        topic: &str,
        platform: Option<PlatformType>,
        days: i64,
    ) -> Result<InsightsReport> {
        check_days(days, MAX_INSIGHT_DAYS)?;

        let since = Utc::now() - Duration::days(days);
        let insights: Vec<InsightView> = self
            .store
            .find_insights(topic, platform, since)
            .map_err(Error::storage)?
            .into_iter()
            .map(InsightView::from)
            .collect();

        Ok(InsightsReport {
            topic: topic.to_string(),
            platform: platform_label(platform),
            count: insights.len(),
            insights,
        })
    }

    /// Side-by-side view of how a topic performs on each platform
    pub async fn compare_platforms(
        &self,
        topic: &str,
        platforms: &[PlatformType],
    ) -> Result<PlatformComparison> {
        if topic.trim().is_empty() {
            return Err(Error::validation("topic must not be empty"));
        }
        if platforms.is_empty() {
            return Err(Error::validation("platforms must contain at least one platform"));
        }

        let data = self.collector.collect_trends_data(topic, platforms).await;

        let mut best: Option<(PlatformType, f64, &'static str)> = None;
        let comparison = data
            .iter()
            .map(|pd| {
                let summary = insights::engagement_summary(&pd.posts);
                if let Some(s) = &summary {
                    if best.map_or(true, |(_, avg, _)| s.avg_engagement > avg) {
                        best = Some((pd.platform, s.avg_engagement, s.pattern));
                    }
                }

                PlatformComparisonItem {
                    platform: pd.platform,
                    volume: pd.trends.iter().map(|t| t.volume).sum(),
                    engagement: summary.map_or_else(|| "no data".to_string(), |s| s.pattern.to_string()),
                    best_content_type: insights::content_format(&pd.posts)
                        .map_or_else(|| "no data".to_string(), |f| f.format.to_string()),
                    optimal_posting_time: insights::best_time_slot(&pd.optimal_times).map(|slot| {
                        PostingTime {
                            day: slot.day.clone(),
                            hour: slot.hour,
                        }
                    }),
                    error: pd.error.clone(),
                }
            })
            .collect();

        let recommendation = match best {
            Some((platform, avg, pattern)) => format!(
                "Focus on {platform}: highest average engagement ({avg:.0} interactions per post) with {pattern}"
            ),
            None => "Not enough data to recommend a platform".to_string(),
        };

        Ok(PlatformComparison {
            topic: topic.to_string(),
            comparison,
            recommendation,
        })
    }

    /// AI summary of the latest stored trends
    pub async fn summarize_recent_trends(
        &self,
        platform: Option<PlatformType>,
        limit: usize,
        provider: Option<&str>,
    ) -> Result<TrendSummary> {
        let provider = self.providers.get(provider)?;
        let trends = self.collector.get_recent_trends(platform, limit)?;

        let payload: Vec<_> = trends
            .iter()
            .map(|t| {
                serde_json::json!({
                    "topic": t.topic,
                    "platform": t.platform,
                    "volume": t.volume,
                    "score": t.trending_score,
                })
            })
            .collect();
        let summary = provider
            .summarize_trends(&serde_json::Value::Array(payload))
            .await?;

        Ok(TrendSummary {
            platform: platform_label(platform),
            count: trends.len(),
            summary,
            ai_provider: provider.name().to_string(),
        })
    }

    /// Free-form AI insights over freshly collected platform data
    pub async fn generate_ai_insights(
        &self,
        topic: &str,
        platforms: &[PlatformType],
        provider: Option<&str>,
    ) -> Result<AiInsightsReport> {
        if topic.trim().is_empty() {
            return Err(Error::validation("topic must not be empty"));
        }
        if platforms.is_empty() {
            return Err(Error::validation("platforms must contain at least one platform"));
        }
        let provider = self.providers.get(provider)?;

        let data = self.collector.collect_trends_data(topic, platforms).await;
        let payload = serde_json::json!({
            "topic": topic,
            "platforms": data,
        });
        let response = provider.generate_insights(&payload).await?;

        Ok(AiInsightsReport {
            topic: topic.to_string(),
            insights: response.content,
            ai_provider: provider.name().to_string(),
            model: response.model,
            tokens_used: response.tokens,
        })
    }

    /// Predict how `content` would perform on `platform`
    pub async fn predict_performance(
        &self,
        content: &serde_json::Value,
        platform: PlatformType,
        provider: Option<&str>,
    ) -> Result<PredictionReport> {
        if content.is_null() {
            return Err(Error::validation("content must not be empty"));
        }
        let provider = self.providers.get(provider)?;
        let prediction = provider
            .predict_performance(content, platform.as_str())
            .await?;

        Ok(PredictionReport {
            platform,
            prediction,
            ai_provider: provider.name().to_string(),
        })
    }

    /// Delete analyses older than the retention window
    pub fn purge_expired(&self) -> Result<usize> {
        let cutoff = Utc::now() - Duration::days(i64::from(self.config.retention_days));
        let deleted = self
            .store
            .delete_analyses_before(cutoff)
            .map_err(Error::storage)?;

        tracing::info!(deleted, cutoff = %cutoff, "Purged expired analyses");
        Ok(deleted)
    }
}
