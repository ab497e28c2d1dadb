// Core data structures for the trends analyzer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Supported social media platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformType {
    Twitter,
    Instagram,
    Tiktok,
    Linkedin,
    Youtube,
}

impl PlatformType {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Instagram => "instagram",
            Self::Tiktok => "tiktok",
            Self::Linkedin => "linkedin",
            Self::Youtube => "youtube",
        }
    }

    /// Create from string (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "twitter" => Some(Self::Twitter),
            "instagram" => Some(Self::Instagram),
            "tiktok" => Some(Self::Tiktok),
            "linkedin" => Some(Self::Linkedin),
            "youtube" => Some(Self::Youtube),
            _ => None,
        }
    }

    /// Get all platforms
    pub fn all() -> Vec<Self> {
        vec![
            Self::Twitter,
            Self::Instagram,
            Self::Tiktok,
            Self::Linkedin,
            Self::Youtube,
        ]
    }
}

impl std::fmt::Display for PlatformType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Predicted direction of a topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum GrowthTrend {
    Rising,
    Declining,
    #[default]
    Stable,
    Viral,
}

impl GrowthTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rising => "rising",
            Self::Declining => "declining",
            Self::Stable => "stable",
            Self::Viral => "viral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "rising" => Some(Self::Rising),
            "declining" => Some(Self::Declining),
            "stable" => Some(Self::Stable),
            "viral" => Some(Self::Viral),
            _ => None,
        }
    }
}

/// Kind of derived insight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    BestTime,
    Hashtags,
    ContentFormat,
    EngagementPattern,
    CompetitorStrategy,
    AudienceSentiment,
    TrendPrediction,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestTime => "best_time",
            Self::Hashtags => "hashtags",
            Self::ContentFormat => "content_format",
            Self::EngagementPattern => "engagement_pattern",
            Self::CompetitorStrategy => "competitor_strategy",
            Self::AudienceSentiment => "audience_sentiment",
            Self::TrendPrediction => "trend_prediction",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "best_time" => Some(Self::BestTime),
            "hashtags" => Some(Self::Hashtags),
            "content_format" => Some(Self::ContentFormat),
            "engagement_pattern" => Some(Self::EngagementPattern),
            "competitor_strategy" => Some(Self::CompetitorStrategy),
            "audience_sentiment" => Some(Self::AudienceSentiment),
            "trend_prediction" => Some(Self::TrendPrediction),
            _ => None,
        }
    }
}

// ============================================================================
// Platform data
// ============================================================================

/// Topic reported as trending by a platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendingTopic {
    pub name: String,
    pub volume: u64,
    pub platform: PlatformType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Interaction counters for a single post
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virality_score: Option<f64>,
}

impl EngagementMetrics {
    /// Likes + shares + comments
    pub fn total_interactions(&self) -> u64 {
        self.likes + self.shares + self.comments
    }
}

/// A post fetched from a platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformPost {
    pub id: String,
    pub content: String,
    pub author: String,
    pub platform: PlatformType,
    pub engagement_metrics: EngagementMetrics,
    pub posted_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl PlatformPost {
    /// Whether the post metadata flags attached media
    pub fn has_media(&self) -> bool {
        self.metadata
            .get("hasMedia")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Weekly posting slot with its relative engagement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub day: String,
    pub hour: u8,
    pub engagement_score: f64,
}

impl TimeSlot {
    pub fn new(day: &str, hour: u8, engagement_score: f64) -> Self {
        Self {
            day: day.to_string(),
            hour,
            engagement_score,
        }
    }
}

/// Everything collected from one platform for one topic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformData {
    pub platform: PlatformType,
    pub trends: Vec<TrendingTopic>,
    pub posts: Vec<PlatformPost>,
    pub optimal_times: Vec<TimeSlot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PlatformData {
    /// Entry for a platform whose collection failed
    pub fn failed(platform: PlatformType, error: impl Into<String>) -> Self {
        Self {
            platform,
            trends: Vec::new(),
            posts: Vec::new(),
            optimal_times: Vec::new(),
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// Persisted records
// ============================================================================

/// Stored trending topic observation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendRecord {
    pub id: String,
    pub topic: String,
    pub platform: PlatformType,
    pub volume: u64,
    pub trending_score: f64,
    pub detected_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl TrendRecord {
    /// Build a record from a fetched topic; score is volume / 10000
    pub fn from_topic(topic: &TrendingTopic) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.name.clone(),
            platform: topic.platform,
            volume: topic.volume,
            trending_score: topic.volume as f64 / 10_000.0,
            detected_at: topic.timestamp,
            metadata: topic.metadata.clone(),
            created_at: Utc::now(),
        }
    }
}

/// Stored AI analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRecord {
    pub id: String,
    pub topic: String,
    pub platforms: Vec<PlatformType>,
    pub ai_provider: String,
    pub analysis_text: String,
    pub sentiment_score: Option<f64>,
    pub predicted_growth: Option<GrowthTrend>,
    pub tokens_used: u64,
    pub analyzed_at: DateTime<Utc>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Stored insight attached to an analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightRecord {
    pub id: String,
    pub analysis_id: String,
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    pub confidence_score: f64,
    pub actionable: bool,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl InsightRecord {
    /// Create an actionable insight for an analysis
    pub fn new(
        analysis_id: &str,
        insight_type: InsightType,
        title: String,
        description: String,
        confidence_score: f64,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            analysis_id: analysis_id.to_string(),
            insight_type,
            title,
            description,
            confidence_score,
            actionable: true,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Platform named in the insight metadata, if any
    pub fn platform(&self) -> Option<&str> {
        self.metadata.get("platform").and_then(|v| v.as_str())
    }
}

/// Stored post that contributed to an analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: String,
    pub analysis_id: String,
    pub platform: PlatformType,
    pub post_id: String,
    pub content: String,
    pub author: Option<String>,
    pub engagement_metrics: EngagementMetrics,
    pub posted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl PostRecord {
    pub fn from_post(analysis_id: &str, post: &PlatformPost) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            analysis_id: analysis_id.to_string(),
            platform: post.platform,
            post_id: post.id.clone(),
            content: post.content.clone(),
            author: Some(post.author.clone()).filter(|a| !a.is_empty()),
            engagement_metrics: post.engagement_metrics.clone(),
            posted_at: post.posted_at,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_string_roundtrip() {
        for platform in PlatformType::all() {
            assert_eq!(PlatformType::parse(platform.as_str()), Some(platform));
        }
        assert_eq!(PlatformType::parse("Twitter"), Some(PlatformType::Twitter));
        assert!(PlatformType::parse("myspace").is_none());
    }

    #[test]
    fn test_platform_serde_lowercase() {
        let json = serde_json::to_string(&PlatformType::Instagram).unwrap();
        assert_eq!(json, "\"instagram\"");
        let parsed: PlatformType = serde_json::from_str("\"youtube\"").unwrap();
        assert_eq!(parsed, PlatformType::Youtube);
    }

    #[test]
    fn test_insight_type_wire_names() {
        let json = serde_json::to_string(&InsightType::EngagementPattern).unwrap();
        assert_eq!(json, "\"engagement_pattern\"");
        assert_eq!(InsightType::parse("best_time"), Some(InsightType::BestTime));
        assert!(InsightType::parse("unknown").is_none());
    }

    #[test]
    fn test_trend_record_score() {
        let topic = TrendingTopic {
            name: "AI".to_string(),
            volume: 50_000,
            platform: PlatformType::Twitter,
            timestamp: Utc::now(),
            metadata: serde_json::json!({"source": "mock"}),
        };
        let record = TrendRecord::from_topic(&topic);
        assert_eq!(record.topic, "AI");
        assert!((record.trending_score - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_post_has_media() {
        let mut post = PlatformPost {
            id: "p1".to_string(),
            content: "hello".to_string(),
            author: "someone".to_string(),
            platform: PlatformType::Twitter,
            engagement_metrics: EngagementMetrics::default(),
            posted_at: Utc::now(),
            metadata: serde_json::Value::Null,
        };
        assert!(!post.has_media());
        post.metadata = serde_json::json!({"hasMedia": true});
        assert!(post.has_media());
    }

    #[test]
    fn test_engagement_metrics_camel_case() {
        let metrics = EngagementMetrics {
            likes: 1,
            shares: 2,
            comments: 3,
            engagement_rate: Some(0.5),
            ..Default::default()
        };
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["engagementRate"], 0.5);
        assert!(json.get("views").is_none());
        assert_eq!(metrics.total_interactions(), 6);
    }
}
