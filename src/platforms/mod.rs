//! Platform strategies
//!
//! Each supported social network implements [`PlatformStrategy`]. The
//! [`PlatformRegistry`] resolves a [`PlatformType`] to its strategy so the
//! collector can fan out over whatever set of platforms a request names.
//!
//! Strategies currently generate mock data; no platform API is contacted.

pub mod instagram;
pub mod twitter;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use thiserror::Error;

use crate::models::{EngagementMetrics, PlatformPost, PlatformType, TimeSlot, TrendingTopic};

pub use instagram::InstagramStrategy;
pub use twitter::TwitterStrategy;

/// Errors raised by platform strategies and the registry
#[derive(Debug, Error)]
pub enum PlatformError {
    /// No strategy registered for the platform
    #[error("Platform '{platform}' not found. Available platforms: {available}")]
    NotFound {
        platform: PlatformType,
        available: String,
    },
}

/// Result type for platform operations
pub type PlatformResult<T> = Result<T, PlatformError>;

/// Common interface for all social platforms
#[async_trait]
pub trait PlatformStrategy: Send + Sync {
    /// Fetch trending topics, at most `limit`
    async fn fetch_trending_topics(&self, limit: usize) -> PlatformResult<Vec<TrendingTopic>>;

    /// Fetch the top posts for a topic, at most `limit`
    async fn fetch_top_posts(&self, topic: &str, limit: usize) -> PlatformResult<Vec<PlatformPost>>;

    /// Analyze engagement for a specific post
    async fn analyze_engagement(&self, post_id: &str) -> PlatformResult<EngagementMetrics>;

    /// Best weekly posting slots
    async fn optimal_posting_times(&self) -> PlatformResult<Vec<TimeSlot>>;

    /// Platform identifier
    fn platform(&self) -> PlatformType;
}

/// Lookup table from platform to strategy
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    strategies: HashMap<PlatformType, Arc<dyn PlatformStrategy>>,
}

impl PlatformRegistry {
    /// Build a registry from a list of strategies, keyed by their platform
    pub fn new(strategies: Vec<Arc<dyn PlatformStrategy>>) -> Self {
        let strategies = strategies
            .into_iter()
            .map(|s| (s.platform(), s))
            .collect();
        Self { strategies }
    }

    /// Registry with every built-in strategy
    pub fn with_defaults() -> Self {
        Self::new(vec![
            Arc::new(TwitterStrategy::new()) as Arc<dyn PlatformStrategy>,
            Arc::new(InstagramStrategy::new()),
        ])
    }

    /// Get a strategy by platform
    pub fn get(&self, platform: PlatformType) -> PlatformResult<Arc<dyn PlatformStrategy>> {
        self.strategies
            .get(&platform)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                platform,
                available: self
                    .available()
                    .iter()
                    .map(|p| p.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Get strategies for several platforms, failing on the first unknown one
    pub fn get_many(
        &self,
        platforms: &[PlatformType],
    ) -> PlatformResult<Vec<Arc<dyn PlatformStrategy>>> {
        platforms.iter().map(|p| self.get(*p)).collect()
    }

    /// Registered platforms in declaration order
    pub fn available(&self) -> Vec<PlatformType> {
        PlatformType::all()
            .into_iter()
            .filter(|p| self.strategies.contains_key(p))
            .collect()
    }

    pub fn has(&self, platform: PlatformType) -> bool {
        self.strategies.contains_key(&platform)
    }
}

/// Upper bounds used when generating random engagement numbers
#[derive(Debug, Clone, Copy)]
pub(crate) struct EngagementProfile {
    pub likes: u64,
    pub shares: u64,
    pub comments: u64,
    pub views: u64,
    pub max_engagement_rate: f64,
}

impl EngagementProfile {
    pub(crate) fn sample(&self) -> EngagementMetrics {
        let mut rng = rand::thread_rng();
        EngagementMetrics {
            likes: rng.gen_range(0..self.likes),
            shares: rng.gen_range(0..self.shares),
            comments: rng.gen_range(0..self.comments),
            views: Some(rng.gen_range(0..self.views)),
            engagement_rate: Some(rng.gen::<f64>() * self.max_engagement_rate),
            virality_score: Some(rng.gen::<f64>()),
        }
    }
}

/// Random timestamp within the last week
pub(crate) fn random_recent_timestamp() -> chrono::DateTime<Utc> {
    let secs = rand::thread_rng().gen_range(0..7 * 24 * 60 * 60);
    Utc::now() - Duration::seconds(secs)
}

/// Hashtag form of a topic ("Climate Change" -> "ClimateChange")
pub(crate) fn topic_hashtag(topic: &str) -> String {
    topic.split_whitespace().collect()
}

/// Turn a static `(name, volume)` table into trending topics
pub(crate) fn mock_topics(
    table: &[(&str, u64)],
    limit: usize,
    platform: PlatformType,
    metadata: serde_json::Value,
) -> Vec<TrendingTopic> {
    let now = Utc::now();
    table
        .iter()
        .take(limit)
        .map(|(name, volume)| TrendingTopic {
            name: (*name).to_string(),
            volume: *volume,
            platform,
            timestamp: now,
            metadata: metadata.clone(),
        })
        .collect()
}
