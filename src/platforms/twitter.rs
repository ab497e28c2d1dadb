//! Twitter strategy (mock data)

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use super::{
    mock_topics, random_recent_timestamp, topic_hashtag, EngagementProfile, PlatformResult,
    PlatformStrategy,
};
use crate::models::{EngagementMetrics, PlatformPost, PlatformType, TimeSlot, TrendingTopic};

const TRENDING: &[(&str, u64)] = &[
    ("AI", 50_000),
    ("Technology", 35_000),
    ("Climate Change", 28_000),
    ("Cryptocurrency", 22_000),
    ("Space Exploration", 18_000),
    ("Gaming", 15_000),
    ("Electric Vehicles", 12_000),
    ("Machine Learning", 10_000),
    ("Remote Work", 8_500),
    ("Sustainable Energy", 7_200),
];

const ENGAGEMENT: EngagementProfile = EngagementProfile {
    likes: 10_000,
    shares: 5_000,
    comments: 1_000,
    views: 100_000,
    max_engagement_rate: 0.1,
};

#[derive(Debug, Clone, Default)]
pub struct TwitterStrategy;

impl TwitterStrategy {
    pub fn new() -> Self {
        Self
    }

    fn build_post(topic: &str, index: usize, stamp: i64) -> PlatformPost {
        PlatformPost {
            id: format!("twitter_{index}_{stamp}"),
            content: format!(
                "Mock post about {topic}. This is sample content for testing. #{} #trending",
                topic_hashtag(topic)
            ),
            author: format!("user_{index}"),
            platform: PlatformType::Twitter,
            engagement_metrics: ENGAGEMENT.sample(),
            posted_at: random_recent_timestamp(),
            metadata: serde_json::json!({
                "source": "mock",
                "verified": rand::thread_rng().gen_bool(0.5),
            }),
        }
    }
}

#[async_trait]
impl PlatformStrategy for TwitterStrategy {
    async fn fetch_trending_topics(&self, limit: usize) -> PlatformResult<Vec<TrendingTopic>> {
        Ok(mock_topics(
            TRENDING,
            limit,
            PlatformType::Twitter,
            serde_json::json!({"source": "mock", "region": "global"}),
        ))
    }

    async fn fetch_top_posts(&self, topic: &str, limit: usize) -> PlatformResult<Vec<PlatformPost>> {
        let stamp = Utc::now().timestamp_millis();
        Ok((0..limit)
            .map(|i| Self::build_post(topic, i, stamp))
            .collect())
    }

    async fn analyze_engagement(&self, _post_id: &str) -> PlatformResult<EngagementMetrics> {
        Ok(ENGAGEMENT.sample())
    }

    async fn optimal_posting_times(&self) -> PlatformResult<Vec<TimeSlot>> {
        Ok(vec![
            TimeSlot::new("Monday", 12, 0.85),
            TimeSlot::new("Monday", 15, 0.82),
            TimeSlot::new("Tuesday", 9, 0.88),
            TimeSlot::new("Tuesday", 14, 0.91),
            TimeSlot::new("Wednesday", 12, 0.89),
            TimeSlot::new("Wednesday", 17, 0.87),
            TimeSlot::new("Thursday", 10, 0.86),
            TimeSlot::new("Friday", 9, 0.83),
        ])
    }

    fn platform(&self) -> PlatformType {
        PlatformType::Twitter
    }
}
