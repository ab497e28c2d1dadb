//! Instagram strategy (mock data)
//!
//! Every generated post is flagged `hasMedia` since Instagram posts are
//! images, carousels or reels.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

use super::{
    mock_topics, random_recent_timestamp, topic_hashtag, EngagementProfile, PlatformResult,
    PlatformStrategy,
};
use crate::models::{EngagementMetrics, PlatformPost, PlatformType, TimeSlot, TrendingTopic};

const TRENDING: &[(&str, u64)] = &[
    ("Photography", 45_000),
    ("Fashion", 42_000),
    ("Travel", 38_000),
    ("Food", 35_000),
    ("Fitness", 30_000),
    ("Beauty", 28_000),
    ("Art", 25_000),
    ("Lifestyle", 22_000),
    ("Nature", 18_000),
    ("Design", 15_000),
];

const ENGAGEMENT: EngagementProfile = EngagementProfile {
    likes: 50_000,
    shares: 2_000,
    comments: 3_000,
    views: 200_000,
    max_engagement_rate: 0.15,
};

#[derive(Debug, Clone, Default)]
pub struct InstagramStrategy;

impl InstagramStrategy {
    pub fn new() -> Self {
        Self
    }

    fn build_post(topic: &str, index: usize, stamp: i64) -> PlatformPost {
        let mut rng = rand::thread_rng();
        let post_type = if rng.gen_bool(0.5) { "carousel" } else { "single" };
        let has_reel = rng.gen_bool(0.3);

        PlatformPost {
            id: format!("instagram_{index}_{stamp}"),
            content: format!(
                "Mock Instagram post about {topic}. Beautiful content! #{} #instagood #photooftheday",
                topic_hashtag(topic)
            ),
            author: format!("@instagrammer_{index}"),
            platform: PlatformType::Instagram,
            engagement_metrics: ENGAGEMENT.sample(),
            posted_at: random_recent_timestamp(),
            metadata: serde_json::json!({
                "source": "mock",
                "postType": post_type,
                "hasReel": has_reel,
                "hasMedia": true,
            }),
        }
    }
}

#[async_trait]
impl PlatformStrategy for InstagramStrategy {
    async fn fetch_trending_topics(&self, limit: usize) -> PlatformResult<Vec<TrendingTopic>> {
        Ok(mock_topics(
            TRENDING,
            limit,
            PlatformType::Instagram,
            serde_json::json!({"source": "mock", "contentType": "mixed"}),
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
            TimeSlot::new("Monday", 11, 0.82),
            TimeSlot::new("Tuesday", 11, 0.85),
            TimeSlot::new("Wednesday", 11, 0.88),
            TimeSlot::new("Wednesday", 15, 0.90),
            TimeSlot::new("Thursday", 11, 0.87),
            TimeSlot::new("Thursday", 17, 0.89),
            TimeSlot::new("Friday", 9, 0.84),
            TimeSlot::new("Friday", 13, 0.86),
        ])
    }

    fn platform(&self) -> PlatformType {
        PlatformType::Instagram
    }
}
