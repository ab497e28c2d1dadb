//! Fan-out collection of per-platform data

use std::sync::Arc;

use futures::future::join_all;

use crate::config::AnalysisConfig;
use crate::error::{Error, Result};
use crate::metrics;
use crate::models::{PlatformData, PlatformType, TrendRecord};
use crate::platforms::PlatformRegistry;
use crate::storage::TrendStore;

/// Gathers trends, posts and posting times from every requested platform
#[derive(Clone)]
pub struct TrendsCollector {
    platforms: PlatformRegistry,
    store: Arc<TrendStore>,
    max_trends_per_platform: usize,
    max_posts_per_trend: usize,
}

impl TrendsCollector {
    pub fn new(platforms: PlatformRegistry, store: Arc<TrendStore>, config: &AnalysisConfig) -> Self {
        Self {
            platforms,
            store,
            max_trends_per_platform: config.max_trends_per_platform,
            max_posts_per_trend: config.max_posts_per_trend,
        }
    }

    pub fn platforms(&self) -> &PlatformRegistry {
        &self.platforms
    }

    /// Collect data for `topic` on every platform concurrently
    ///
    /// Never fails: a platform that errors yields an entry with `error` set
    /// and empty lists. Output order follows `platforms`.
    pub async fn collect_trends_data(
        &self,
        topic: &str,
        platforms: &[PlatformType],
    ) -> Vec<PlatformData> {
        tracing::info!(topic = %topic, platforms = ?platforms, "Collecting trends data");

        let tasks = platforms.iter().map(|&platform| async move {
            match self.collect_platform(topic, platform).await {
                Ok(data) => {
                    metrics::record_platform_collection(platform.as_str(), data.trends.len(), false);
                    data
                }
                Err(e) => {
                    tracing::error!(platform = %platform, error = %e, "Failed to collect platform data");
                    metrics::record_platform_collection(platform.as_str(), 0, true);
                    PlatformData::failed(platform, e.to_string())
                }
            }
        });

        join_all(tasks).await
    }

    async fn collect_platform(&self, topic: &str, platform: PlatformType) -> Result<PlatformData> {
        let strategy = self.platforms.get(platform)?;

        let trends = strategy
            .fetch_trending_topics(self.max_trends_per_platform)
            .await?;

        let records: Vec<TrendRecord> = trends.iter().map(TrendRecord::from_topic).collect();
        self.store.save_trends(&records).map_err(Error::storage)?;

        let posts = strategy
            .fetch_top_posts(topic, self.max_posts_per_trend)
            .await?;
        let optimal_times = strategy.optimal_posting_times().await?;

        tracing::debug!(
            platform = %platform,
            trends = trends.len(),
            posts = posts.len(),
            "Collected platform data"
        );

        Ok(PlatformData {
            platform,
            trends,
            posts,
            optimal_times,
            error: None,
        })
    }

    /// Latest stored trend observations
    pub fn get_recent_trends(
        &self,
        platform: Option<PlatformType>,
        limit: usize,
    ) -> Result<Vec<TrendRecord>> {
        self.store
            .recent_trends(platform, limit)
            .map_err(Error::storage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collector(store: Arc<TrendStore>) -> TrendsCollector {
        let config = AnalysisConfig {
            max_trends_per_platform: 3,
            max_posts_per_trend: 4,
            ..AnalysisConfig::default()
        };
        TrendsCollector::new(PlatformRegistry::with_defaults(), store, &config)
    }

    #[tokio::test]
    async fn test_collect_respects_limits_and_persists() {
        let store = Arc::new(TrendStore::in_memory().unwrap());
        let collector = collector(store.clone());

        let data = collector
            .collect_trends_data("AI", &[PlatformType::Twitter, PlatformType::Instagram])
            .await;

        assert_eq!(data.len(), 2);
        assert_eq!(data[0].platform, PlatformType::Twitter);
        assert_eq!(data[1].platform, PlatformType::Instagram);
        assert!(data.iter().all(|d| d.error.is_none()));
        assert!(data.iter().all(|d| d.trends.len() == 3 && d.posts.len() == 4));
        assert_eq!(store.stats().unwrap().trends, 6);

        let recent = collector.get_recent_trends(Some(PlatformType::Twitter), 10).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent.iter().any(|t| t.topic == "AI" && t.trending_score == 5.0));
    }

    #[tokio::test]
    async fn test_unknown_platform_becomes_error_entry() {
        let store = Arc::new(TrendStore::in_memory().unwrap());
        let collector = collector(store);

        let data = collector
            .collect_trends_data("AI", &[PlatformType::Tiktok, PlatformType::Twitter])
            .await;

        assert_eq!(data.len(), 2);
        assert_eq!(data[0].platform, PlatformType::Tiktok);
        let err = data[0].error.as_deref().unwrap();
        assert!(err.contains("Platform 'tiktok' not found"));
        assert!(data[0].trends.is_empty() && data[0].posts.is_empty());
        assert!(data[1].error.is_none());
    }
}
