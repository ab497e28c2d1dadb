//! SQLite store tests against real database files

use chrono::{Duration, Utc};
use tempfile::TempDir;

use trendscope::models::{
    AnalysisRecord, EngagementMetrics, GrowthTrend, InsightRecord, InsightType, PlatformPost,
    PlatformType, PostRecord, TrendRecord, TrendingTopic,
};
use trendscope::storage::TrendStore;

fn analysis(topic: &str, age: Duration) -> AnalysisRecord {
    let at = Utc::now() - age;
    AnalysisRecord {
        id: uuid::Uuid::new_v4().to_string(),
        topic: topic.to_string(),
        platforms: vec![PlatformType::Twitter, PlatformType::Instagram],
        ai_provider: "anthropic".to_string(),
        analysis_text: "rising interest".to_string(),
        sentiment_score: Some(0.5),
        predicted_growth: Some(GrowthTrend::Rising),
        tokens_used: 321,
        analyzed_at: at,
        metadata: serde_json::json!({"platformDataSummary": []}),
        created_at: at,
    }
}

fn trend(topic: &str, volume: u64, age: Duration) -> TrendRecord {
    TrendRecord::from_topic(&TrendingTopic {
        name: topic.to_string(),
        volume,
        platform: PlatformType::Twitter,
        timestamp: Utc::now() - age,
        metadata: serde_json::json!({"source": "mock"}),
    })
}

fn post(analysis_id: &str) -> PostRecord {
    PostRecord::from_post(
        analysis_id,
        &PlatformPost {
            id: "twitter_0_1".to_string(),
            content: "Mock post #AI".to_string(),
            author: "user_0".to_string(),
            platform: PlatformType::Twitter,
            engagement_metrics: EngagementMetrics {
                likes: 10,
                shares: 2,
                comments: 1,
                ..Default::default()
            },
            posted_at: Utc::now(),
            metadata: serde_json::json!({}),
        },
    )
}

#[test]
fn test_data_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("nested").join("trends.db");

    let record = analysis("AI", Duration::minutes(5));
    {
        let store = TrendStore::new(&db_path).unwrap();
        store.save_analysis(&record).unwrap();
        store.save_trends(&[trend("AI", 100, Duration::hours(1))]).unwrap();
    }

    let store = TrendStore::new(&db_path).unwrap();
    let loaded = store.find_analysis(&record.id).unwrap().unwrap();
    assert_eq!(loaded.topic, "AI");
    assert_eq!(loaded.platforms, record.platforms);
    assert_eq!(loaded.predicted_growth, Some(GrowthTrend::Rising));
    assert_eq!(loaded.tokens_used, 321);
    assert_eq!(loaded.metadata, record.metadata);
    assert_eq!(store.stats().unwrap().trends, 1);
}

#[test]
fn test_recent_analysis_respects_window() {
    let dir = TempDir::new().unwrap();
    let store = TrendStore::new(dir.path().join("trends.db")).unwrap();

    store.save_analysis(&analysis("AI", Duration::hours(3))).unwrap();
    assert!(store
        .find_recent_analysis("AI", Utc::now() - Duration::hours(1))
        .unwrap()
        .is_none());

    let fresh = analysis("AI", Duration::minutes(10));
    store.save_analysis(&fresh).unwrap();
    let found = store
        .find_recent_analysis("AI", Utc::now() - Duration::hours(1))
        .unwrap()
        .unwrap();
    assert_eq!(found.id, fresh.id);

    assert!(store
        .find_recent_analysis("Gaming", Utc::now() - Duration::hours(1))
        .unwrap()
        .is_none());
}

#[test]
fn test_purge_cascades_to_insights_and_posts() {
    let dir = TempDir::new().unwrap();
    let store = TrendStore::new(dir.path().join("trends.db")).unwrap();

    let old = analysis("AI", Duration::days(100));
    let recent = analysis("AI", Duration::days(1));
    for record in [&old, &recent] {
        store.save_analysis(record).unwrap();
        store
            .save_insights(&[InsightRecord::new(
                &record.id,
                InsightType::Hashtags,
                "Popular Hashtags on twitter".to_string(),
                "Top performing hashtags: #AI".to_string(),
                0.75,
                serde_json::json!({"platform": "twitter"}),
            )])
            .unwrap();
        store.save_posts(&[post(&record.id)]).unwrap();
    }

    let deleted = store
        .delete_analyses_before(Utc::now() - Duration::days(90))
        .unwrap();
    assert_eq!(deleted, 1);

    let stats = store.stats().unwrap();
    assert_eq!(stats.analyses, 1);
    assert_eq!(stats.insights, 1);
    assert_eq!(stats.posts, 1);
    assert!(store.insights_for_analysis(&old.id).unwrap().is_empty());
    assert_eq!(store.posts_for_analysis(&recent.id).unwrap().len(), 1);
}

#[test]
fn test_trend_history_window_and_order() {
    let dir = TempDir::new().unwrap();
    let store = TrendStore::new(dir.path().join("trends.db")).unwrap();

    store
        .save_trends(&[
            trend("AI", 300, Duration::days(1)),
            trend("AI", 100, Duration::days(3)),
            trend("AI", 200, Duration::days(2)),
            trend("AI", 50, Duration::days(10)),
            trend("Gaming", 999, Duration::days(1)),
        ])
        .unwrap();

    let now = Utc::now();
    let history = store
        .trend_history("AI", Some(PlatformType::Twitter), now - Duration::days(7), now)
        .unwrap();
    let volumes: Vec<u64> = history.iter().map(|t| t.volume).collect();
    assert_eq!(volumes, vec![100, 200, 300]);

    let instagram = store
        .trend_history("AI", Some(PlatformType::Instagram), now - Duration::days(7), now)
        .unwrap();
    assert!(instagram.is_empty());
}

#[test]
fn test_find_insights_filters_by_platform_and_age() {
    let dir = TempDir::new().unwrap();
    let store = TrendStore::new(dir.path().join("trends.db")).unwrap();

    let record = analysis("AI", Duration::hours(2));
    store.save_analysis(&record).unwrap();
    store
        .save_insights(&[
            InsightRecord::new(
                &record.id,
                InsightType::BestTime,
                "Optimal Posting Time for twitter".to_string(),
                "Best engagement on Tuesday at 14:00".to_string(),
                0.91,
                serde_json::json!({"platform": "twitter"}),
            ),
            InsightRecord::new(
                &record.id,
                InsightType::BestTime,
                "Optimal Posting Time for instagram".to_string(),
                "Best engagement on Wednesday at 15:00".to_string(),
                0.9,
                serde_json::json!({"platform": "instagram"}),
            ),
        ])
        .unwrap();

    let since = Utc::now() - Duration::days(7);
    assert_eq!(store.find_insights("AI", None, since).unwrap().len(), 2);

    let instagram = store
        .find_insights("AI", Some(PlatformType::Instagram), since)
        .unwrap();
    assert_eq!(instagram.len(), 1);
    assert_eq!(instagram[0].platform(), Some("instagram"));

    assert!(store
        .find_insights("AI", None, Utc::now() - Duration::hours(1))
        .unwrap()
        .is_empty());
}
