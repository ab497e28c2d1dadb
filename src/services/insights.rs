//! Rule-based insights derived from collected platform data
//!
//! Four heuristics run over every platform entry: best posting time,
//! popular hashtags, best content format and engagement pattern. Insights
//! are grouped by heuristic, then by platform in request order.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::models::{AnalysisRecord, InsightRecord, InsightType, PlatformData, PlatformPost, TimeSlot};
use crate::storage::TrendStore;

static HASHTAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#\w+").expect("hashtag regex"));

const TOP_HASHTAGS: usize = 5;
const LONG_FORM_CHARS: usize = 280;

/// Per-post content feature counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatStats {
    pub has_media: usize,
    pub has_links: usize,
    pub has_hashtags: usize,
    pub long_form: usize,
    pub short_form: usize,
}

/// Winning content format for a set of posts
#[derive(Debug, Clone, PartialEq)]
pub struct ContentFormat {
    pub format: &'static str,
    pub confidence: f64,
    pub stats: FormatStats,
}

/// Average interactions per post
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementSummary {
    pub pattern: &'static str,
    pub avg_engagement: f64,
    pub avg_likes: f64,
    pub avg_shares: f64,
    pub avg_comments: f64,
}

/// Slot with the highest engagement score; the first one wins ties
pub fn best_time_slot(slots: &[TimeSlot]) -> Option<&TimeSlot> {
    slots.iter().fold(None, |best, slot| match best {
        Some(b) if slot.engagement_score <= b.engagement_score => Some(b),
        _ => Some(slot),
    })
}

/// Most frequent hashtags across posts, ties in first-seen order
pub fn top_hashtags(posts: &[PlatformPost], limit: usize) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for post in posts {
        for tag in HASHTAG_REGEX.find_iter(&post.content).map(|m| m.as_str()) {
            let count = counts.entry(tag).or_insert(0);
            if *count == 0 {
                order.push(tag);
            }
            *count += 1;
        }
    }

    // stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.into_iter().take(limit).map(str::to_string).collect()
}

/// Classify the dominant content format; `None` without posts
pub fn content_format(posts: &[PlatformPost]) -> Option<ContentFormat> {
    if posts.is_empty() {
        return None;
    }

    let mut stats = FormatStats::default();
    for post in posts {
        if post.has_media() {
            stats.has_media += 1;
        }
        if post.content.contains("http") {
            stats.has_links += 1;
        }
        if post.content.contains('#') {
            stats.has_hashtags += 1;
        }
        if post.content.chars().count() > LONG_FORM_CHARS {
            stats.long_form += 1;
        } else {
            stats.short_form += 1;
        }
    }

    let total = posts.len() as f64;
    let (format, confidence) = if stats.has_media as f64 / total > 0.7 {
        ("visual content (images/videos)", 0.85)
    } else if stats.long_form as f64 / total > 0.6 {
        ("long-form text posts", 0.75)
    } else {
        ("mixed content", 0.6)
    };

    Some(ContentFormat {
        format,
        confidence,
        stats,
    })
}

/// Average engagement and its dominant driver; `None` without posts
pub fn engagement_summary(posts: &[PlatformPost]) -> Option<EngagementSummary> {
    if posts.is_empty() {
        return None;
    }

    let n = posts.len() as f64;
    let avg = |f: fn(&PlatformPost) -> u64| posts.iter().map(|p| f(p) as f64).sum::<f64>() / n;
    let avg_likes = avg(|p| p.engagement_metrics.likes);
    let avg_shares = avg(|p| p.engagement_metrics.shares);
    let avg_comments = avg(|p| p.engagement_metrics.comments);

    let pattern = if avg_likes > avg_shares * 5.0 && avg_likes > avg_comments * 5.0 {
        "like-driven engagement"
    } else if avg_shares > avg_likes && avg_shares > avg_comments {
        "share-driven engagement (high virality potential)"
    } else if avg_comments > avg_likes * 0.3 {
        "conversation-driven engagement"
    } else {
        "balanced engagement"
    };

    Some(EngagementSummary {
        pattern,
        avg_engagement: avg_likes + avg_shares + avg_comments,
        avg_likes,
        avg_shares,
        avg_comments,
    })
}

/// Generates and persists insights for an analysis
#[derive(Clone)]
pub struct InsightsGenerator {
    store: Arc<TrendStore>,
}

impl InsightsGenerator {
    pub fn new(store: Arc<TrendStore>) -> Self {
        Self { store }
    }

    /// Build insights for `analysis_id` without persisting them
    pub fn generate(&self, analysis_id: &str, platform_data: &[PlatformData]) -> Vec<InsightRecord> {
        let mut insights = Vec::new();
        insights.extend(posting_time_insights(analysis_id, platform_data));
        insights.extend(hashtag_insights(analysis_id, platform_data));
        insights.extend(content_format_insights(analysis_id, platform_data));
        insights.extend(engagement_pattern_insights(analysis_id, platform_data));
        insights
    }

    /// Build and store insights; a storage failure yields an empty list
    pub fn generate_and_save(
        &self,
        analysis: &AnalysisRecord,
        platform_data: &[PlatformData],
    ) -> Vec<InsightRecord> {
        tracing::info!(analysis_id = %analysis.id, "Generating insights");

        let insights = self.generate(&analysis.id, platform_data);
        match self.store.save_insights(&insights) {
            Ok(saved) => {
                tracing::info!(analysis_id = %analysis.id, count = saved, "Generated insights");
                insights
            }
            Err(e) => {
                tracing::error!(analysis_id = %analysis.id, error = %format!("{e:#}"), "Failed to save insights");
                Vec::new()
            }
        }
    }
}

fn posting_time_insights(analysis_id: &str, platform_data: &[PlatformData]) -> Vec<InsightRecord> {
    platform_data
        .iter()
        .filter_map(|data| {
            let best = best_time_slot(&data.optimal_times)?;
            Some(InsightRecord::new(
                analysis_id,
                InsightType::BestTime,
                format!("Optimal Posting Time for {}", data.platform),
                format!(
                    "Best engagement on {} at {}:00 with {:.1}% engagement score",
                    best.day,
                    best.hour,
                    best.engagement_score * 100.0
                ),
                best.engagement_score,
                serde_json::json!({
                    "platform": data.platform,
                    "day": best.day,
                    "hour": best.hour,
                    "score": best.engagement_score,
                }),
            ))
        })
        .collect()
}

fn hashtag_insights(analysis_id: &str, platform_data: &[PlatformData]) -> Vec<InsightRecord> {
    platform_data
        .iter()
        .filter_map(|data| {
            let hashtags = top_hashtags(&data.posts, TOP_HASHTAGS);
            if hashtags.is_empty() {
                return None;
            }
            Some(InsightRecord::new(
                analysis_id,
                InsightType::Hashtags,
                format!("Popular Hashtags on {}", data.platform),
                format!("Top performing hashtags: {}", hashtags.join(", ")),
                0.75,
                serde_json::json!({
                    "platform": data.platform,
                    "hashtags": hashtags,
                }),
            ))
        })
        .collect()
}

fn content_format_insights(analysis_id: &str, platform_data: &[PlatformData]) -> Vec<InsightRecord> {
    platform_data
        .iter()
        .filter_map(|data| {
            let best = content_format(&data.posts)?;
            Some(InsightRecord::new(
                analysis_id,
                InsightType::ContentFormat,
                format!("Best Content Format for {}", data.platform),
                format!("Top performing posts use {}", best.format),
                best.confidence,
                serde_json::json!({
                    "platform": data.platform,
                    "format": best.format,
                    "stats": best.stats,
                }),
            ))
        })
        .collect()
}

fn engagement_pattern_insights(
    analysis_id: &str,
    platform_data: &[PlatformData],
) -> Vec<InsightRecord> {
    platform_data
        .iter()
        .filter_map(|data| {
            let summary = engagement_summary(&data.posts)?;
            Some(InsightRecord::new(
                analysis_id,
                InsightType::EngagementPattern,
                format!("Engagement Pattern on {}", data.platform),
                format!(
                    "Content shows {}. Average engagement: {:.0} interactions per post",
                    summary.pattern, summary.avg_engagement
                ),
                0.8,
                serde_json::json!({
                    "platform": data.platform,
                    "pattern": summary.pattern,
                    "avgEngagement": summary.avg_engagement,
                    "breakdown": {
                        "likes": summary.avg_likes,
                        "shares": summary.avg_shares,
                        "comments": summary.avg_comments,
                    },
                }),
            ))
        })
        .collect()
}
