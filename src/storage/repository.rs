//! SQLite repository for trends, analyses, insights and posts
//!
//! One connection behind a `Mutex`. Timestamps are stored as fixed-width
//! RFC 3339 strings (microseconds, `Z` suffix) so that lexical comparison
//! in SQL matches chronological order.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{
    AnalysisRecord, GrowthTrend, InsightRecord, InsightType, PlatformType, PostRecord,
    TrendRecord,
};

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct StorageStats {
    pub trends: usize,
    pub analyses: usize,
    pub insights: usize,
    pub posts: usize,
}

/// SQLite-backed store
pub struct TrendStore {
    conn: Mutex<Connection>,
}

impl TrendStore {
    /// Open (or create) a database file
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Create parent directory if needed
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let conn = Connection::open(path).context("Failed to open SQLite database")?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self::from_connection(conn)?;
        tracing::info!(path = %path.display(), "SQLite store initialized");
        Ok(store)
    }

    /// Create in-memory store (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to create in-memory SQLite")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .context("Failed to enable foreign keys")?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("SQLite connection mutex poisoned"))
    }

    /// Create database schema
    fn create_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS trends (
                    id TEXT PRIMARY KEY,
                    topic TEXT NOT NULL,
                    platform TEXT NOT NULL,
                    volume INTEGER NOT NULL,
                    trending_score REAL NOT NULL,
                    detected_at TEXT NOT NULL,
                    metadata TEXT NOT NULL DEFAULT '{}',
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_trends_topic_platform_detected
                    ON trends(topic, platform, detected_at);

                CREATE TABLE IF NOT EXISTS analyses (
                    id TEXT PRIMARY KEY,
                    topic TEXT NOT NULL,
                    platforms TEXT NOT NULL,
                    ai_provider TEXT NOT NULL,
                    analysis_text TEXT NOT NULL,
                    sentiment_score REAL,
                    predicted_growth TEXT,
                    tokens_used INTEGER NOT NULL DEFAULT 0,
                    analyzed_at TEXT NOT NULL,
                    metadata TEXT NOT NULL DEFAULT '{}',
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_analyses_topic_analyzed
                    ON analyses(topic, analyzed_at);

                CREATE TABLE IF NOT EXISTS insights (
                    id TEXT PRIMARY KEY,
                    analysis_id TEXT NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
                    insight_type TEXT NOT NULL,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL,
                    confidence_score REAL NOT NULL,
                    actionable INTEGER NOT NULL DEFAULT 1,
                    metadata TEXT NOT NULL DEFAULT '{}',
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_insights_analysis_type
                    ON insights(analysis_id, insight_type);

                CREATE TABLE IF NOT EXISTS platform_posts (
                    id TEXT PRIMARY KEY,
                    analysis_id TEXT NOT NULL REFERENCES analyses(id) ON DELETE CASCADE,
                    platform TEXT NOT NULL,
                    post_id TEXT NOT NULL,
                    content TEXT NOT NULL,
                    author TEXT,
                    engagement_metrics TEXT NOT NULL,
                    posted_at TEXT NOT NULL,
                    created_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_platform_posts_analysis_platform
                    ON platform_posts(analysis_id, platform);
                "#,
        )
        .context("Failed to create SQLite schema")?;

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Trends
    // ------------------------------------------------------------------------

    /// Insert trend observations in a single transaction
    pub fn save_trends(&self, trends: &[TrendRecord]) -> Result<usize> {
        if trends.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO trends (id, topic, platform, volume, trending_score, detected_at, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for trend in trends {
                stmt.execute(params![
                    trend.id,
                    trend.topic,
                    trend.platform.as_str(),
                    trend.volume as i64,
                    trend.trending_score,
                    ts_to_sql(&trend.detected_at),
                    trend.metadata.to_string(),
                    ts_to_sql(&trend.created_at),
                ])
                .with_context(|| format!("Failed to insert trend {}", trend.topic))?;
            }
        }
        tx.commit().context("Failed to commit trends")?;

        Ok(trends.len())
    }

    /// Most recently detected trends, optionally for one platform
    pub fn recent_trends(
        &self,
        platform: Option<PlatformType>,
        limit: usize,
    ) -> Result<Vec<TrendRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, topic, platform, volume, trending_score, detected_at, metadata, created_at
             FROM trends
             WHERE (?1 IS NULL OR platform = ?1)
             ORDER BY detected_at DESC, rowid DESC
             LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(
                params![platform.map(|p| p.as_str()), limit as i64],
                trend_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load recent trends")?;

        Ok(rows)
    }

    /// Observations of a topic within `[since, until]`, oldest first
    pub fn trend_history(
        &self,
        topic: &str,
        platform: Option<PlatformType>,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<TrendRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, topic, platform, volume, trending_score, detected_at, metadata, created_at
             FROM trends
             WHERE topic = ?1
               AND (?2 IS NULL OR platform = ?2)
               AND detected_at >= ?3 AND detected_at <= ?4
             ORDER BY detected_at ASC, rowid ASC",
        )?;

        let rows = stmt
            .query_map(
                params![
                    topic,
                    platform.map(|p| p.as_str()),
                    ts_to_sql(&since),
                    ts_to_sql(&until)
                ],
                trend_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load trend history")?;

        Ok(rows)
    }

    // ------------------------------------------------------------------------
    // Analyses
    // ------------------------------------------------------------------------

    pub fn save_analysis(&self, analysis: &AnalysisRecord) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO analyses (id, topic, platforms, ai_provider, analysis_text, sentiment_score,
                                   predicted_growth, tokens_used, analyzed_at, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                analysis.id,
                analysis.topic,
                join_platforms(&analysis.platforms),
                analysis.ai_provider,
                analysis.analysis_text,
                analysis.sentiment_score,
                analysis.predicted_growth.map(|g| g.as_str()),
                analysis.tokens_used as i64,
                ts_to_sql(&analysis.analyzed_at),
                analysis.metadata.to_string(),
                ts_to_sql(&analysis.created_at),
            ],
        )
        .context("Failed to save analysis")?;

        Ok(())
    }

    pub fn find_analysis(&self, id: &str) -> Result<Option<AnalysisRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, topic, platforms, ai_provider, analysis_text, sentiment_score,
                    predicted_growth, tokens_used, analyzed_at, metadata, created_at
             FROM analyses WHERE id = ?1",
            params![id],
            analysis_from_row,
        )
        .optional()
        .context("Failed to load analysis")
    }

    /// Newest analysis of `topic` performed at or after `since`
    pub fn find_recent_analysis(
        &self,
        topic: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<AnalysisRecord>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, topic, platforms, ai_provider, analysis_text, sentiment_score,
                    predicted_growth, tokens_used, analyzed_at, metadata, created_at
             FROM analyses
             WHERE topic = ?1 AND analyzed_at >= ?2
             ORDER BY analyzed_at DESC
             LIMIT 1",
            params![topic, ts_to_sql(&since)],
            analysis_from_row,
        )
        .optional()
        .context("Failed to look up recent analysis")
    }

    /// Delete analyses older than `cutoff`; insights and posts cascade
    pub fn delete_analyses_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM analyses WHERE analyzed_at < ?1",
                params![ts_to_sql(&cutoff)],
            )
            .context("Failed to purge analyses")?;

        Ok(deleted)
    }

    // ------------------------------------------------------------------------
    // Insights
    // ------------------------------------------------------------------------

    pub fn save_insights(&self, insights: &[InsightRecord]) -> Result<usize> {
        if insights.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO insights (id, analysis_id, insight_type, title, description,
                                       confidence_score, actionable, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for insight in insights {
                stmt.execute(params![
                    insight.id,
                    insight.analysis_id,
                    insight.insight_type.as_str(),
                    insight.title,
                    insight.description,
                    insight.confidence_score,
                    insight.actionable,
                    insight.metadata.to_string(),
                    ts_to_sql(&insight.created_at),
                ])
                .with_context(|| format!("Failed to insert insight '{}'", insight.title))?;
            }
        }
        tx.commit().context("Failed to commit insights")?;

        Ok(insights.len())
    }

    /// Insights of one analysis in the order they were generated
    pub fn insights_for_analysis(&self, analysis_id: &str) -> Result<Vec<InsightRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, analysis_id, insight_type, title, description, confidence_score,
                    actionable, metadata, created_at
             FROM insights WHERE analysis_id = ?1
             ORDER BY rowid ASC",
        )?;

        let rows = stmt
            .query_map(params![analysis_id], insight_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load insights")?;

        Ok(rows)
    }

    /// Insights from analyses of `topic` since `since`, newest first
    ///
    /// The platform filter matches the `platform` key of the insight metadata.
    pub fn find_insights(
        &self,
        topic: &str,
        platform: Option<PlatformType>,
        since: DateTime<Utc>,
    ) -> Result<Vec<InsightRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT i.id, i.analysis_id, i.insight_type, i.title, i.description,
                    i.confidence_score, i.actionable, i.metadata, i.created_at
             FROM insights i
             JOIN analyses a ON a.id = i.analysis_id
             WHERE a.topic = ?1 AND a.analyzed_at >= ?2
             ORDER BY a.analyzed_at DESC, i.rowid ASC",
        )?;

        let rows = stmt
            .query_map(params![topic, ts_to_sql(&since)], insight_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to search insights")?;

        Ok(match platform {
            Some(p) => rows
                .into_iter()
                .filter(|i| i.platform() == Some(p.as_str()))
                .collect(),
            None => rows,
        })
    }

    // ------------------------------------------------------------------------
    // Posts
    // ------------------------------------------------------------------------

    pub fn save_posts(&self, posts: &[PostRecord]) -> Result<usize> {
        if posts.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO platform_posts (id, analysis_id, platform, post_id, content, author,
                                             engagement_metrics, posted_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for post in posts {
                let metrics = serde_json::to_string(&post.engagement_metrics)
                    .context("Failed to serialize engagement metrics")?;
                stmt.execute(params![
                    post.id,
                    post.analysis_id,
                    post.platform.as_str(),
                    post.post_id,
                    post.content,
                    post.author,
                    metrics,
                    ts_to_sql(&post.posted_at),
                    ts_to_sql(&post.created_at),
                ])
                .with_context(|| format!("Failed to insert post {}", post.post_id))?;
            }
        }
        tx.commit().context("Failed to commit posts")?;

        Ok(posts.len())
    }

    pub fn posts_for_analysis(&self, analysis_id: &str) -> Result<Vec<PostRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(
            "SELECT id, analysis_id, platform, post_id, content, author, engagement_metrics,
                    posted_at, created_at
             FROM platform_posts WHERE analysis_id = ?1
             ORDER BY rowid ASC",
        )?;

        let rows = stmt
            .query_map(params![analysis_id], post_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to load posts")?;

        Ok(rows)
    }

    // ------------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------------

    pub fn stats(&self) -> Result<StorageStats> {
        let conn = self.conn()?;
        let count = |table: &str| -> Result<usize> {
            let n: i64 = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .with_context(|| format!("Failed to count {table}"))?;
            Ok(n as usize)
        };

        Ok(StorageStats {
            trends: count("trends")?,
            analyses: count("analyses")?,
            insights: count("insights")?,
            posts: count("platform_posts")?,
        })
    }
}

// ============================================================================
// Row mapping
// ============================================================================

fn ts_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn conversion_error(idx: usize, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, msg.into())
}

fn ts_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, format!("bad timestamp '{raw}': {e}")))
}

fn json_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| conversion_error(idx, format!("bad JSON: {e}")))
}

fn platform_from_row(row: &Row<'_>, idx: usize) -> rusqlite::Result<PlatformType> {
    let raw: String = row.get(idx)?;
    PlatformType::parse(&raw).ok_or_else(|| conversion_error(idx, format!("unknown platform '{raw}'")))
}

fn join_platforms(platforms: &[PlatformType]) -> String {
    platforms
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

fn trend_from_row(row: &Row<'_>) -> rusqlite::Result<TrendRecord> {
    Ok(TrendRecord {
        id: row.get(0)?,
        topic: row.get(1)?,
        platform: platform_from_row(row, 2)?,
        volume: row.get::<_, i64>(3)?.max(0) as u64,
        trending_score: row.get(4)?,
        detected_at: ts_from_row(row, 5)?,
        metadata: json_from_row(row, 6)?,
        created_at: ts_from_row(row, 7)?,
    })
}

fn analysis_from_row(row: &Row<'_>) -> rusqlite::Result<AnalysisRecord> {
    let platforms: String = row.get(2)?;
    let platforms = platforms
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            PlatformType::parse(s).ok_or_else(|| conversion_error(2, format!("unknown platform '{s}'")))
        })
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let predicted_growth: Option<String> = row.get(6)?;

    Ok(AnalysisRecord {
        id: row.get(0)?,
        topic: row.get(1)?,
        platforms,
        ai_provider: row.get(3)?,
        analysis_text: row.get(4)?,
        sentiment_score: row.get(5)?,
        predicted_growth: predicted_growth.as_deref().and_then(GrowthTrend::parse),
        tokens_used: row.get::<_, i64>(7)?.max(0) as u64,
        analyzed_at: ts_from_row(row, 8)?,
        metadata: json_from_row(row, 9)?,
        created_at: ts_from_row(row, 10)?,
    })
}

fn insight_from_row(row: &Row<'_>) -> rusqlite::Result<InsightRecord> {
    let kind: String = row.get(2)?;
    let insight_type = InsightType::parse(&kind)
        .ok_or_else(|| conversion_error(2, format!("unknown insight type '{kind}'")))?;

    Ok(InsightRecord {
        id: row.get(0)?,
        analysis_id: row.get(1)?,
        insight_type,
        title: row.get(3)?,
        description: row.get(4)?,
        confidence_score: row.get(5)?,
        actionable: row.get(6)?,
        metadata: json_from_row(row, 7)?,
        created_at: ts_from_row(row, 8)?,
    })
}

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    let metrics: String = row.get(6)?;
    let engagement_metrics = serde_json::from_str(&metrics)
        .map_err(|e| conversion_error(6, format!("bad engagement metrics: {e}")))?;

    Ok(PostRecord {
        id: row.get(0)?,
        analysis_id: row.get(1)?,
        platform: platform_from_row(row, 2)?,
        post_id: row.get(3)?,
        content: row.get(4)?,
        author: row.get(5)?,
        engagement_metrics,
        posted_at: ts_from_row(row, 7)?,
        created_at: ts_from_row(row, 8)?,
    })
}
