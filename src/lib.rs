//! trendscope - Social media trends analyzer
//!
//! Collects trend and post data for a topic from several social platforms,
//! asks an AI provider for a narrative analysis, derives rule-based insights
//! and stores everything in SQLite.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`platforms`] - Per-platform data strategies
//! - [`ai`] - AI providers (Anthropic, OpenAI) and prompts
//! - [`services`] - Collection, insights and analysis orchestration
//! - [`storage`] - SQLite persistence
//! - [`notifications`] - Outgoing webhooks
//! - [`api`] - REST API server
//! - [`metrics`] - Prometheus metrics
//!
//! # Example
//!
//! ```no_run
//! use trendscope::config::Config;
//! use trendscope::api::ApiServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let server = ApiServer::new(&config)?;
//!     server.start_with_shutdown(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await?;
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod platforms;
pub mod services;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiProvider, ProviderRegistry};
    pub use crate::config::Config;
    pub use crate::error::{Error, ErrorCategory, Result};
    pub use crate::models::{GrowthTrend, InsightType, PlatformData, PlatformType};
    pub use crate::services::{AnalysisResponse, AnalyzeRequest, TrendsAnalyzer};
    pub use crate::storage::TrendStore;
}

// Direct re-exports for convenience
pub use models::{GrowthTrend, InsightType, PlatformType};
