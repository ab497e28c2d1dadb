//! Application services
//!
//! [`TrendsCollector`] gathers platform data, [`InsightsGenerator`] turns it
//! into rule-based insights and [`TrendsAnalyzer`] ties both to the AI
//! providers and storage.

pub mod analyzer;
pub mod collector;
pub mod insights;

pub use analyzer::{AnalysisResponse, AnalyzeRequest, TrendsAnalyzer};
pub use collector::TrendsCollector;
pub use insights::InsightsGenerator;
