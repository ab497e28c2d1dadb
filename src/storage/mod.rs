//! Persistence for trends, analyses, insights and posts
//!
//! Everything lives in a single SQLite database. Insights and posts belong
//! to an analysis and are removed with it.

pub mod repository;

pub use repository::{StorageStats, TrendStore};
