//! HTTP surface of the trends analyzer
//!
//! # Routes
//!
//! ```text
//! POST /api/trends/analyze       full analysis of a topic
//! GET  /api/trends/trending      latest stored trends
//! GET  /api/trends/history       volume timeline of a topic
//! GET  /api/trends/insights      stored insights of a topic
//! GET  /api/trends/compare       per-platform comparison
//! POST /api/trends/summary       AI summary of recent trends
//! POST /api/trends/predict       AI performance prediction
//! POST /api/trends/ai-insights   AI narrative insights
//! GET  /api/trends/providers     registered providers and platforms
//! GET  /api/trends/health        liveness
//! GET  /api/metrics              Prometheus exposition
//! ```

pub mod handlers;
pub mod server;

pub use handlers::{create_router, ErrorResponse};
pub use server::{ApiServer, AppState, ServerError, ServerInfo};
