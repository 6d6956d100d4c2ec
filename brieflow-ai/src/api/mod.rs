//! HTTP API handlers for brieflow-ai
//!
//! POST /analyze runs one request through the pipeline; GET /health reports
//! uptime and the last pipeline failure.

pub mod analyze;
pub mod health;

pub use analyze::analyze_routes;
pub use health::health_routes;
