//! brieflow-ai library interface
//!
//! Exposes the pipeline, provider gateway and HTTP router for the binary
//! and for integration testing.

pub mod api;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod types;
pub mod validation;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use brieflow_common::events::EventBus;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::pipeline::AnalysisPipeline;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Pipeline serving every request
    pub pipeline: AnalysisPipeline,
    /// Progress events from every run
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last pipeline failure, for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    /// State whose pipeline publishes on `event_bus`
    pub fn new(pipeline: AnalysisPipeline, event_bus: EventBus) -> Self {
        Self {
            pipeline: pipeline.with_event_bus(event_bus.clone()),
            event_bus,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::analyze_routes())
        .merge(api::health_routes())
        .with_state(state)
}
