//! Analysis intake
//!
//! POST /analyze with `{query, assets, options, request_id?}`. Responds with
//! the final document, or a structured error naming the failed stage.

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::pipeline::assembler::FinalAnalysisOutput;
use crate::pipeline::{AnalysisOptions, AnalysisRequest};
use crate::types::MediaAsset;
use crate::AppState;

/// POST /analyze request
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    /// Caller-chosen id; a random one is generated when absent
    #[serde(default)]
    pub request_id: Option<String>,
    pub query: String,
    #[serde(default)]
    pub assets: Vec<MediaAsset>,
    #[serde(default)]
    pub options: AnalysisOptions,
}

impl From<AnalyzeRequest> for AnalysisRequest {
    fn from(body: AnalyzeRequest) -> Self {
        AnalysisRequest {
            request_id: body
                .request_id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            query: body.query,
            assets: body.assets,
            options: body.options,
        }
    }
}

/// POST /analyze
pub async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> ApiResult<Json<FinalAnalysisOutput>> {
    let Json(body) = body?;
    let request: AnalysisRequest = body.into();
    let request_id = request.request_id.clone();

    match state.pipeline.run(request).await {
        Ok(output) => Ok(Json(output)),
        Err(err) => {
            warn!(request_id = %request_id, stage = %err.stage, error = %err.cause, "Analysis request failed");
            *state.last_error.write().await = Some(err.to_string());
            Err(ApiError::Pipeline(err))
        }
    }
}

/// Build analysis routes
pub fn analyze_routes() -> Router<AppState> {
    Router::new().route("/analyze", post(analyze))
}
