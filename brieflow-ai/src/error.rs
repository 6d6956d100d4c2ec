//! Error types for brieflow-ai
//!
//! Pipeline failures map to HTTP statuses by cause: rejected input is the
//! caller's fault (400), exhausted providers are an upstream failure (502),
//! timeouts are 504 and schema violations are internal (500). A body that
//! does not deserialize is a 400 before the pipeline runs.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::pipeline::{PipelineError, StageError};

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed request body (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Fatal pipeline failure; status depends on the cause
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Pipeline(err) => match err.cause {
                StageError::InputValidation(_) => StatusCode::BAD_REQUEST,
                StageError::NoProviders | StageError::AllProvidersFailed { .. } => StatusCode::BAD_GATEWAY,
                StageError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                StageError::Schema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::BadRequest(msg) => json!({
                "error": { "code": "BAD_REQUEST", "message": msg }
            }),
            ApiError::Pipeline(err) => {
                let details = match &err.cause {
                    StageError::Schema(violation) => json!(violation.errors),
                    _ => serde_json::Value::Null,
                };
                json!({
                    "error": {
                        "code": err.cause.code(),
                        "stage": err.stage,
                        "message": err.cause.to_string(),
                        "details": details,
                    }
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use brieflow_common::events::PipelineStage;
    use std::time::Duration;

    fn pipeline(cause: StageError) -> ApiError {
        ApiError::Pipeline(PipelineError::new(PipelineStage::QueryAnalysis, cause))
    }

    #[test]
    fn test_status_by_cause() {
        assert_eq!(
            pipeline(StageError::InputValidation("empty".to_string())).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(pipeline(StageError::NoProviders).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            pipeline(StageError::Timeout(Duration::from_secs(5))).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::BadRequest("missing field `query`".to_string()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
