//! Four-stage analysis pipeline
//!
//! Query analysis → asset analysis → synthesis → output assembly, strictly
//! sequential. Only the asset stage fans out internally.

pub mod asset_analyzer;
pub mod assembler;
pub mod normalizer;
pub mod orchestrator;
pub mod query_analyzer;
pub mod synthesis;

pub use orchestrator::{AnalysisOptions, AnalysisPipeline, AnalysisRequest};

use brieflow_common::events::PipelineStage;
use std::time::Duration;
use thiserror::Error;

use crate::provider::ChainError;
use crate::validation::SchemaViolation;

/// Failure inside a single stage
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StageError {
    /// Rejected before any provider call
    #[error("invalid input: {0}")]
    InputValidation(String),

    #[error("no reasoning providers configured")]
    NoProviders,

    #[error("all providers failed after {attempts} attempt(s); last provider {last_provider}: {cause}")]
    AllProvidersFailed {
        last_provider: String,
        cause: String,
        attempts: usize,
    },

    #[error(transparent)]
    Schema(#[from] SchemaViolation),

    #[error("stage timed out after {0:?}")]
    Timeout(Duration),
}

impl From<ChainError> for StageError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::NoProviders => StageError::NoProviders,
            ChainError::UnknownProvider(id) => {
                StageError::InputValidation(format!("unknown model preference '{}'", id))
            }
            ChainError::AllFailed {
                last_provider,
                cause,
                attempts,
            } => StageError::AllProvidersFailed {
                last_provider,
                cause: cause.to_string(),
                attempts,
            },
        }
    }
}

impl StageError {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            Self::InputValidation(_) => "INVALID_INPUT",
            Self::NoProviders => "NO_PROVIDERS",
            Self::AllProvidersFailed { .. } => "ALL_PROVIDERS_FAILED",
            Self::Schema(_) => "SCHEMA_VIOLATION",
            Self::Timeout(_) => "STAGE_TIMEOUT",
        }
    }
}

/// Fatal pipeline failure naming the failing stage
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{stage} failed: {cause}")]
pub struct PipelineError {
    pub stage: PipelineStage,
    pub cause: StageError,
}

impl PipelineError {
    pub fn new(stage: PipelineStage, cause: StageError) -> Self {
        Self { stage, cause }
    }

    pub fn is_input_error(&self) -> bool {
        matches!(self.cause, StageError::InputValidation(_))
    }
}
