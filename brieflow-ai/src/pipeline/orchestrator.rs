// Analysis pipeline orchestration
//
// Concept: Run query analysis, asset analysis, synthesis and assembly for one request
// Synchronization: Stages run strictly in sequence; each consumes the complete
// validated output of the previous one. Only stage 2 fans out.
//
// This orchestrator manages:
// - Input validation before any provider call
// - Per-request option overrides on top of PipelineConfig
// - Progress events on an optional EventBus
// - Mapping stage failures to a PipelineError naming the stage

use brieflow_common::events::{EventBus, PipelineEvent, PipelineStage};
use brieflow_common::time::SharedClock;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use super::assembler::{analysis_id_for, AssemblyInput, FinalAnalysisOutput, OutputAssembler};
use super::asset_analyzer::{validate_assets, AssetAnalyzer, AssetOptions};
use super::query_analyzer::{QueryAnalyzer, QueryOptions};
use super::synthesis::{SynthesisOptions, Synthesizer};
use super::{PipelineError, StageError};
use crate::config::{GapAnalysisDepth, PipelineConfig};
use crate::provider::{ModelPreference, ProviderChain};
use crate::types::{MediaAsset, OutputType};

/// Per-request overrides; unset fields keep the configured value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Medium chosen explicitly by the caller
    pub selected_output_type: Option<OutputType>,
    pub query_model: Option<ModelPreference>,
    pub asset_model: Option<ModelPreference>,
    pub synthesis_model: Option<ModelPreference>,
    pub grammar_correction: Option<bool>,
    pub creative_reframing: Option<bool>,
    pub ai_synthesis: Option<bool>,
    pub gap_analysis_depth: Option<GapAnalysisDepth>,
}

/// One analysis request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Caller-chosen id; the analysis id is derived from it
    pub request_id: String,
    pub query: String,
    #[serde(default)]
    pub assets: Vec<MediaAsset>,
    #[serde(default)]
    pub options: AnalysisOptions,
}

impl AnalysisRequest {
    /// Request with a fresh random id
    pub fn new(query: impl Into<String>, assets: Vec<MediaAsset>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            query: query.into(),
            assets,
            options: AnalysisOptions::default(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn with_options(mut self, options: AnalysisOptions) -> Self {
        self.options = options;
        self
    }
}

/// Resolved per-stage options for one run
struct StageOptions {
    query: QueryOptions,
    assets: AssetOptions,
    synthesis: SynthesisOptions,
}

impl StageOptions {
    fn resolve(config: &PipelineConfig, overrides: &AnalysisOptions) -> Self {
        let mut query = QueryOptions::from_config(&config.query);
        query.selected_output_type = overrides.selected_output_type;
        if let Some(preference) = &overrides.query_model {
            query.model_preference = preference.clone();
        }
        if let Some(on) = overrides.grammar_correction {
            query.grammar_correction = on;
        }
        if let Some(on) = overrides.creative_reframing {
            query.creative_reframing = on;
        }

        let mut assets = AssetOptions::from_config(&config.assets);
        if let Some(preference) = &overrides.asset_model {
            assets.model_preference = preference.clone();
        }

        let mut synthesis = SynthesisOptions::from_config(&config.synthesis, &config.scoring);
        if let Some(preference) = &overrides.synthesis_model {
            synthesis.model_preference = preference.clone();
        }
        if let Some(on) = overrides.ai_synthesis {
            synthesis.ai_synthesis = on;
        }
        if let Some(depth) = overrides.gap_analysis_depth {
            synthesis.gap_analysis_depth = depth;
        }

        Self {
            query,
            assets,
            synthesis,
        }
    }
}

/// Four-stage analysis pipeline
///
/// Holds no per-run state; one instance serves any number of requests.
#[derive(Clone)]
pub struct AnalysisPipeline {
    chain: ProviderChain,
    config: PipelineConfig,
    clock: SharedClock,
    event_bus: Option<EventBus>,
}

impl AnalysisPipeline {
    pub fn new(chain: ProviderChain, config: PipelineConfig, clock: SharedClock) -> Self {
        Self {
            chain,
            config,
            clock,
            event_bus: None,
        }
    }

    /// Publish progress events on `bus`
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Configured provider ids in fallback order
    pub fn provider_ids(&self) -> Vec<&str> {
        self.chain.ids()
    }

    /// Run one request to a validated final document
    ///
    /// # Arguments
    /// * `request` - Query text, asset descriptors and per-request overrides
    ///
    /// # Returns
    /// The final document (possibly partial), or a fatal error naming the
    /// stage that failed. Nothing is returned half-built.
    ///
    /// # Phases
    /// 0. Input validation (no provider calls on rejection)
    /// 1. Query analysis
    /// 2. Asset analysis (per-asset failures are not fatal)
    /// 3. Synthesis
    /// 4. Output assembly
    pub async fn run(&self, request: AnalysisRequest) -> Result<FinalAnalysisOutput, PipelineError> {
        let analysis_id = analysis_id_for(&request.request_id);
        let options = StageOptions::resolve(&self.config, &request.options);

        info!(
            request_id = %request.request_id,
            %analysis_id,
            assets = request.assets.len(),
            "Starting analysis"
        );

        self.validate_request(&request, &options)
            .map_err(|e| self.fail(analysis_id, e))?;

        // Phase 1: query analysis
        self.stage_started(analysis_id, PipelineStage::QueryAnalysis);
        let query = QueryAnalyzer::new(self.chain.clone(), self.clock.clone())
            .analyze(&request.query, &options.query)
            .await
            .map_err(|e| self.fail(analysis_id, PipelineError::new(PipelineStage::QueryAnalysis, e)))?;
        self.stage_completed(
            analysis_id,
            PipelineStage::QueryAnalysis,
            query.elapsed_ms,
            Some(query.provider_id.clone()),
        );

        // Phase 2: asset analysis
        self.stage_started(analysis_id, PipelineStage::AssetAnalysis);
        let assets = AssetAnalyzer::new(self.chain.clone(), self.clock.clone())
            .analyze_all(&request.assets, &query.analysis.normalized_query, &options.assets)
            .await
            .map_err(|e| self.fail(analysis_id, PipelineError::new(PipelineStage::AssetAnalysis, e)))?;
        for analysis in &assets.analyses {
            self.emit(PipelineEvent::AssetAnalyzed {
                analysis_id,
                asset_id: analysis.asset_id.clone(),
                outcome: analysis.outcome.as_str().to_string(),
                timestamp: self.clock.now(),
            });
        }
        self.stage_completed(
            analysis_id,
            PipelineStage::AssetAnalysis,
            assets.summary.processing_time_ms,
            None,
        );

        // Phase 3: synthesis
        self.stage_started(analysis_id, PipelineStage::Synthesis);
        let synthesis = Synthesizer::new(self.chain.clone(), self.clock.clone())
            .synthesize(&query.analysis, &assets, &options.synthesis)
            .await
            .map_err(|e| self.fail(analysis_id, PipelineError::new(PipelineStage::Synthesis, e)))?;
        self.stage_completed(
            analysis_id,
            PipelineStage::Synthesis,
            synthesis.elapsed_ms,
            synthesis.provider_id.clone(),
        );

        // Phase 4: assembly
        self.stage_started(analysis_id, PipelineStage::OutputAssembly);
        let assembly_start = self.clock.now();
        let output = OutputAssembler::new(self.clock.clone())
            .assemble(AssemblyInput {
                request_id: &request.request_id,
                query: &query,
                assets: &assets,
                synthesis: &synthesis,
                scoring: &self.config.scoring,
            })
            .map_err(|e| self.fail(analysis_id, PipelineError::new(PipelineStage::OutputAssembly, e)))?;
        self.stage_completed(
            analysis_id,
            PipelineStage::OutputAssembly,
            self.clock.elapsed_ms(assembly_start),
            None,
        );

        let meta = &output.analysis_metadata;
        self.emit(PipelineEvent::PipelineCompleted {
            analysis_id,
            completion_status: meta.completion_status.as_str().to_string(),
            overall_confidence: meta.overall_confidence,
            timestamp: self.clock.now(),
        });
        info!(
            request_id = %request.request_id,
            completion_status = meta.completion_status.as_str(),
            overall_confidence = meta.overall_confidence,
            processing_time_ms = meta.processing_time_ms,
            "Analysis complete"
        );

        Ok(output)
    }

    /// Reject malformed input before any provider is contacted
    fn validate_request(&self, request: &AnalysisRequest, options: &StageOptions) -> Result<(), PipelineError> {
        let query_error = |e: StageError| PipelineError::new(PipelineStage::QueryAnalysis, e);

        if request.request_id.trim().is_empty() {
            return Err(query_error(StageError::InputValidation(
                "request_id must not be empty".to_string(),
            )));
        }
        if request.query.trim().is_empty() {
            return Err(query_error(StageError::InputValidation(
                "query must not be empty".to_string(),
            )));
        }
        self.chain
            .check_preference(&options.query.model_preference)
            .map_err(|e| query_error(e.into()))?;

        validate_assets(&request.assets)
            .map_err(|e| PipelineError::new(PipelineStage::AssetAnalysis, e))?;
        self.chain
            .check_preference(&options.assets.model_preference)
            .map_err(|e| PipelineError::new(PipelineStage::AssetAnalysis, e.into()))?;

        self.chain
            .check_preference(&options.synthesis.model_preference)
            .map_err(|e| PipelineError::new(PipelineStage::Synthesis, e.into()))?;
        Ok(())
    }

    fn fail(&self, analysis_id: Uuid, err: PipelineError) -> PipelineError {
        error!(
            %analysis_id,
            stage = %err.stage,
            code = err.cause.code(),
            error = %err.cause,
            "Analysis failed"
        );
        self.emit(PipelineEvent::PipelineFailed {
            analysis_id,
            stage: err.stage,
            error: err.cause.to_string(),
            timestamp: self.clock.now(),
        });
        err
    }

    fn stage_started(&self, analysis_id: Uuid, stage: PipelineStage) {
        info!(%analysis_id, stage = %stage, "Stage started");
        self.emit(PipelineEvent::StageStarted {
            analysis_id,
            stage,
            timestamp: self.clock.now(),
        });
    }

    fn stage_completed(&self, analysis_id: Uuid, stage: PipelineStage, duration_ms: u64, provider: Option<String>) {
        self.emit(PipelineEvent::StageCompleted {
            analysis_id,
            stage,
            duration_ms,
            provider,
            timestamp: self.clock.now(),
        });
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}
