// Stage 4: Output Assembler
//
// Concept: Restate the three validated stage outputs as the final document
// Synchronization: Read-only over stage outputs; single-threaded
//
// Algorithm:
// 1. Per-stage confidences (asset stage omitted in asset-free mode)
// 2. Overall confidence = mean of available stage confidences
// 3. Quality score = weighted confidence/completeness blend on a 0-10 scale
// 4. Completion status: partial on any critical gap or low overall confidence
// 5. Processing insights and flattened warnings
// 6. Schema validation; a violation here is fatal

pub mod document;

pub use document::{CompletionStatus, FinalAnalysisOutput};

use brieflow_common::events::PipelineStage;
use brieflow_common::time::SharedClock;
use std::collections::BTreeMap;
use tracing::{debug, info};
use uuid::Uuid;

use super::query_analyzer::QueryStageOutput;
use super::synthesis::{scoring, SynthesisOutput};
use super::StageError;
use crate::config::ScoringConfig;
use crate::types::{AssetStageResult, ProcessingOutcome};
use crate::validation::Schema;
use document::{
    AnalysisMetadata, AssetsAnalysis, ConfidenceBreakdown, CreativeOptions, GlobalUnderstanding,
    PipelineRecommendations, ProcessingInsights, QuerySummary, StageInsight,
};

/// Version stamped into every document
pub const PIPELINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Stable document id for a request id
///
/// Identical request ids always map to the same analysis id.
pub fn analysis_id_for(request_id: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, request_id.as_bytes())
}

/// Partial when any critical gap exists or overall confidence is below the threshold
///
/// Confidence exactly at the threshold is not partial on that basis.
pub fn completion_status(has_critical_gap: bool, overall_confidence: f64, threshold: f64) -> CompletionStatus {
    if has_critical_gap || overall_confidence < threshold {
        CompletionStatus::Partial
    } else {
        CompletionStatus::Complete
    }
}

/// Integer quality score in [0, 10]
pub fn quality_score(overall_confidence: f64, completeness: f64, scoring: &ScoringConfig) -> u8 {
    let blended = scoring.quality_confidence_weight * overall_confidence
        + scoring.quality_completeness_weight * completeness;
    (blended * 10.0).round().clamp(0.0, 10.0) as u8
}

/// Asset-stage confidence: success rate times mean alignment
///
/// `None` in asset-free mode.
pub fn asset_confidence(assets: &AssetStageResult) -> Option<f64> {
    let total = assets.analyses.len();
    if total == 0 {
        return None;
    }
    let success_rate = assets.usable().count() as f64 / total as f64;
    let alignment = scoring::alignment_score(assets).unwrap_or(0.0);
    Some((success_rate * alignment).clamp(0.0, 1.0))
}

/// Everything the assembler reads
pub struct AssemblyInput<'a> {
    pub request_id: &'a str,
    pub query: &'a QueryStageOutput,
    pub assets: &'a AssetStageResult,
    pub synthesis: &'a SynthesisOutput,
    pub scoring: &'a ScoringConfig,
}

/// Output assembler (stage 4)
pub struct OutputAssembler {
    clock: SharedClock,
}

impl OutputAssembler {
    pub fn new(clock: SharedClock) -> Self {
        Self { clock }
    }

    /// Build and validate the final document
    ///
    /// # Returns
    /// The document, or the full field-level report if it fails its schema
    pub fn assemble(&self, input: AssemblyInput<'_>) -> Result<FinalAnalysisOutput, StageError> {
        let start = self.clock.now();
        let query = &input.query.analysis;
        let assets = input.assets;
        let understanding = &input.synthesis.understanding;

        // 1-2. Confidences
        let query_confidence = query.intent.confidence;
        let asset_confidence = asset_confidence(assets);
        let synthesis_confidence = understanding.metadata.synthesis_confidence;

        let mut available = vec![query_confidence, synthesis_confidence];
        available.extend(asset_confidence);
        let overall = (available.iter().sum::<f64>() / available.len() as f64).clamp(0.0, 1.0);

        // 3-4. Quality and status
        let quality = quality_score(overall, understanding.metadata.completeness_score, input.scoring);
        let status = completion_status(
            understanding.gap_analysis.has_critical(),
            overall,
            input.scoring.partial_confidence_threshold,
        );
        debug!(
            overall_confidence = overall,
            quality_score = quality,
            status = status.as_str(),
            "Aggregate scores computed"
        );

        // 5. Insights
        let warnings = collect_warnings(input.query, assets, input.synthesis);
        let assembly_ms = self.clock.elapsed_ms(start);
        let stages = stage_insights(input.query, assets, input.synthesis, assembly_ms);
        let processing_time_ms = stages.iter().map(|s| s.elapsed_ms).sum();

        let output = FinalAnalysisOutput {
            analysis_metadata: AnalysisMetadata {
                analysis_id: analysis_id_for(input.request_id),
                request_id: input.request_id.to_string(),
                timestamp: self.clock.now(),
                overall_confidence: overall,
                quality_score: quality,
                completion_status: status,
                confidence_threshold: input.scoring.partial_confidence_threshold,
                processing_time_ms,
                pipeline_version: PIPELINE_VERSION.to_string(),
            },
            query_summary: QuerySummary {
                original_query: query.original_query.clone(),
                normalized_query: query.normalized_query.clone(),
                intent: query.intent.clone(),
                modifiers: query.modifiers.clone(),
                constraints: query.constraints.clone(),
                gaps: query.gaps.clone(),
                creative_reframing: query.creative_reframing.clone(),
            },
            assets_analysis: AssetsAnalysis {
                assets: assets.analyses.clone(),
                summary: assets.summary.clone(),
            },
            global_understanding: GlobalUnderstanding {
                unified_intent: understanding.intent.clone(),
                unified_constraints: understanding.constraints.clone(),
                asset_utilization: understanding.utilization.clone(),
                gap_analysis: understanding.gap_analysis.clone(),
                synthesis_metadata: understanding.metadata.clone(),
            },
            creative_options: CreativeOptions {
                creative_direction: understanding.intent.creative_direction.clone(),
                direction_source: understanding.intent.direction_source,
                style_fusion: understanding.creative.style_fusion.clone(),
                mood_plan: understanding.creative.mood_plan.clone(),
                narrative: understanding.creative.narrative.clone(),
            },
            pipeline_recommendations: PipelineRecommendations {
                steps: understanding.recommendations.steps.clone(),
                quality_targets: understanding.recommendations.quality_targets.clone(),
                optimizations: understanding.recommendations.optimizations.clone(),
            },
            processing_insights: ProcessingInsights {
                stages,
                confidence_breakdown: ConfidenceBreakdown {
                    query_analysis: query_confidence,
                    asset_analysis: asset_confidence,
                    synthesis: synthesis_confidence,
                    overall,
                },
                warnings,
            },
        };

        // 6. Validation
        output.validate()?;

        info!(
            request_id = %input.request_id,
            completion_status = status.as_str(),
            overall_confidence = overall,
            quality_score = quality,
            warnings = output.processing_insights.warnings.len(),
            "Final document assembled"
        );

        Ok(output)
    }
}

fn stage_insights(
    query: &QueryStageOutput,
    assets: &AssetStageResult,
    synthesis: &SynthesisOutput,
    assembly_ms: u64,
) -> Vec<StageInsight> {
    let total = assets.analyses.len();
    let asset_success_rate = if total == 0 {
        1.0
    } else {
        assets.usable().count() as f64 / total as f64
    };

    vec![
        StageInsight {
            stage: PipelineStage::QueryAnalysis,
            providers: BTreeMap::from([(query.provider_id.clone(), 1)]),
            // one success out of however many providers were tried
            success_rate: 1.0 / query.attempts.max(1) as f64,
            elapsed_ms: query.elapsed_ms,
        },
        StageInsight {
            stage: PipelineStage::AssetAnalysis,
            providers: assets.provider_usage.clone(),
            success_rate: asset_success_rate,
            elapsed_ms: assets.summary.processing_time_ms,
        },
        StageInsight {
            stage: PipelineStage::Synthesis,
            providers: synthesis
                .provider_id
                .iter()
                .map(|id| (id.clone(), 1))
                .collect(),
            success_rate: 1.0,
            elapsed_ms: synthesis.elapsed_ms,
        },
        StageInsight {
            stage: PipelineStage::OutputAssembly,
            providers: BTreeMap::new(),
            success_rate: 1.0,
            elapsed_ms: assembly_ms,
        },
    ]
}

fn collect_warnings(
    query: &QueryStageOutput,
    assets: &AssetStageResult,
    synthesis: &SynthesisOutput,
) -> Vec<String> {
    let mut warnings = query.warnings.clone();

    let meta = &query.analysis.metadata;
    if meta.normalization_applied {
        warnings.push(format!(
            "Query normalized before analysis: '{}'",
            query.analysis.normalized_query
        ));
    }
    if meta.grammar_corrected {
        warnings.push("Grammar correction applied to the query".to_string());
    }

    for analysis in &assets.analyses {
        match analysis.outcome {
            ProcessingOutcome::Failed => warnings.push(format!(
                "Asset '{}' could not be analyzed: {}",
                analysis.asset_id,
                analysis.error.as_deref().unwrap_or("unknown error")
            )),
            ProcessingOutcome::Partial => warnings.push(format!(
                "Asset '{}' analysis is partial",
                analysis.asset_id
            )),
            ProcessingOutcome::Success => {}
        }
    }

    warnings.extend(synthesis.warnings.iter().cloned());
    warnings
}
