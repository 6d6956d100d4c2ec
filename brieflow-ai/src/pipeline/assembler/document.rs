//! Final analysis document
//!
//! The externally consumed shape. Sections restate the stage outputs; the
//! only values computed here are the aggregate scores in
//! `analysis_metadata` and the `processing_insights` section.

use brieflow_common::events::PipelineStage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::pipeline::synthesis::model::{
    AssetUtilization, DirectionSource, GapAnalysis, Impact, MoodPlan, NarrativeStructure,
    Optimization, PipelineStep, QualityTargets, StyleFusion, SynthesisMetadata,
    UnifiedConstraints, UnifiedIntent,
};
use crate::pipeline::synthesis::model::check_utilization;
use crate::types::{
    AssetAnalysis, AssetSummary, Intent, Modifiers, QueryConstraints, QueryGaps,
};
use crate::validation::{check_constraints, FieldChecker, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Complete,
    Partial,
    Error,
}

impl CompletionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Partial => "partial",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_id: Uuid,
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
    /// Mean of the per-stage confidences, [0.0, 1.0]
    pub overall_confidence: f64,
    /// [0, 10]
    pub quality_score: u8,
    pub completion_status: CompletionStatus,
    /// Overall confidence below this marks the document partial
    pub confidence_threshold: f64,
    pub processing_time_ms: u64,
    pub pipeline_version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySummary {
    pub original_query: String,
    pub normalized_query: String,
    pub intent: Intent,
    pub modifiers: Modifiers,
    pub constraints: QueryConstraints,
    pub gaps: QueryGaps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_reframing: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetsAnalysis {
    pub assets: Vec<AssetAnalysis>,
    pub summary: AssetSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalUnderstanding {
    pub unified_intent: UnifiedIntent,
    pub unified_constraints: UnifiedConstraints,
    pub asset_utilization: AssetUtilization,
    pub gap_analysis: GapAnalysis,
    pub synthesis_metadata: SynthesisMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeOptions {
    pub creative_direction: String,
    pub direction_source: DirectionSource,
    pub style_fusion: StyleFusion,
    pub mood_plan: MoodPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<NarrativeStructure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRecommendations {
    pub steps: Vec<PipelineStep>,
    pub quality_targets: QualityTargets,
    pub optimizations: Vec<Optimization>,
}

/// How one stage ran
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageInsight {
    pub stage: PipelineStage,
    /// Providers that served the stage, with call counts
    #[serde(default)]
    pub providers: BTreeMap<String, usize>,
    /// [0.0, 1.0]
    pub success_rate: f64,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    pub query_analysis: f64,
    /// Absent in asset-free mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_analysis: Option<f64>,
    pub synthesis: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingInsights {
    pub stages: Vec<StageInsight>,
    pub confidence_breakdown: ConfidenceBreakdown,
    pub warnings: Vec<String>,
}

/// Stage 4 output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalAnalysisOutput {
    pub analysis_metadata: AnalysisMetadata,
    pub query_summary: QuerySummary,
    pub assets_analysis: AssetsAnalysis,
    pub global_understanding: GlobalUnderstanding,
    pub creative_options: CreativeOptions,
    pub pipeline_recommendations: PipelineRecommendations,
    pub processing_insights: ProcessingInsights,
}

impl Schema for FinalAnalysisOutput {
    const NAME: &'static str = "FinalAnalysisOutput";

    fn check(&self, c: &mut FieldChecker) {
        let meta = &self.analysis_metadata;
        let critical = self.global_understanding.gap_analysis.count_impact(Impact::Critical);

        c.scoped("analysis_metadata", |c| {
            c.non_empty("request_id", &meta.request_id);
            c.probability("overall_confidence", meta.overall_confidence);
            c.ensure(
                "quality_score",
                meta.quality_score <= 10,
                format!("must be within [0, 10], got {}", meta.quality_score),
            );
            c.probability("confidence_threshold", meta.confidence_threshold);
            let low_confidence = meta.overall_confidence < meta.confidence_threshold;
            let expected = if critical > 0 || low_confidence {
                CompletionStatus::Partial
            } else {
                CompletionStatus::Complete
            };
            c.ensure(
                "completion_status",
                meta.completion_status == expected,
                format!(
                    "expected {} ({} critical gap(s), confidence {:.2} vs threshold {:.2}), got {}",
                    expected.as_str(),
                    critical,
                    meta.overall_confidence,
                    meta.confidence_threshold,
                    meta.completion_status.as_str()
                ),
            );
        });

        c.scoped("query_summary", |c| {
            c.non_empty("original_query", &self.query_summary.original_query);
            c.probability("intent.confidence", self.query_summary.intent.confidence);
            c.scoped("constraints", |c| check_constraints(c, &self.query_summary.constraints));
        });

        c.scoped("assets_analysis", |c| {
            let a = &self.assets_analysis;
            for (i, asset) in a.assets.iter().enumerate() {
                c.indexed("assets", i, |c| asset.check(c));
            }
            c.ensure(
                "summary.total_assets",
                a.summary.total_assets == a.assets.len(),
                "summary disagrees with the asset list",
            );
            c.bounded("summary.overall_quality_score", a.summary.overall_quality_score, 0.0, 10.0);
        });

        c.scoped("global_understanding", |c| {
            let g = &self.global_understanding;
            c.probability("unified_intent.confidence", g.unified_intent.confidence);
            c.scoped("asset_utilization", |c| check_utilization(c, &g.asset_utilization));
            c.ensure(
                "asset_utilization.total_assets",
                g.asset_utilization.total_assets == self.assets_analysis.assets.len(),
                "utilization does not cover every analysed asset",
            );
            for analysis in &self.assets_analysis.assets {
                c.ensure(
                    "asset_utilization",
                    g.asset_utilization.role_of(&analysis.asset_id).is_some(),
                    format!("asset '{}' has no bucket", analysis.asset_id),
                );
            }
            c.scoped("synthesis_metadata", |c| {
                let m = &g.synthesis_metadata;
                c.probability("synthesis_confidence", m.synthesis_confidence);
                c.probability("completeness_score", m.completeness_score);
                c.probability("complexity_score", m.complexity_score);
            });
        });

        c.scoped("creative_options", |c| {
            c.non_empty("creative_direction", &self.creative_options.creative_direction);
        });

        c.scoped("pipeline_recommendations", |c| {
            let r = &self.pipeline_recommendations;
            c.ensure("steps", !r.steps.is_empty(), "at least one step is required");
            for (i, step) in r.steps.iter().enumerate() {
                c.indexed("steps", i, |c| {
                    c.ensure(
                        "order",
                        step.order as usize == i + 1,
                        format!("expected order {}, got {}", i + 1, step.order),
                    );
                });
            }
            c.ensure(
                "quality_targets.min_quality_score",
                (1..=10).contains(&r.quality_targets.min_quality_score),
                "must be within [1, 10]",
            );
        });

        c.scoped("processing_insights", |c| {
            let p = &self.processing_insights;
            for (i, stage) in p.stages.iter().enumerate() {
                c.indexed("stages", i, |c| c.probability("success_rate", stage.success_rate));
            }
            c.scoped("confidence_breakdown", |c| {
                let b = &p.confidence_breakdown;
                c.probability("query_analysis", b.query_analysis);
                if let Some(asset) = b.asset_analysis {
                    c.probability("asset_analysis", asset);
                }
                c.probability("synthesis", b.synthesis);
                c.ensure(
                    "overall",
                    (b.overall - meta.overall_confidence).abs() < 1e-9,
                    "must equal analysis_metadata.overall_confidence",
                );
            });
        });
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::pipeline::assembler::{AssemblyInput, OutputAssembler};
    use crate::pipeline::query_analyzer::QueryStageOutput;
    use crate::pipeline::synthesis::fixtures::{analysis, query, stage};
    use crate::pipeline::synthesis::{SynthesisOptions, Synthesizer};
    use crate::provider::ProviderChain;
    use crate::types::{AssetRole, MediaKind, OutputType};
    use brieflow_common::time::{FixedClock, SharedClock};
    use chrono::TimeZone;
    use std::sync::Arc;

    /// Valid document with every gap removed
    async fn document_without_gaps() -> FinalAnalysisOutput {
        let clock: SharedClock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()));
        let q = query(OutputType::Video, 0.9);
        let s = stage(vec![analysis("v1", MediaKind::Video, 0.9, 8.0, AssetRole::Primary)]);
        let synthesis = Synthesizer::new(ProviderChain::new(vec![]), clock.clone())
            .synthesize(&q, &s, &SynthesisOptions::default())
            .await
            .unwrap();
        let stage1 = QueryStageOutput {
            analysis: q,
            provider_id: "stub".to_string(),
            attempts: 1,
            elapsed_ms: 1,
            warnings: vec![],
        };
        let mut doc = OutputAssembler::new(clock)
            .assemble(AssemblyInput {
                request_id: "doc-1",
                query: &stage1,
                assets: &s,
                synthesis: &synthesis,
                scoring: &ScoringConfig::default(),
            })
            .unwrap();
        doc.global_understanding.gap_analysis.gaps.clear();
        doc
    }

    fn set_overall(doc: &mut FinalAnalysisOutput, overall: f64, status: CompletionStatus) {
        doc.analysis_metadata.overall_confidence = overall;
        doc.processing_insights.confidence_breakdown.overall = overall;
        doc.analysis_metadata.completion_status = status;
    }

    fn status_errors(doc: &FinalAnalysisOutput) -> usize {
        match doc.validate() {
            Ok(()) => 0,
            Err(violation) => violation
                .errors
                .iter()
                .filter(|e| e.path == "analysis_metadata.completion_status")
                .count(),
        }
    }

    #[tokio::test]
    async fn test_consistent_status_accepted() {
        let mut doc = document_without_gaps().await;
        set_overall(&mut doc, 0.95, CompletionStatus::Complete);
        assert!(doc.validate().is_ok());

        set_overall(&mut doc, 0.2, CompletionStatus::Partial);
        assert!(doc.validate().is_ok());

        // exactly at the threshold is not partial on that basis
        set_overall(&mut doc, 0.5, CompletionStatus::Complete);
        assert!(doc.validate().is_ok());
    }

    #[tokio::test]
    async fn test_low_confidence_marked_complete_rejected() {
        let mut doc = document_without_gaps().await;
        set_overall(&mut doc, 0.2, CompletionStatus::Complete);
        assert_eq!(status_errors(&doc), 1);
    }

    #[tokio::test]
    async fn test_partial_without_cause_rejected() {
        let mut doc = document_without_gaps().await;
        set_overall(&mut doc, 0.95, CompletionStatus::Partial);
        assert_eq!(status_errors(&doc), 1);
    }

    #[tokio::test]
    async fn test_threshold_comes_from_document() {
        let mut doc = document_without_gaps().await;
        doc.analysis_metadata.confidence_threshold = 0.8;
        set_overall(&mut doc, 0.7, CompletionStatus::Complete);
        assert_eq!(status_errors(&doc), 1);

        doc.analysis_metadata.completion_status = CompletionStatus::Partial;
        assert!(doc.validate().is_ok());
    }
}
