// Stage 3: Combination Synthesizer
//
// Concept: Cross-reference the query and the asset analyses into one project model
// Synchronization: Reads the validated stage 1 and stage 2 outputs, never
// mutates them; produces a validated UnifiedProjectUnderstanding
//
// Algorithm (strict order):
// 1. Unify intent; fetch a creative direction from a provider (non-fatal,
//    template fallback; asset-free mode uses the profile default)
// 2. Unify constraints
// 3. Build the asset-utilization plan
// 4. Gap and contradiction analysis
// 5. Creative synthesis
// 6. Production recommendations
// 7. Synthesis metadata, then schema validation (the only fatal path)

pub mod constraints;
pub mod creative;
pub mod gaps;
pub mod intent;
pub mod model;
pub mod profiles;
pub mod recommendations;
pub mod scoring;
pub mod utilization;

pub use model::UnifiedProjectUnderstanding;

use brieflow_common::time::SharedClock;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::StageError;
use crate::config::{GapAnalysisDepth, ScoringConfig, SynthesisConfig};
use crate::provider::{CallPolicy, GenerateOptions, ModelPreference, ProviderChain};
use crate::types::{AssetStageResult, QueryAnalysis};
use crate::validation::Schema;
use gaps::GapContext;
use model::{DirectionSource, SynthesisMetadata};
use profiles::profile_for;
use recommendations::RecommendationContext;

/// Per-run synthesis options
#[derive(Debug, Clone)]
pub struct SynthesisOptions {
    pub model_preference: ModelPreference,
    /// Ask a provider for the creative direction
    pub ai_synthesis: bool,
    pub gap_analysis_depth: GapAnalysisDepth,
    pub provider_timeout: Duration,
    pub scoring: ScoringConfig,
}

impl SynthesisOptions {
    pub fn from_config(config: &SynthesisConfig, scoring: &ScoringConfig) -> Self {
        Self {
            model_preference: config.model_preference.clone(),
            ai_synthesis: config.ai_synthesis,
            gap_analysis_depth: config.gap_analysis_depth,
            provider_timeout: Duration::from_secs(config.provider_timeout_secs.max(1)),
            scoring: scoring.clone(),
        }
    }
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self::from_config(&SynthesisConfig::default(), &ScoringConfig::default())
    }
}

/// Stage 3 result plus bookkeeping for the assembler
#[derive(Debug, Clone)]
pub struct SynthesisOutput {
    pub understanding: UnifiedProjectUnderstanding,
    /// Provider that wrote the creative direction, if any
    pub provider_id: Option<String>,
    pub elapsed_ms: u64,
    pub warnings: Vec<String>,
}

/// Combination synthesizer (stage 3)
pub struct Synthesizer {
    chain: ProviderChain,
    clock: SharedClock,
}

impl Synthesizer {
    pub fn new(chain: ProviderChain, clock: SharedClock) -> Self {
        Self { chain, clock }
    }

    /// Derive the unified project understanding
    ///
    /// # Arguments
    /// * `query` - Validated stage 1 output
    /// * `assets` - Validated stage 2 output (may be empty)
    /// * `options` - Toggles, provider preference and scoring constants
    ///
    /// # Returns
    /// The validated understanding, or a schema violation if any derived
    /// value breaks its declared shape
    pub async fn synthesize(
        &self,
        query: &QueryAnalysis,
        assets: &AssetStageResult,
        options: &SynthesisOptions,
    ) -> Result<SynthesisOutput, StageError> {
        let start = self.clock.now();
        let weights = &options.scoring;
        let asset_free = assets.analyses.is_empty();
        let mut warnings = Vec::new();

        // 1. Intent
        let mut intent = intent::unify_intent(query, assets, weights);
        let mut provider_id = None;
        if asset_free {
            intent.creative_direction = profile_for(intent.output_type).default_direction.to_string();
            intent.direction_source = DirectionSource::ProfileDefault;
        } else if options.ai_synthesis && !self.chain.is_empty() {
            let prompt = intent::build_direction_prompt(query, &intent, assets);
            let policy = CallPolicy::new(options.model_preference.clone(), options.provider_timeout);
            match self
                .chain
                .execute_parsed(&prompt, &GenerateOptions::creative(), &policy, intent::parse_direction)
                .await
            {
                Ok(success) => {
                    intent.creative_direction = success.value;
                    intent.direction_source = DirectionSource::Provider;
                    provider_id = Some(success.provider_id);
                }
                Err(e) => {
                    warn!(error = %e, "Creative direction unavailable, using template");
                    warnings.push(format!("Creative direction fell back to template: {}", e));
                    intent.creative_direction = intent::template_direction(query, &intent);
                    intent.direction_source = DirectionSource::Template;
                }
            }
        } else {
            intent.creative_direction = intent::template_direction(query, &intent);
            intent.direction_source = DirectionSource::Template;
        }
        debug!(
            output_type = %intent.output_type,
            confidence = intent.confidence,
            mixed = intent.mixed_scenario,
            "Intent unified"
        );

        // 2. Constraints
        let (constraints, constraint_warnings) = constraints::unify_constraints(query, &intent, assets);
        warnings.extend(constraint_warnings);

        // 3. Utilization
        let utilization = utilization::plan_utilization(assets, weights);

        // 4. Gaps and contradictions
        let gap_analysis = gaps::analyze_gaps(
            &GapContext {
                query,
                assets,
                intent: &intent,
                constraints: &constraints,
                utilization: &utilization,
            },
            weights,
            options.gap_analysis_depth,
        );

        // 5. Creative synthesis
        let creative = creative::synthesize_creative(query, &intent, &constraints, &utilization, assets);

        // 6. Recommendations
        let (complexity_score, complexity) =
            scoring::complexity(assets, &constraints, &gap_analysis, weights);
        let recommendations = recommendations::recommend(&RecommendationContext {
            intent: &intent,
            constraints: &constraints,
            utilization: &utilization,
            gaps: &gap_analysis,
            assets,
            complexity,
        });

        // 7. Metadata
        let alignment_score = scoring::alignment_score(assets);
        let metadata = SynthesisMetadata {
            synthesis_confidence: scoring::synthesis_confidence(intent.confidence, alignment_score),
            alignment_score,
            completeness_score: scoring::completeness_score(&gap_analysis, weights),
            complexity,
            complexity_score,
            asset_free,
            processing_time_ms: self.clock.elapsed_ms(start),
            provider: provider_id.clone(),
        };

        let understanding = UnifiedProjectUnderstanding {
            intent,
            constraints,
            utilization,
            gap_analysis,
            creative,
            recommendations,
            metadata,
        };
        understanding.validate()?;

        info!(
            output_type = %understanding.intent.output_type,
            synthesis_confidence = understanding.metadata.synthesis_confidence,
            completeness = understanding.metadata.completeness_score,
            complexity = understanding.metadata.complexity.as_str(),
            gaps = understanding.gap_analysis.gaps.len(),
            contradictions = understanding.gap_analysis.contradictions.len(),
            "Synthesis complete"
        );

        Ok(SynthesisOutput {
            elapsed_ms: understanding.metadata.processing_time_ms,
            understanding,
            provider_id,
            warnings,
        })
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::*;
    use chrono::{TimeZone, Utc};
    use std::collections::BTreeMap;

    pub fn query(output_type: OutputType, confidence: f64) -> QueryAnalysis {
        QueryAnalysis {
            original_query: "make something".to_string(),
            normalized_query: "Make something.".to_string(),
            intent: Intent {
                output_type,
                confidence,
                reasoning: "stated in the request".to_string(),
                secondary_outputs: vec![],
            },
            modifiers: Modifiers::default(),
            constraints: QueryConstraints::default(),
            gaps: QueryGaps::default(),
            creative_reframing: None,
            metadata: QueryMetadata {
                timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                processing_time_ms: 1,
                provider: "stub".to_string(),
                normalization_applied: false,
                grammar_corrected: false,
                ui_override_applied: false,
            },
        }
    }

    pub fn analysis(id: &str, kind: MediaKind, score: f64, quality: f64, hint: AssetRole) -> AssetAnalysis {
        AssetAnalysis {
            asset_id: id.to_string(),
            kind,
            locator: format!("/media/{}", id),
            metadata: AssetMetadata {
                quality_score: quality,
                ..Default::default()
            },
            content: ContentSummary {
                description: format!("{} asset {}", kind, id),
                ..Default::default()
            },
            alignment: QueryAlignment {
                score,
                role: hint,
                contributions: vec![],
            },
            processing: ProcessingNeeds::default(),
            outcome: ProcessingOutcome::Success,
            error: None,
            provider: Some("stub".to_string()),
            processing_time_ms: 1,
        }
    }

    pub fn failed(id: &str, kind: MediaKind) -> AssetAnalysis {
        AssetAnalysis::failed(&MediaAsset::new(id, kind, format!("/media/{}", id)), "provider down", 1)
    }

    /// Stage result with a consistent summary
    pub fn stage(analyses: Vec<AssetAnalysis>) -> AssetStageResult {
        let mut by_kind = BTreeMap::new();
        for a in &analyses {
            *by_kind.entry(a.kind).or_default() += 1;
        }
        let usable: Vec<&AssetAnalysis> = analyses.iter().filter(|a| a.is_usable()).collect();
        let quality = if usable.is_empty() {
            0.0
        } else {
            usable.iter().map(|a| a.metadata.quality_score).sum::<f64>() / usable.len() as f64
        };
        let summary = AssetSummary {
            total_assets: analyses.len(),
            by_kind,
            successes: usable.len(),
            partials: 0,
            failures: analyses.len() - usable.len(),
            overall_quality_score: quality,
            primary_candidates: vec![],
            reference_candidates: vec![],
            processing_time_ms: 1,
        };
        AssetStageResult {
            success: analyses.is_empty() || !usable.is_empty(),
            analyses,
            summary,
            provider_usage: BTreeMap::new(),
        }
    }
}
