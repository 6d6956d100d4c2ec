// Production Recommendations
//
// Concept: Ordered production workflow for the unified project
//
// Step order (conditional steps are skipped, numbering stays contiguous):
// 1. asset_preparation       usable assets flagged for enhancement
// 2. style_reference_board   reference assets or stated styles exist
// 3. content_generation      no primary asset, or
//    content_editing         primary assets available
// 4. audio_integration       video or mixed output
// 5. post_processing         always
// 6. platform_export         always
//
// Estimated minutes scale with the complexity tier.

use super::model::{
    AssetUtilization, ComplexityTier, GapAnalysis, Optimization, OptimizationDimension,
    PipelineStep, ProductionRecommendations, QualityTargets, UnifiedConstraints, UnifiedIntent,
};
use super::profiles::{platform_for, profile_for};
use crate::types::{AssetStageResult, MediaKind, OutputType};

/// Inputs the recommender reads
pub struct RecommendationContext<'a> {
    pub intent: &'a UnifiedIntent,
    pub constraints: &'a UnifiedConstraints,
    pub utilization: &'a AssetUtilization,
    pub gaps: &'a GapAnalysis,
    pub assets: &'a AssetStageResult,
    pub complexity: ComplexityTier,
}

fn scale_minutes(base: u32, tier: ComplexityTier) -> u32 {
    match tier {
        ComplexityTier::Simple => base,
        ComplexityTier::Moderate => base * 3 / 2,
        ComplexityTier::Complex => base * 5 / 2,
    }
}

pub fn recommend(ctx: &RecommendationContext<'_>) -> ProductionRecommendations {
    ProductionRecommendations {
        steps: build_steps(ctx),
        quality_targets: quality_targets(ctx),
        optimizations: optimizations(ctx),
    }
}

struct StepDraft {
    id: &'static str,
    name: &'static str,
    inputs: Vec<String>,
    expected_output: String,
    tool_categories: Vec<String>,
    base_minutes: u32,
}

fn build_steps(ctx: &RecommendationContext<'_>) -> Vec<PipelineStep> {
    let output = ctx.intent.output_type;
    let production = &ctx.constraints.production;
    let mut drafts: Vec<StepDraft> = Vec::new();

    if !production.enhancement_assets.is_empty() {
        let mut tools = Vec::new();
        for id in &production.enhancement_assets {
            if let Some(a) = ctx.assets.find(id) {
                for tool in &a.processing.recommended_tools {
                    if !tools.contains(tool) {
                        tools.push(tool.clone());
                    }
                }
                for flag in a.processing.enhancements.flagged() {
                    let tool = flag.to_string();
                    if !tools.contains(&tool) {
                        tools.push(tool);
                    }
                }
            }
        }
        drafts.push(StepDraft {
            id: "asset_preparation",
            name: "Asset preparation",
            inputs: production.enhancement_assets.clone(),
            expected_output: "Enhanced source assets".to_string(),
            tool_categories: tools,
            base_minutes: 10 * production.enhancement_assets.len() as u32,
        });
    }

    let references: Vec<String> = ctx
        .utilization
        .reference_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !references.is_empty() || !ctx.constraints.creative.styles.is_empty() {
        let mut inputs = references;
        inputs.extend(ctx.constraints.creative.styles.iter().map(|s| format!("style:{}", s)));
        drafts.push(StepDraft {
            id: "style_reference_board",
            name: "Style reference board",
            inputs,
            expected_output: "Approved look and feel references".to_string(),
            tool_categories: vec!["moodboard".to_string()],
            base_minutes: 15,
        });
    }

    let primaries: Vec<String> = ctx
        .utilization
        .primary_ids()
        .into_iter()
        .map(str::to_string)
        .collect();
    if primaries.is_empty() {
        drafts.push(StepDraft {
            id: "content_generation",
            name: "Content generation",
            inputs: vec!["creative_direction".to_string()],
            expected_output: format!("Generated {} draft", output),
            tool_categories: vec![format!("{}_generator", generator_kind(output))],
            base_minutes: 30,
        });
    } else {
        drafts.push(StepDraft {
            id: "content_editing",
            name: "Content editing",
            inputs: primaries,
            expected_output: format!("Edited {} cut", output),
            tool_categories: vec![editor_for(output).to_string()],
            base_minutes: 45,
        });
    }

    if matches!(output, OutputType::Video | OutputType::Mixed) {
        let audio: Vec<String> = ctx
            .assets
            .usable()
            .filter(|a| a.kind == MediaKind::Audio)
            .map(|a| a.asset_id.clone())
            .collect();
        let generated = audio.is_empty();
        drafts.push(StepDraft {
            id: "audio_integration",
            name: "Audio integration",
            inputs: if generated {
                vec!["generated_soundtrack".to_string()]
            } else {
                audio
            },
            expected_output: "Mixed soundtrack synced to picture".to_string(),
            tool_categories: if generated {
                vec!["audio_generator".to_string(), "audio_editor".to_string()]
            } else {
                vec!["audio_editor".to_string()]
            },
            base_minutes: 20,
        });
    }

    drafts.push(StepDraft {
        id: "post_processing",
        name: "Post-processing",
        inputs: vec!["edited_master".to_string()],
        expected_output: if output == OutputType::Audio {
            "Mastered audio".to_string()
        } else {
            "Color-graded master".to_string()
        },
        tool_categories: vec![if output == OutputType::Audio {
            "mastering".to_string()
        } else {
            "color_grading".to_string()
        }],
        base_minutes: 15,
    });

    let targets = if ctx.constraints.platform.targets.is_empty() {
        vec!["default".to_string()]
    } else {
        ctx.constraints.platform.targets.clone()
    };
    drafts.push(StepDraft {
        id: "platform_export",
        name: "Platform export",
        inputs: targets,
        expected_output: format!("{} deliverables", ctx.constraints.technical.format.value),
        tool_categories: vec!["encoder".to_string()],
        base_minutes: 5,
    });

    drafts
        .into_iter()
        .enumerate()
        .map(|(i, d)| PipelineStep {
            order: i as u32 + 1,
            id: d.id.to_string(),
            name: d.name.to_string(),
            inputs: d.inputs,
            expected_output: d.expected_output,
            tool_categories: d.tool_categories,
            estimated_minutes: scale_minutes(d.base_minutes.max(1), ctx.complexity),
            complexity: ctx.complexity,
        })
        .collect()
}

fn generator_kind(output: OutputType) -> &'static str {
    match output {
        OutputType::Image => "image",
        OutputType::Video => "video",
        OutputType::Audio => "audio",
        OutputType::Mixed => "multimodal",
    }
}

fn editor_for(output: OutputType) -> &'static str {
    match output {
        OutputType::Image => "image_editor",
        OutputType::Video | OutputType::Mixed => "video_editor",
        OutputType::Audio => "audio_editor",
    }
}

fn quality_targets(ctx: &RecommendationContext<'_>) -> QualityTargets {
    let output = ctx.intent.output_type;
    let technical = &ctx.constraints.technical;
    let min_quality_score = match ctx.complexity {
        ComplexityTier::Simple => 6,
        ComplexityTier::Moderate => 7,
        ComplexityTier::Complex => 8,
    };
    let loudness_lufs = if output == OutputType::Image {
        None
    } else {
        ctx.constraints
            .platform
            .targets
            .first()
            .and_then(|t| platform_for(t))
            .map(|p| p.loudness_lufs)
            .or(Some(-16.0))
    };

    QualityTargets {
        resolution: technical.resolution.value.clone(),
        aspect_ratio: technical.aspect_ratio.as_ref().map(|r| r.value.clone()),
        format: technical.format.value.clone(),
        frame_rate: profile_for(output).frame_rate,
        loudness_lufs,
        min_quality_score,
    }
}

fn optimizations(ctx: &RecommendationContext<'_>) -> Vec<Optimization> {
    let mut out = Vec::new();
    let production = &ctx.constraints.production;

    if production.enhancement_assets.len() > 1 {
        out.push(Optimization {
            dimension: OptimizationDimension::Speed,
            suggestion: format!(
                "Run the {} enhancement jobs in parallel",
                production.enhancement_assets.len()
            ),
        });
    }
    if production.requires_generation {
        out.push(Optimization {
            dimension: OptimizationDimension::Cost,
            suggestion: "Generate drafts at preview resolution and upscale only the selected take"
                .to_string(),
        });
    }
    if ctx
        .gaps
        .gaps
        .iter()
        .any(|g| g.gap_type == super::model::GapType::Quality)
    {
        out.push(Optimization {
            dimension: OptimizationDimension::Quality,
            suggestion: "Enhance low-quality sources before editing so the fixes carry into every cut"
                .to_string(),
        });
    }
    if ctx.constraints.platform.targets.len() > 1 {
        out.push(Optimization {
            dimension: OptimizationDimension::Automation,
            suggestion: format!(
                "Automate export presets for {}",
                ctx.constraints.platform.targets.join(", ")
            ),
        });
    }
    if !ctx.gaps.contradictions.is_empty() {
        out.push(Optimization {
            dimension: OptimizationDimension::Complexity,
            suggestion: format!(
                "Resolve {} contradiction(s) before production starts",
                ctx.gaps.contradictions.len()
            ),
        });
    }
    if out.is_empty() {
        out.push(Optimization {
            dimension: OptimizationDimension::Speed,
            suggestion: "Reuse the standard export preset; no special handling needed".to_string(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GapAnalysisDepth, ScoringConfig};
    use crate::pipeline::synthesis::constraints::unify_constraints;
    use crate::pipeline::synthesis::fixtures::{analysis, query, stage};
    use crate::pipeline::synthesis::gaps::{analyze_gaps, GapContext};
    use crate::pipeline::synthesis::intent::unify_intent;
    use crate::pipeline::synthesis::utilization::plan_utilization;
    use crate::types::{AssetAnalysis, AssetRole, QueryAnalysis};

    fn run(q: &QueryAnalysis, analyses: Vec<AssetAnalysis>, tier: ComplexityTier) -> ProductionRecommendations {
        let scoring = ScoringConfig::default();
        let s = stage(analyses);
        let intent = unify_intent(q, &s, &scoring);
        let (constraints, _) = unify_constraints(q, &intent, &s);
        let utilization = plan_utilization(&s, &scoring);
        let gaps = analyze_gaps(
            &GapContext {
                query: q,
                assets: &s,
                intent: &intent,
                constraints: &constraints,
                utilization: &utilization,
            },
            &scoring,
            GapAnalysisDepth::Basic,
        );
        recommend(&RecommendationContext {
            intent: &intent,
            constraints: &constraints,
            utilization: &utilization,
            gaps: &gaps,
            assets: &s,
            complexity: tier,
        })
    }

    fn ids(r: &ProductionRecommendations) -> Vec<&str> {
        r.steps.iter().map(|s| s.id.as_str()).collect()
    }

    #[test]
    fn test_asset_free_video_steps() {
        let r = run(&query(OutputType::Video, 0.9), vec![], ComplexityTier::Simple);
        assert_eq!(
            ids(&r),
            vec!["content_generation", "audio_integration", "post_processing", "platform_export"]
        );
        let orders: Vec<u32> = r.steps.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![1, 2, 3, 4]);
        assert_eq!(r.quality_targets.frame_rate, Some(30));
        assert_eq!(r.quality_targets.min_quality_score, 6);
        assert!(r
            .optimizations
            .iter()
            .any(|o| o.dimension == OptimizationDimension::Cost));
    }

    #[test]
    fn test_editing_workflow_with_enhancements() {
        let mut v = analysis("v1", MediaKind::Video, 0.9, 8.0, AssetRole::Primary);
        v.processing.enhancements.stabilization = true;
        let i = analysis("i1", MediaKind::Image, 0.5, 8.0, AssetRole::Reference);
        let a = analysis("a1", MediaKind::Audio, 0.3, 8.0, AssetRole::Supporting);

        let r = run(&query(OutputType::Video, 0.9), vec![v, i, a], ComplexityTier::Moderate);
        assert_eq!(
            ids(&r),
            vec![
                "asset_preparation",
                "style_reference_board",
                "content_editing",
                "audio_integration",
                "post_processing",
                "platform_export"
            ]
        );
        assert_eq!(r.steps[0].inputs, vec!["v1"]);
        assert!(r.steps[0].tool_categories.contains(&"stabilization".to_string()));
        assert_eq!(r.steps[0].estimated_minutes, 15);
        assert_eq!(r.steps[3].inputs, vec!["a1"]);
    }

    #[test]
    fn test_image_output_has_no_audio_step() {
        let r = run(&query(OutputType::Image, 0.9), vec![], ComplexityTier::Complex);
        assert!(!ids(&r).contains(&"audio_integration"));
        assert!(r.quality_targets.loudness_lufs.is_none());
        assert_eq!(r.quality_targets.min_quality_score, 8);
    }
}
