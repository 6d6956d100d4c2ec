// Gap & Contradiction Analysis
//
// Gaps (structural):
// - No primary asset                               content / critical
// - No style direction and no reference material   style / high
// - Output-type requirement defaulted              technical / medium-low
// - Usable asset below the quality threshold       quality / high (primary) or medium
// - Asset analysis failed                          content / medium
// - Thorough depth only: open query questions      information / low
//
// Contradictions:
// - intent_vs_assets: media assets present but none can support the output
// - style_conflict: dissimilar styles across primary/reference assets
// - constraint_conflict: stated aspect ratio vs dominant asset ratio, or a
//   stated duration beyond the platform maximum

use strsim::normalized_levenshtein;

use super::constraints::dominant_asset_aspect_ratio;
use super::model::{
    AssetUtilization, Contradiction, ContradictionType, Gap, GapAnalysis, GapType, Impact,
    UnifiedConstraints, UnifiedIntent,
};
use crate::config::{GapAnalysisDepth, ScoringConfig};
use crate::types::{AssetRole, AssetStageResult, MediaKind, OutputType, QueryAnalysis};
use crate::validation::same_aspect_ratio;

/// Inputs the gap analysis reads
pub struct GapContext<'a> {
    pub query: &'a QueryAnalysis,
    pub assets: &'a AssetStageResult,
    pub intent: &'a UnifiedIntent,
    pub constraints: &'a UnifiedConstraints,
    pub utilization: &'a AssetUtilization,
}

pub fn analyze_gaps(
    ctx: &GapContext<'_>,
    scoring: &ScoringConfig,
    depth: GapAnalysisDepth,
) -> GapAnalysis {
    let mut report = GapAnalysis::default();
    structural_gaps(ctx, &mut report);
    quality_gaps(ctx, scoring, &mut report);
    if depth == GapAnalysisDepth::Thorough {
        information_gaps(ctx, &mut report);
    }

    intent_contradictions(ctx, &mut report);
    style_contradictions(ctx, scoring, &mut report);
    constraint_contradictions(ctx, &mut report);
    report
}

fn structural_gaps(ctx: &GapContext<'_>, report: &mut GapAnalysis) {
    let output = ctx.intent.output_type;

    if ctx.utilization.primary_assets.is_empty() {
        report.gaps.push(Gap {
            gap_type: GapType::Content,
            impact: Impact::Critical,
            description: "No primary asset available; the main content must be produced from scratch"
                .to_string(),
            suggested_default: Some(format!("Generate the {} content from the request", output)),
            related_assets: Vec::new(),
        });
        report.missing_elements.push("primary_content".to_string());
    }

    if ctx.constraints.creative.styles.is_empty() && ctx.utilization.reference_assets.is_empty() {
        report.gaps.push(Gap {
            gap_type: GapType::Style,
            impact: Impact::High,
            description: "No style direction stated and no reference material supplied".to_string(),
            suggested_default: Some(format!(
                "Use the {} profile style",
                super::profiles::profile_for(output).default_style
            )),
            related_assets: Vec::new(),
        });
        report.missing_elements.push("style_direction".to_string());
    }

    let technical = &ctx.constraints.technical;
    if let Some(duration) = &technical.duration_seconds {
        if output.is_sequential() && !duration.is_stated() {
            report.gaps.push(Gap {
                gap_type: GapType::Technical,
                impact: Impact::Medium,
                description: format!("Target duration for the {} was not stated", output),
                suggested_default: Some(format!("{} seconds", duration.value)),
                related_assets: Vec::new(),
            });
            report.missing_elements.push("duration".to_string());
        }
    }
    if let Some(count) = &technical.image_count {
        if output == OutputType::Image && !count.is_stated() {
            report.gaps.push(Gap {
                gap_type: GapType::Technical,
                impact: Impact::Low,
                description: "Number of images to produce was not stated".to_string(),
                suggested_default: Some(count.value.to_string()),
                related_assets: Vec::new(),
            });
            report.missing_elements.push("image_count".to_string());
        }
    }

    for failed in ctx.assets.analyses.iter().filter(|a| !a.is_usable()) {
        report.gaps.push(Gap {
            gap_type: GapType::Content,
            impact: Impact::Medium,
            description: format!("Asset '{}' could not be analysed", failed.asset_id),
            suggested_default: Some("Re-submit the asset or proceed without it".to_string()),
            related_assets: vec![failed.asset_id.clone()],
        });
    }
}

fn quality_gaps(ctx: &GapContext<'_>, scoring: &ScoringConfig, report: &mut GapAnalysis) {
    for analysis in ctx.assets.usable() {
        if analysis.metadata.quality_score >= scoring.low_quality_threshold {
            continue;
        }
        let role = ctx.utilization.role_of(&analysis.asset_id);
        if role == Some(AssetRole::Unused) {
            continue;
        }
        let flagged = analysis.processing.enhancements.flagged();
        let suggestion = if flagged.is_empty() {
            "Use as reference only or replace with a higher quality source".to_string()
        } else {
            format!("Apply {}", flagged.join(", "))
        };
        report.gaps.push(Gap {
            gap_type: GapType::Quality,
            impact: if role == Some(AssetRole::Primary) {
                Impact::High
            } else {
                Impact::Medium
            },
            description: format!(
                "Asset '{}' quality {:.1} is below {:.1}",
                analysis.asset_id, analysis.metadata.quality_score, scoring.low_quality_threshold
            ),
            suggested_default: Some(suggestion),
            related_assets: vec![analysis.asset_id.clone()],
        });
    }
}

fn information_gaps(ctx: &GapContext<'_>, report: &mut GapAnalysis) {
    let gaps = &ctx.query.gaps;
    if gaps.missing_subject {
        report.gaps.push(Gap {
            gap_type: GapType::Information,
            impact: Impact::Medium,
            description: "The subject of the piece was not stated".to_string(),
            suggested_default: None,
            related_assets: Vec::new(),
        });
        report.missing_elements.push("subject".to_string());
    }
    if gaps.missing_mood && ctx.constraints.creative.moods.is_empty() {
        report.gaps.push(Gap {
            gap_type: GapType::Information,
            impact: Impact::Low,
            description: "No mood stated or observed in the assets".to_string(),
            suggested_default: Some("neutral".to_string()),
            related_assets: Vec::new(),
        });
    }
    for question in &gaps.clarifications {
        report.gaps.push(Gap {
            gap_type: GapType::Information,
            impact: Impact::Low,
            description: question.clone(),
            suggested_default: None,
            related_assets: Vec::new(),
        });
    }
}

/// Whether an asset kind can supply material for an output type (text is neutral)
fn supports(kind: MediaKind, output: OutputType) -> bool {
    match output {
        OutputType::Image => matches!(kind, MediaKind::Image | MediaKind::Video),
        OutputType::Video => matches!(kind, MediaKind::Video | MediaKind::Image),
        OutputType::Audio => matches!(kind, MediaKind::Audio | MediaKind::Video),
        OutputType::Mixed => true,
    }
}

fn intent_contradictions(ctx: &GapContext<'_>, report: &mut GapAnalysis) {
    let output = ctx.intent.output_type;
    let media: Vec<_> = ctx
        .assets
        .usable()
        .filter(|a| a.kind != MediaKind::Text)
        .collect();
    if media.is_empty() || media.iter().any(|a| supports(a.kind, output)) {
        return;
    }
    let kinds: Vec<&str> = {
        let mut k: Vec<&str> = media.iter().map(|a| a.kind.as_str()).collect();
        k.sort_unstable();
        k.dedup();
        k
    };
    report.contradictions.push(Contradiction {
        contradiction_type: ContradictionType::IntentVsAssets,
        description: format!(
            "Requested {} output but only {} assets were supplied",
            output,
            kinds.join("/")
        ),
        involved: media.iter().map(|a| a.asset_id.clone()).collect(),
        resolution: format!(
            "Generate the {} content and use the supplied assets as reference",
            output
        ),
    });
}

fn style_contradictions(ctx: &GapContext<'_>, scoring: &ScoringConfig, report: &mut GapAnalysis) {
    let mut styled: Vec<(&str, String)> = Vec::new();
    for assignment in ctx
        .utilization
        .primary_assets
        .iter()
        .chain(&ctx.utilization.reference_assets)
    {
        if let Some(style) = ctx
            .assets
            .find(&assignment.asset_id)
            .and_then(|a| a.content.style.as_deref())
        {
            let style = style.trim().to_lowercase();
            if !style.is_empty() && !styled.iter().any(|(_, s)| *s == style) {
                styled.push((assignment.asset_id.as_str(), style));
            }
        }
    }

    for (i, (id_a, style_a)) in styled.iter().enumerate() {
        for (id_b, style_b) in styled.iter().skip(i + 1) {
            if normalized_levenshtein(style_a, style_b) < scoring.style_similarity_threshold {
                report.contradictions.push(Contradiction {
                    contradiction_type: ContradictionType::StyleConflict,
                    description: format!(
                        "Asset '{}' is {} while asset '{}' is {}",
                        id_a, style_a, id_b, style_b
                    ),
                    involved: vec![id_a.to_string(), id_b.to_string()],
                    resolution: format!(
                        "Lead with the {} look of '{}' and grade '{}' to match",
                        style_a, id_a, id_b
                    ),
                });
            }
        }
    }
}

fn constraint_contradictions(ctx: &GapContext<'_>, report: &mut GapAnalysis) {
    let technical = &ctx.constraints.technical;

    if let Some(stated) = technical.aspect_ratio.as_ref().filter(|r| r.is_stated()) {
        if let Some(dominant) = dominant_asset_aspect_ratio(ctx.assets) {
            if !same_aspect_ratio(&dominant, &stated.value) {
                report.contradictions.push(Contradiction {
                    contradiction_type: ContradictionType::ConstraintConflict,
                    description: format!(
                        "Requested aspect ratio {} differs from the assets' dominant {}",
                        stated.value, dominant
                    ),
                    involved: vec!["aspect_ratio".to_string()],
                    resolution: format!("Reframe or crop the {} material to {}", dominant, stated.value),
                });
            }
        }
    }

    if let (Some(duration), Some(max)) = (
        technical.duration_seconds.as_ref().filter(|d| d.is_stated()),
        ctx.constraints.platform.max_duration_seconds,
    ) {
        if duration.value > max {
            report.contradictions.push(Contradiction {
                contradiction_type: ContradictionType::ConstraintConflict,
                description: format!(
                    "Requested duration {}s exceeds the platform maximum {}s",
                    duration.value, max
                ),
                involved: vec!["duration_seconds".to_string(), "platforms".to_string()],
                resolution: format!("Cut a {}s platform edit alongside the full version", max),
            });
        }
    }
}
