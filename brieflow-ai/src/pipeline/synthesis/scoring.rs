//! Synthesis scores: confidence, completeness and complexity
//!
//! All weights and penalties come from `ScoringConfig`.

use super::model::{ComplexityTier, GapAnalysis, Impact, UnifiedConstraints};
use crate::config::ScoringConfig;
use crate::types::AssetStageResult;

/// Mean alignment score of usable assets; `None` when there are none
pub fn alignment_score(assets: &AssetStageResult) -> Option<f64> {
    let scores: Vec<f64> = assets.usable().map(|a| a.alignment.score).collect();
    if scores.is_empty() {
        return None;
    }
    Some(scores.iter().sum::<f64>() / scores.len() as f64)
}

/// min(intent confidence, alignment); the intent confidence alone without assets
pub fn synthesis_confidence(intent_confidence: f64, alignment: Option<f64>) -> f64 {
    let confidence = match alignment {
        Some(a) => intent_confidence.min(a),
        None => intent_confidence,
    };
    confidence.clamp(0.0, 1.0)
}

/// 1.0 minus penalties per critical gap, high gap and missing element
pub fn completeness_score(gaps: &GapAnalysis, scoring: &ScoringConfig) -> f64 {
    let penalty = scoring.critical_gap_penalty * gaps.count_impact(Impact::Critical) as f64
        + scoring.high_gap_penalty * gaps.count_impact(Impact::High) as f64
        + scoring.missing_element_penalty * gaps.missing_elements.len() as f64;
    (1.0 - penalty).clamp(0.0, 1.0)
}

/// Complexity score in [0, 1] and its tier
///
/// Blends asset-kind diversity, the share of assets needing enhancement and
/// the number of gaps plus contradictions (saturating at ten).
pub fn complexity(
    assets: &AssetStageResult,
    constraints: &UnifiedConstraints,
    gaps: &GapAnalysis,
    scoring: &ScoringConfig,
) -> (f64, ComplexityTier) {
    let kinds = constraints.production.available_kinds.len();
    let diversity = (kinds.saturating_sub(1) as f64 / 3.0).min(1.0);

    let usable = assets.usable().count();
    let enhancement_ratio = if usable == 0 {
        0.0
    } else {
        constraints.production.enhancement_assets.len() as f64 / usable as f64
    };

    let issues = ((gaps.gaps.len() + gaps.contradictions.len()) as f64 / 10.0).min(1.0);

    let score = (scoring.complexity_diversity_weight * diversity
        + scoring.complexity_enhancement_weight * enhancement_ratio
        + scoring.complexity_issue_weight * issues)
        .clamp(0.0, 1.0);

    let tier = if score < scoring.moderate_complexity_threshold {
        ComplexityTier::Simple
    } else if score < scoring.complex_complexity_threshold {
        ComplexityTier::Moderate
    } else {
        ComplexityTier::Complex
    };
    (score, tier)
}
