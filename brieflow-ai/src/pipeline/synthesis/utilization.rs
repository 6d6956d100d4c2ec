// Asset Utilization Plan
//
// Concept: Partition every analysed asset into exactly one bucket
//
// Rules, evaluated per asset (score = alignment score, hint = stage 2 role):
// - Failed analysis                                -> unused
// - score >= primary threshold                     -> primary (reference if hinted reference)
// - score >= reference threshold                   -> reference, except
//     hint primary with score >= midpoint          -> primary
//     hint supporting                              -> supporting
// - score >= supporting threshold                  -> supporting
// - otherwise                                      -> unused
//
// Primary assets also get a processing priority tier from a blend of
// alignment and quality.

use super::model::{utilization_rate, AssetAssignment, AssetUtilization, PriorityTier};
use crate::config::ScoringConfig;
use crate::types::{AssetAnalysis, AssetRole, AssetStageResult};

pub fn plan_utilization(assets: &AssetStageResult, scoring: &ScoringConfig) -> AssetUtilization {
    let mut plan = AssetUtilization {
        total_assets: assets.analyses.len(),
        ..Default::default()
    };

    for analysis in &assets.analyses {
        let (role, rationale) = classify(analysis, scoring);
        let assignment = AssetAssignment {
            asset_id: analysis.asset_id.clone(),
            kind: analysis.kind,
            role,
            score: analysis.alignment.score.clamp(0.0, 1.0),
            rationale,
            priority: (role == AssetRole::Primary).then(|| priority_tier(analysis, scoring)),
        };
        match role {
            AssetRole::Primary => plan.primary_assets.push(assignment),
            AssetRole::Reference => plan.reference_assets.push(assignment),
            AssetRole::Supporting => plan.supporting_assets.push(assignment),
            AssetRole::Unused => plan.unused_assets.push(assignment),
        }
    }

    // highest priority first, input order within a tier
    plan.primary_assets.sort_by_key(|a| a.priority);
    plan.utilization_rate = utilization_rate(&plan);
    plan
}

fn classify(analysis: &AssetAnalysis, scoring: &ScoringConfig) -> (AssetRole, String) {
    if !analysis.is_usable() {
        let cause = analysis.error.as_deref().unwrap_or("unknown error");
        return (AssetRole::Unused, format!("Analysis failed: {}", cause));
    }

    let score = analysis.alignment.score;
    let hint = analysis.alignment.role;
    let primary_t = scoring.primary_alignment_threshold;
    let reference_t = scoring.reference_alignment_threshold;
    let midpoint = (primary_t + reference_t) / 2.0;

    if score >= primary_t {
        if hint == AssetRole::Reference {
            return (
                AssetRole::Reference,
                format!("Strong alignment ({:.2}) but analysed as reference material", score),
            );
        }
        return (
            AssetRole::Primary,
            format!("Alignment {:.2} meets the primary threshold {:.2}", score, primary_t),
        );
    }

    if score >= reference_t {
        return match hint {
            AssetRole::Primary if score >= midpoint => (
                AssetRole::Primary,
                format!("Alignment {:.2} with a primary-content hint", score),
            ),
            AssetRole::Supporting => (
                AssetRole::Supporting,
                format!("Alignment {:.2}; analysed as supporting material", score),
            ),
            _ => (
                AssetRole::Reference,
                format!("Alignment {:.2} suits reference use", score),
            ),
        };
    }

    if score >= scoring.supporting_alignment_threshold {
        return (
            AssetRole::Supporting,
            format!("Weak alignment {:.2}; usable as supporting material", score),
        );
    }

    (
        AssetRole::Unused,
        format!(
            "Alignment {:.2} below the supporting threshold {:.2}",
            score, scoring.supporting_alignment_threshold
        ),
    )
}

fn priority_tier(analysis: &AssetAnalysis, scoring: &ScoringConfig) -> PriorityTier {
    let weight = scoring.priority_alignment_weight * analysis.alignment.score
        + scoring.priority_quality_weight * (analysis.metadata.quality_score / 10.0);
    if weight >= scoring.critical_priority_threshold {
        PriorityTier::Critical
    } else if weight >= scoring.high_priority_threshold {
        PriorityTier::High
    } else if weight >= scoring.medium_priority_threshold {
        PriorityTier::Medium
    } else {
        PriorityTier::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::synthesis::fixtures::{analysis, failed, stage};
    use crate::types::MediaKind;

    fn role_of(score: f64, hint: AssetRole) -> AssetRole {
        let a = analysis("a", MediaKind::Image, score, 7.0, hint);
        classify(&a, &ScoringConfig::default()).0
    }

    #[test]
    fn test_thresholds_and_hints() {
        assert_eq!(role_of(0.9, AssetRole::Primary), AssetRole::Primary);
        assert_eq!(role_of(0.9, AssetRole::Reference), AssetRole::Reference);
        assert_eq!(role_of(0.6, AssetRole::Primary), AssetRole::Primary);
        assert_eq!(role_of(0.5, AssetRole::Primary), AssetRole::Reference);
        assert_eq!(role_of(0.5, AssetRole::Supporting), AssetRole::Supporting);
        assert_eq!(role_of(0.5, AssetRole::Unused), AssetRole::Reference);
        assert_eq!(role_of(0.3, AssetRole::Primary), AssetRole::Supporting);
        assert_eq!(role_of(0.1, AssetRole::Primary), AssetRole::Unused);
    }

    #[test]
    fn test_every_asset_lands_in_one_bucket() {
        let s = stage(vec![
            analysis("v1", MediaKind::Video, 0.95, 9.0, AssetRole::Primary),
            analysis("i1", MediaKind::Image, 0.5, 6.0, AssetRole::Reference),
            failed("i2", MediaKind::Image),
            analysis("a1", MediaKind::Audio, 0.3, 6.0, AssetRole::Supporting),
            analysis("t1", MediaKind::Text, 0.05, 6.0, AssetRole::Reference),
        ]);
        let plan = plan_utilization(&s, &ScoringConfig::default());

        assert_eq!(plan.assigned_count(), 5);
        assert_eq!(plan.primary_ids(), vec!["v1"]);
        assert_eq!(plan.reference_ids(), vec!["i1"]);
        assert_eq!(plan.role_of("a1"), Some(AssetRole::Supporting));
        assert_eq!(plan.role_of("i2"), Some(AssetRole::Unused));
        assert_eq!(plan.role_of("t1"), Some(AssetRole::Unused));
        assert!((plan.utilization_rate - 0.6).abs() < 1e-9);
        assert_eq!(plan.primary_assets[0].priority, Some(PriorityTier::Critical));
        assert!(plan.reference_assets[0].priority.is_none());
    }

    #[test]
    fn test_empty_plan() {
        let plan = plan_utilization(&stage(vec![]), &ScoringConfig::default());
        assert_eq!(plan.total_assets, 0);
        assert_eq!(plan.utilization_rate, 0.0);
    }

    #[test]
    fn test_primaries_sorted_by_priority() {
        let s = stage(vec![
            analysis("low", MediaKind::Video, 0.72, 2.0, AssetRole::Primary),
            analysis("top", MediaKind::Video, 0.99, 10.0, AssetRole::Primary),
        ]);
        let plan = plan_utilization(&s, &ScoringConfig::default());
        assert_eq!(plan.primary_ids(), vec!["top", "low"]);
    }

    #[test]
    fn test_priority_tier_follows_scoring() {
        let a = analysis("v1", MediaKind::Video, 0.8, 5.0, AssetRole::Primary);

        // 0.7 * 0.8 + 0.3 * 0.5 = 0.71
        assert_eq!(priority_tier(&a, &ScoringConfig::default()), PriorityTier::Medium);

        let alignment_only = ScoringConfig {
            priority_alignment_weight: 1.0,
            priority_quality_weight: 0.0,
            ..Default::default()
        };
        assert_eq!(priority_tier(&a, &alignment_only), PriorityTier::High);

        let strict = ScoringConfig {
            medium_priority_threshold: 0.75,
            high_priority_threshold: 0.8,
            critical_priority_threshold: 0.9,
            ..Default::default()
        };
        assert_eq!(priority_tier(&a, &strict), PriorityTier::Low);
    }
}
