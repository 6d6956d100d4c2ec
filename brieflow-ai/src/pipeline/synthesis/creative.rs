//! Creative synthesis: style fusion, mood plan and narrative beats
//!
//! Asset styles and moods are drawn only from primary and reference assets,
//! most frequent first. A narrative is derived only for sequential media
//! (video, audio); pieces of 15 seconds or less get hook and payoff only.

use super::model::{
    AssetUtilization, CreativeSynthesis, MoodPlan, NarrativeBeat, NarrativeStructure, StyleFusion,
    UnifiedConstraints, UnifiedIntent,
};
use super::profiles::profile_for;
use crate::types::{AssetStageResult, QueryAnalysis};

/// Longest piece that gets a two-beat structure
const SHORT_FORM_SECONDS: f64 = 15.0;

pub fn synthesize_creative(
    query: &QueryAnalysis,
    intent: &UnifiedIntent,
    constraints: &UnifiedConstraints,
    utilization: &AssetUtilization,
    assets: &AssetStageResult,
) -> CreativeSynthesis {
    let featured: Vec<&str> = utilization
        .primary_ids()
        .into_iter()
        .chain(utilization.reference_ids())
        .collect();

    let asset_styles = ranked(
        featured
            .iter()
            .filter_map(|id| assets.find(id))
            .filter_map(|a| a.content.style.as_deref()),
    );
    let asset_moods = ranked(
        featured
            .iter()
            .filter_map(|id| assets.find(id))
            .filter_map(|a| a.content.mood.as_deref()),
    );

    let query_styles = query.modifiers.styles().to_vec();
    let target_moods = query.modifiers.moods().to_vec();

    let style_fusion = StyleFusion {
        strategy: style_strategy(&query_styles, &asset_styles, intent),
        query_styles,
        asset_styles,
    };

    let mood_plan = MoodPlan {
        integration: mood_integration(&target_moods, &asset_moods),
        target_moods,
        asset_moods,
    };

    let narrative = if intent.output_type.is_sequential() {
        let duration = constraints
            .technical
            .duration_seconds
            .as_ref()
            .map(|d| d.value)
            .or(profile_for(intent.output_type).duration_seconds)
            .unwrap_or(30.0);
        Some(narrative_for(duration, utilization))
    } else {
        None
    };

    CreativeSynthesis {
        style_fusion,
        mood_plan,
        narrative,
    }
}

/// Distinct values, most frequent first, first occurrence breaking ties
fn ranked<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for value in values {
        let value = value.trim();
        if value.is_empty() {
            continue;
        }
        match counts.iter_mut().find(|(v, _)| v.eq_ignore_ascii_case(value)) {
            Some((_, n)) => *n += 1,
            None => counts.push((value.to_string(), 1)),
        }
    }
    // stable sort keeps first-seen order within equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(v, _)| v).collect()
}

fn style_strategy(query_styles: &[String], asset_styles: &[String], intent: &UnifiedIntent) -> String {
    match (query_styles.first(), asset_styles.first()) {
        (Some(q), Some(a)) if q.eq_ignore_ascii_case(a) => {
            format!("Stay {}: the request and the supplied material already agree", q)
        }
        (Some(q), Some(a)) => format!(
            "Blend the requested {} direction with the {} look of the supplied material, leading with {}",
            q, a, q
        ),
        (Some(q), None) => format!("Apply a {} treatment throughout", q),
        (None, Some(a)) => format!("Match the existing {} look of the supplied material", a),
        (None, None) => format!(
            "No style given; fall back to the {} profile style ({})",
            intent.output_type,
            profile_for(intent.output_type).default_style
        ),
    }
}

fn mood_integration(target: &[String], observed: &[String]) -> String {
    match (target.is_empty(), observed.is_empty()) {
        (false, false) => {
            let clashing: Vec<&String> = observed
                .iter()
                .filter(|o| !target.iter().any(|t| t.eq_ignore_ascii_case(o)))
                .collect();
            if clashing.is_empty() {
                format!("Reinforce the {} mood already present in the material", target.join("/"))
            } else {
                format!(
                    "Shift the {} material toward {} through pacing, music and grade",
                    clashing
                        .iter()
                        .map(|s| s.as_str())
                        .collect::<Vec<_>>()
                        .join("/"),
                    target.join("/")
                )
            }
        }
        (false, true) => format!("Establish a {} mood through pacing, color and sound", target.join("/")),
        (true, false) => format!("Carry the {} mood of the supplied material", observed.join("/")),
        (true, true) => "Keep a neutral, balanced mood".to_string(),
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn narrative_for(duration: f64, utilization: &AssetUtilization) -> NarrativeStructure {
    let primaries = utilization.primary_ids();
    let lead: Vec<String> = primaries.first().map(|s| s.to_string()).into_iter().collect();
    let body: Vec<String> = primaries
        .iter()
        .skip(1)
        .map(|s| s.to_string())
        .chain(utilization.supporting_assets.iter().map(|a| a.asset_id.clone()))
        .collect();

    let beats = if duration <= SHORT_FORM_SECONDS {
        let split = round1(duration * 0.3);
        vec![
            NarrativeBeat {
                name: "hook".to_string(),
                start_seconds: 0.0,
                end_seconds: split,
                purpose: "Grab attention immediately".to_string(),
                assets: lead,
            },
            NarrativeBeat {
                name: "payoff".to_string(),
                start_seconds: split,
                end_seconds: duration,
                purpose: "Deliver the message and call to action".to_string(),
                assets: body,
            },
        ]
    } else {
        let hook_end = round1(duration * 0.15);
        let build_end = round1(duration * 0.8);
        vec![
            NarrativeBeat {
                name: "hook".to_string(),
                start_seconds: 0.0,
                end_seconds: hook_end,
                purpose: "Grab attention with the strongest moment".to_string(),
                assets: lead,
            },
            NarrativeBeat {
                name: "build".to_string(),
                start_seconds: hook_end,
                end_seconds: build_end,
                purpose: "Develop the subject and raise energy".to_string(),
                assets: body,
            },
            NarrativeBeat {
                name: "payoff".to_string(),
                start_seconds: build_end,
                end_seconds: duration,
                purpose: "Resolve and land the closing message".to_string(),
                assets: Vec::new(),
            },
        ]
    };

    NarrativeStructure {
        total_duration_seconds: duration,
        beats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use crate::pipeline::synthesis::constraints::unify_constraints;
    use crate::pipeline::synthesis::fixtures::{analysis, query, stage};
    use crate::pipeline::synthesis::intent::unify_intent;
    use crate::pipeline::synthesis::utilization::plan_utilization;
    use crate::types::{AssetAnalysis, AssetRole, ConstraintValue, MediaKind, OutputType};

    fn run(q: &QueryAnalysis, analyses: Vec<AssetAnalysis>) -> CreativeSynthesis {
        let scoring = ScoringConfig::default();
        let s = stage(analyses);
        let intent = unify_intent(q, &s, &scoring);
        let (constraints, _) = unify_constraints(q, &intent, &s);
        let utilization = plan_utilization(&s, &scoring);
        synthesize_creative(q, &intent, &constraints, &utilization, &s)
    }

    #[test]
    fn test_long_video_gets_three_beats() {
        let mut q = query(OutputType::Video, 0.9);
        q.constraints.duration_seconds = Some(ConstraintValue::Single(30.0));
        let creative = run(
            &q,
            vec![
                analysis("v1", MediaKind::Video, 0.95, 9.0, AssetRole::Primary),
                analysis("v2", MediaKind::Video, 0.8, 7.0, AssetRole::Primary),
            ],
        );
        let narrative = creative.narrative.unwrap();
        let names: Vec<&str> = narrative.beats.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["hook", "build", "payoff"]);
        assert_eq!(narrative.beats[0].end_seconds, 4.5);
        assert_eq!(narrative.beats[1].end_seconds, 24.0);
        assert_eq!(narrative.beats[2].end_seconds, 30.0);
        assert_eq!(narrative.beats[0].assets, vec!["v1"]);
        assert_eq!(narrative.beats[1].assets, vec!["v2"]);
    }

    #[test]
    fn test_short_form_gets_hook_and_payoff() {
        let mut q = query(OutputType::Video, 0.9);
        q.constraints.duration_seconds = Some(ConstraintValue::Single(10.0));
        let creative = run(&q, vec![]);
        let narrative = creative.narrative.unwrap();
        assert_eq!(narrative.beats.len(), 2);
        assert_eq!(narrative.beats[0].end_seconds, 3.0);
    }

    #[test]
    fn test_images_have_no_narrative() {
        let creative = run(&query(OutputType::Image, 0.9), vec![]);
        assert!(creative.narrative.is_none());
        assert!(creative.style_fusion.strategy.contains("clean editorial"));
        assert_eq!(creative.mood_plan.integration, "Keep a neutral, balanced mood");
    }

    #[test]
    fn test_style_fusion_ranks_asset_styles() {
        let mut q = query(OutputType::Image, 0.9);
        q.modifiers.style = Some(vec!["bold".to_string()]);
        q.modifiers.mood = Some(vec!["energetic".to_string()]);
        let mut a = analysis("i1", MediaKind::Image, 0.9, 8.0, AssetRole::Primary);
        a.content.style = Some("retro".to_string());
        a.content.mood = Some("calm".to_string());
        let mut b = analysis("i2", MediaKind::Image, 0.5, 8.0, AssetRole::Reference);
        b.content.style = Some("flat".to_string());
        let mut c = analysis("i3", MediaKind::Image, 0.5, 8.0, AssetRole::Reference);
        c.content.style = Some("Flat".to_string());

        let creative = run(&q, vec![a, b, c]);
        assert_eq!(creative.style_fusion.asset_styles, vec!["flat", "retro"]);
        assert!(creative.style_fusion.strategy.starts_with("Blend the requested bold"));
        assert!(creative.mood_plan.integration.contains("Shift the calm material toward energetic"));
    }
}
