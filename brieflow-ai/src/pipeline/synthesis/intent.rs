// Intent Unification
//
// Concept: One authoritative output type for the project
//
// Algorithm:
// 1. Start from the query's declared output type and confidence
// 2. Usable assets whose kind stands for the declared type corroborate it;
//    any corroboration adds a fixed boost (capped at 1.0)
// 3. Mixed scenario: two or more media kinds among usable assets (text is
//    neutral) and no kind strictly outnumbers the rest
// 4. A mixed scenario switches the output to `mixed` only when the query
//    was unsure (confidence below the override threshold) and the type was
//    not selected by the caller; otherwise the other kinds become secondary
//    outputs

use std::collections::BTreeMap;

use super::model::{DirectionSource, UnifiedIntent};
use super::profiles::profile_for;
use crate::config::ScoringConfig;
use crate::types::{AssetStageResult, MediaKind, OutputType, QueryAnalysis};

/// Marker identifying creative-direction prompts
pub const DIRECTION_PROMPT_MARKER: &str = "### brieflow:creative_direction";

pub fn unify_intent(
    query: &QueryAnalysis,
    assets: &AssetStageResult,
    scoring: &ScoringConfig,
) -> UnifiedIntent {
    let declared = query.intent.output_type;
    let mut confidence = query.intent.confidence;
    let mut reasoning = query.intent.reasoning.trim().to_string();

    let mut kind_counts: BTreeMap<MediaKind, usize> = BTreeMap::new();
    for analysis in assets.usable() {
        if analysis.kind != MediaKind::Text {
            *kind_counts.entry(analysis.kind).or_default() += 1;
        }
    }

    let corroborating: Vec<String> = assets
        .usable()
        .filter(|a| declared == OutputType::Mixed || a.kind.as_output() == Some(declared))
        .map(|a| a.asset_id.clone())
        .collect();

    if !corroborating.is_empty() {
        confidence = (confidence + scoring.corroboration_boost).min(1.0);
        append_sentence(
            &mut reasoning,
            &format!(
                "{} supplied asset(s) corroborate the {} output",
                corroborating.len(),
                declared
            ),
        );
    }

    let mixed_scenario = is_mixed(&kind_counts);

    let mut output_type = declared;
    let mut secondary_outputs = query.intent.secondary_outputs.clone();

    if mixed_scenario && declared != OutputType::Mixed {
        let present: Vec<OutputType> = kind_counts.keys().filter_map(|k| k.as_output()).collect();
        if confidence < scoring.mixed_override_confidence && !query.metadata.ui_override_applied {
            append_sentence(
                &mut reasoning,
                &format!(
                    "Assets span {} with no dominant kind; treating the project as mixed media",
                    join_kinds(&kind_counts)
                ),
            );
            secondary_outputs.push(declared);
            secondary_outputs.extend(present);
            output_type = OutputType::Mixed;
        } else {
            secondary_outputs.extend(present);
        }
    }

    let mut deduped: Vec<OutputType> = Vec::new();
    for o in secondary_outputs {
        if o != output_type && o != OutputType::Mixed && !deduped.contains(&o) {
            deduped.push(o);
        }
    }

    if reasoning.is_empty() {
        reasoning = format!("Output type {} taken from the query", output_type);
    }

    UnifiedIntent {
        output_type,
        confidence: confidence.clamp(0.0, 1.0),
        reasoning,
        secondary_outputs: deduped,
        mixed_scenario,
        corroborating_assets: corroborating,
        creative_direction: String::new(),
        direction_source: DirectionSource::ProfileDefault,
    }
}

fn is_mixed(kind_counts: &BTreeMap<MediaKind, usize>) -> bool {
    if kind_counts.len() < 2 {
        return false;
    }
    let mut counts: Vec<usize> = kind_counts.values().copied().collect();
    counts.sort_unstable_by(|a, b| b.cmp(a));
    counts[0] == counts[1]
}

fn join_kinds(kind_counts: &BTreeMap<MediaKind, usize>) -> String {
    kind_counts
        .keys()
        .map(|k| k.as_str())
        .collect::<Vec<_>>()
        .join("/")
}

fn append_sentence(text: &mut String, sentence: &str) {
    if !text.is_empty() {
        if !text.ends_with('.') {
            text.push('.');
        }
        text.push(' ');
    }
    text.push_str(sentence);
    text.push('.');
}

/// Prompt asking for a short free-text creative direction
pub fn build_direction_prompt(
    query: &QueryAnalysis,
    intent: &UnifiedIntent,
    assets: &AssetStageResult,
) -> String {
    let mut prompt = format!(
        "{}\n\nProject request: \"{}\"\nOutput: {}\n",
        DIRECTION_PROMPT_MARKER, query.normalized_query, intent.output_type
    );
    let m = &query.modifiers;
    for (label, values) in [
        ("Style", m.styles()),
        ("Mood", m.moods()),
        ("Theme", m.themes()),
        ("Colors", m.colors()),
    ] {
        if !values.is_empty() {
            prompt.push_str(&format!("{}: {}\n", label, values.join(", ")));
        }
    }

    let described: Vec<String> = assets
        .usable()
        .filter(|a| !a.content.description.is_empty())
        .map(|a| format!("- {} ({}): {}", a.asset_id, a.kind, a.content.description))
        .collect();
    if !described.is_empty() {
        prompt.push_str("\nAvailable material:\n");
        prompt.push_str(&described.join("\n"));
        prompt.push('\n');
    }

    prompt.push_str(
        "\nWrite a creative direction for this project in two to four sentences of plain \
         prose. Describe the look, the feel and how the material should be used. Do not \
         return JSON or lists.",
    );
    prompt
}

/// Clean up a provider's direction text; `Err` when nothing usable remains
pub fn parse_direction(text: &str) -> Result<String, String> {
    let cleaned = text
        .trim()
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim()
        .trim_matches('"')
        .trim();
    if cleaned.is_empty() {
        return Err("empty creative direction".to_string());
    }
    if cleaned.starts_with('{') {
        return Err("expected prose, got JSON".to_string());
    }
    Ok(cleaned.to_string())
}

/// Direction filled from the query modifiers when no provider text is available
pub fn template_direction(query: &QueryAnalysis, intent: &UnifiedIntent) -> String {
    let profile = profile_for(intent.output_type);
    let m = &query.modifiers;
    let style = m
        .styles()
        .first()
        .map(String::as_str)
        .unwrap_or(profile.default_style);
    let mut direction = format!("A {} {} piece", style, intent.output_type);
    if let Some(subject) = m.subject.as_ref().and_then(|s| s.first()) {
        direction.push_str(&format!(" centered on {}", subject));
    }
    if let Some(mood) = m.moods().first() {
        direction.push_str(&format!(", {} in tone", mood));
    }
    direction.push_str(". ");
    direction.push_str(profile.default_direction);
    direction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;
    use chrono::{TimeZone, Utc};

    fn query(output_type: OutputType, confidence: f64) -> QueryAnalysis {
        QueryAnalysis {
            original_query: "q".to_string(),
            normalized_query: "Q.".to_string(),
            intent: Intent {
                output_type,
                confidence,
                reasoning: "stated".to_string(),
                secondary_outputs: vec![],
            },
            modifiers: Modifiers::default(),
            constraints: QueryConstraints::default(),
            gaps: QueryGaps::default(),
            creative_reframing: None,
            metadata: QueryMetadata {
                timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
                processing_time_ms: 1,
                provider: "p".to_string(),
                normalization_applied: false,
                grammar_corrected: false,
                ui_override_applied: false,
            },
        }
    }

    fn stage(kinds: &[MediaKind]) -> AssetStageResult {
        let analyses = kinds
            .iter()
            .enumerate()
            .map(|(i, kind)| {
                let asset = MediaAsset::new(format!("a{}", i), *kind, format!("/m/{}", i));
                let mut a = AssetAnalysis::failed(&asset, "x", 0);
                a.outcome = ProcessingOutcome::Success;
                a.error = None;
                a
            })
            .collect();
        AssetStageResult {
            analyses,
            success: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_corroboration_boosts_confidence() {
        let intent = unify_intent(
            &query(OutputType::Video, 0.7),
            &stage(&[MediaKind::Video, MediaKind::Image, MediaKind::Image]),
            &ScoringConfig::default(),
        );
        assert_eq!(intent.output_type, OutputType::Video);
        assert!((intent.confidence - 0.8).abs() < 1e-9);
        assert_eq!(intent.corroborating_assets, vec!["a0"]);
        assert!(!intent.mixed_scenario);
    }

    #[test]
    fn test_tied_kinds_switch_unsure_intent_to_mixed() {
        let intent = unify_intent(
            &query(OutputType::Audio, 0.3),
            &stage(&[MediaKind::Video, MediaKind::Image, MediaKind::Text]),
            &ScoringConfig::default(),
        );
        assert!(intent.mixed_scenario);
        assert_eq!(intent.output_type, OutputType::Mixed);
        assert!(intent.secondary_outputs.contains(&OutputType::Audio));
        assert!(intent.secondary_outputs.contains(&OutputType::Video));
    }

    #[test]
    fn test_confident_intent_survives_mixed_assets() {
        let intent = unify_intent(
            &query(OutputType::Video, 0.8),
            &stage(&[MediaKind::Video, MediaKind::Image]),
            &ScoringConfig::default(),
        );
        assert!(intent.mixed_scenario);
        assert_eq!(intent.output_type, OutputType::Video);
        assert_eq!(intent.secondary_outputs, vec![OutputType::Image]);
    }

    #[test]
    fn test_asset_free_keeps_query_intent() {
        let intent = unify_intent(
            &query(OutputType::Image, 0.65),
            &AssetStageResult::default(),
            &ScoringConfig::default(),
        );
        assert_eq!(intent.output_type, OutputType::Image);
        assert_eq!(intent.confidence, 0.65);
        assert!(intent.corroborating_assets.is_empty());
    }

    #[test]
    fn test_parse_direction() {
        assert_eq!(
            parse_direction("  \"Warm and bold.\" ").unwrap(),
            "Warm and bold."
        );
        assert!(parse_direction("   ").is_err());
        assert!(parse_direction("{\"direction\": 1}").is_err());
    }

    #[test]
    fn test_template_direction_uses_modifiers() {
        let mut q = query(OutputType::Video, 0.9);
        q.modifiers.style = Some(vec!["retro".to_string()]);
        q.modifiers.mood = Some(vec!["energetic".to_string()]);
        let intent = unify_intent(&q, &AssetStageResult::default(), &ScoringConfig::default());
        let direction = template_direction(&q, &intent);
        assert!(direction.starts_with("A retro video piece, energetic in tone."));
    }
}
