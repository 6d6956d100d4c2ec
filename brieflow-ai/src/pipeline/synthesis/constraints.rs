// Constraint Unification
//
// Concept: Merge query-stated constraints with what the assets can deliver
//
// Precedence per technical field, first available wins:
// 1. Query (stated by the user)
// 2. Assets (dominant aspect ratio, highest resolution among visual assets)
// 3. Platform (first recognized target platform's defaults)
// 4. Profile (output-type defaults)
//
// Duration is never inferred from assets; aspect ratio is omitted for audio
// output unless the query states one.

use super::model::{
    ConstraintSource, CreativeConstraints, PlatformConstraints, ProductionConstraints, Sourced,
    TechnicalConstraints, UnifiedConstraints, UnifiedIntent,
};
use super::profiles::{platform_for, profile_for, PlatformProfile};
use crate::types::{AssetStageResult, MediaKind, OutputType, QueryAnalysis};
use crate::validation::same_aspect_ratio;

/// Unified constraints plus warnings about inputs that were ignored
pub fn unify_constraints(
    query: &QueryAnalysis,
    intent: &UnifiedIntent,
    assets: &AssetStageResult,
) -> (UnifiedConstraints, Vec<String>) {
    let mut warnings = Vec::new();

    let mut platform = PlatformConstraints::default();
    let mut known: Vec<&'static PlatformProfile> = Vec::new();
    for name in query.constraints.platforms.iter().flatten() {
        match platform_for(name) {
            Some(p) => {
                if !known.iter().any(|k| k.name == p.name) {
                    known.push(p);
                    platform.targets.push(p.name.to_string());
                }
            }
            None => {
                warnings.push(format!("Unrecognized platform '{}' ignored for defaults", name));
                platform.unrecognized.push(name.clone());
            }
        }
    }
    platform.max_duration_seconds = known
        .iter()
        .filter_map(|p| p.max_duration_seconds)
        .reduce(f64::min);

    let technical = unify_technical(query, intent.output_type, assets, known.first().copied());

    let constraints = UnifiedConstraints {
        technical,
        platform,
        creative: unify_creative(query, assets),
        production: unify_production(intent.output_type, assets),
    };
    (constraints, warnings)
}

fn unify_technical(
    query: &QueryAnalysis,
    output_type: OutputType,
    assets: &AssetStageResult,
    platform: Option<&'static PlatformProfile>,
) -> TechnicalConstraints {
    let profile = profile_for(output_type);
    let stated = &query.constraints;
    let visual = output_type != OutputType::Audio;

    let duration_seconds = match stated.duration_seconds.as_ref().and_then(|d| d.primary()) {
        Some(d) => Some(Sourced::new(*d, ConstraintSource::Query)),
        None if output_type.is_sequential() || output_type == OutputType::Mixed => platform
            .and_then(|p| p.recommended_duration_seconds)
            .map(|d| Sourced::new(d, ConstraintSource::Platform))
            .or_else(|| {
                profile
                    .duration_seconds
                    .map(|d| Sourced::new(d, ConstraintSource::Profile))
            }),
        None => None,
    };

    let aspect_ratio = match stated.aspect_ratio.as_ref().and_then(|r| r.primary()) {
        Some(r) => Some(Sourced::new(r.trim().to_string(), ConstraintSource::Query)),
        None if visual => dominant_asset_aspect_ratio(assets)
            .map(|r| Sourced::new(r, ConstraintSource::Assets))
            .or_else(|| platform.map(|p| Sourced::new(p.aspect_ratio.to_string(), ConstraintSource::Platform)))
            .or_else(|| {
                profile
                    .aspect_ratio
                    .map(|r| Sourced::new(r.to_string(), ConstraintSource::Profile))
            }),
        None => None,
    };

    let resolution = match stated.resolution.as_ref().and_then(|r| r.primary()) {
        Some(r) => Sourced::new(r.trim().to_string(), ConstraintSource::Query),
        None if visual => highest_asset_resolution(assets)
            .map(|r| Sourced::new(r, ConstraintSource::Assets))
            .or_else(|| platform.map(|p| Sourced::new(p.resolution.to_string(), ConstraintSource::Platform)))
            .unwrap_or_else(|| Sourced::new(profile.resolution.to_string(), ConstraintSource::Profile)),
        None => Sourced::new(profile.resolution.to_string(), ConstraintSource::Profile),
    };

    let format = match stated.format.as_ref().and_then(|f| f.primary()) {
        Some(f) => Sourced::new(f.trim().to_ascii_lowercase(), ConstraintSource::Query),
        None => match platform {
            Some(p) if output_type == OutputType::Video || output_type == OutputType::Mixed => {
                Sourced::new(p.format.to_string(), ConstraintSource::Platform)
            }
            _ => Sourced::new(profile.format.to_string(), ConstraintSource::Profile),
        },
    };

    let image_count = match stated.image_count.as_ref().and_then(|c| c.primary()) {
        Some(c) => Some(Sourced::new(*c, ConstraintSource::Query)),
        None => profile
            .image_count
            .filter(|_| matches!(output_type, OutputType::Image | OutputType::Mixed))
            .map(|c| Sourced::new(c, ConstraintSource::Profile)),
    };

    TechnicalConstraints {
        duration_seconds,
        aspect_ratio,
        resolution,
        format,
        image_count,
    }
}

/// Most common aspect ratio among usable visual assets (first seen wins ties)
pub fn dominant_asset_aspect_ratio(assets: &AssetStageResult) -> Option<String> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for ratio in assets
        .usable()
        .filter(|a| matches!(a.kind, MediaKind::Image | MediaKind::Video))
        .filter_map(|a| a.metadata.aspect_ratio.as_deref())
    {
        match counts.iter_mut().find(|(r, _)| same_aspect_ratio(r, ratio)) {
            Some((_, n)) => *n += 1,
            None => counts.push((ratio, 1)),
        }
    }
    let mut best: Option<(&str, usize)> = None;
    for (ratio, n) in counts {
        if best.map_or(true, |(_, b)| n > b) {
            best = Some((ratio, n));
        }
    }
    best.map(|(r, _)| r.to_string())
}

fn highest_asset_resolution(assets: &AssetStageResult) -> Option<String> {
    assets
        .usable()
        .filter(|a| matches!(a.kind, MediaKind::Image | MediaKind::Video))
        .filter_map(|a| Some((a.metadata.pixels()?, a.metadata.width?, a.metadata.height?)))
        .fold(None, |best: Option<(u64, u32, u32)>, cur| match best {
            Some(b) if b.0 >= cur.0 => Some(b),
            _ => Some(cur),
        })
        .map(|(_, w, h)| format!("{}x{}", w, h))
}

fn unify_creative(query: &QueryAnalysis, assets: &AssetStageResult) -> CreativeConstraints {
    let m = &query.modifiers;
    let mut styles = Vec::new();
    let mut moods = Vec::new();
    push_unique(&mut styles, m.styles().iter().map(String::as_str));
    push_unique(&mut styles, assets.usable().filter_map(|a| a.content.style.as_deref()));
    push_unique(&mut moods, m.moods().iter().map(String::as_str));
    push_unique(&mut moods, assets.usable().filter_map(|a| a.content.mood.as_deref()));

    CreativeConstraints {
        styles,
        moods,
        themes: m.themes().to_vec(),
        color_palette: m.colors().to_vec(),
    }
}

fn unify_production(output_type: OutputType, assets: &AssetStageResult) -> ProductionConstraints {
    let mut available_kinds: Vec<MediaKind> = assets.usable().map(|a| a.kind).collect();
    available_kinds.sort();
    available_kinds.dedup();

    let enhancement_assets = assets
        .usable()
        .filter(|a| a.processing.enhancements.any())
        .map(|a| a.asset_id.clone())
        .collect();

    let requires_generation = !assets.usable().any(|a| match output_type {
        OutputType::Mixed => a.kind != MediaKind::Text,
        other => a.kind.as_output() == Some(other),
    });

    let mut recommended_tools = Vec::new();
    push_unique(
        &mut recommended_tools,
        assets
            .usable()
            .flat_map(|a| a.processing.recommended_tools.iter().map(String::as_str)),
    );

    ProductionConstraints {
        available_kinds,
        enhancement_assets,
        requires_generation,
        recommended_tools,
    }
}

/// Append values not already present (case-insensitive), keeping first spelling
pub(crate) fn push_unique<'a>(out: &mut Vec<String>, values: impl Iterator<Item = &'a str>) {
    for value in values {
        let value = value.trim();
        if !value.is_empty() && !out.iter().any(|v| v.eq_ignore_ascii_case(value)) {
            out.push(value.to_string());
        }
    }
}
