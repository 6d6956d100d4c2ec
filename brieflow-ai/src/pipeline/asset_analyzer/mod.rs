// Stage 2: Asset Analyzer
//
// Concept: Independent per-asset understanding, fanned out concurrently
// Synchronization: Input is the caller's MediaAsset list plus the normalized
// query text; output (AssetStageResult) feeds the synthesizer
//
// Algorithm:
// 1. Validate descriptors (non-empty id/locator, unique ids); zero assets is
//    asset-free mode and trivially succeeds
// 2. Spawn one task per asset; each task routes to its kind's analyzer, builds
//    a kind-specific prompt and runs it through the provider chain
// 3. Each task writes only its own result; failures are recorded per asset
// 4. Join every task under the caller-level stage timeout (timeout is fatal)
// 5. Aggregate counts, mean quality (failures excluded) and partition hints
// 6. Validate the stage result

pub mod audio;
pub mod image;
pub mod text;
pub mod video;

use brieflow_common::time::SharedClock;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::StageError;
use crate::config::AssetStageConfig;
use crate::provider::{CallPolicy, GenerateOptions, ModelPreference, ProviderChain};
use crate::types::{
    AssetAnalysis, AssetMetadata, AssetRole, AssetStageResult, AssetSummary, ContentSummary,
    EnhancementNeeds, MediaAsset, MediaKind, ProcessingNeeds, ProcessingOutcome, QueryAlignment,
};
use crate::validation::{parse_aspect_ratio, parse_payload, FieldChecker, PayloadError, Schema};

/// Prompt marker identifying asset-analysis prompts
pub const ASSET_PROMPT_MARKER: &str = "### brieflow:asset_analysis";

/// Quality assumed when a provider gives none
const NEUTRAL_QUALITY: f64 = 5.0;

/// Alignment assumed when a provider gives none
const NEUTRAL_ALIGNMENT: f64 = 0.5;

/// Longest raw-text description kept for partial results
const MAX_UNSTRUCTURED_DESCRIPTION: usize = 600;

/// Per-run asset analysis options
#[derive(Debug, Clone)]
pub struct AssetOptions {
    pub model_preference: ModelPreference,
    pub provider_timeout: Duration,
    pub stage_timeout: Duration,
    pub primary_quality_threshold: f64,
    pub min_description_len: usize,
}

impl AssetOptions {
    pub fn from_config(config: &AssetStageConfig) -> Self {
        Self {
            model_preference: config.model_preference.clone(),
            provider_timeout: Duration::from_secs(config.provider_timeout_secs.max(1)),
            stage_timeout: Duration::from_secs(config.stage_timeout_secs.max(1)),
            primary_quality_threshold: config.primary_quality_threshold,
            min_description_len: config.min_description_len,
        }
    }
}

impl Default for AssetOptions {
    fn default() -> Self {
        Self::from_config(&AssetStageConfig::default())
    }
}

/// Kind-specific analysis behaviour
pub trait MediaAnalyzer: Send + Sync {
    fn kind(&self) -> MediaKind;

    /// Kind-specific instructions appended to the shared prompt
    fn prompt_focus(&self) -> &'static str;

    /// Container/encoding format implied by a file extension
    fn infer_format(&self, extension: &str) -> Option<&'static str>;

    /// Role hint used when the provider suggests none
    fn default_role(&self) -> AssetRole;

    /// Tools recommended for every asset of this kind
    fn base_tools(&self) -> &'static [&'static str];

    /// Kind-specific enhancement heuristics on top of the provider's flags
    fn refine_enhancements(&self, metadata: &AssetMetadata, needs: &mut EnhancementNeeds);
}

/// Analyzer for a declared kind
pub fn analyzer_for(kind: MediaKind) -> &'static dyn MediaAnalyzer {
    match kind {
        MediaKind::Image => &image::ImageAnalyzer,
        MediaKind::Video => &video::VideoAnalyzer,
        MediaKind::Audio => &audio::AudioAnalyzer,
        MediaKind::Text => &text::TextAnalyzer,
    }
}

/// Provider-produced portion of an AssetAnalysis
#[derive(Debug, Default, Deserialize)]
struct AssetPayload {
    #[serde(default)]
    metadata: MetadataPayload,
    #[serde(default)]
    content: ContentPayload,
    #[serde(default)]
    alignment: AlignmentPayload,
    #[serde(default)]
    processing: ProcessingNeeds,
}

#[derive(Debug, Default, Deserialize)]
struct MetadataPayload {
    size_bytes: Option<u64>,
    width: Option<u32>,
    height: Option<u32>,
    duration_seconds: Option<f64>,
    format: Option<String>,
    aspect_ratio: Option<String>,
    quality_score: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ContentPayload {
    #[serde(default)]
    description: String,
    #[serde(default)]
    detected_elements: Vec<String>,
    style: Option<String>,
    mood: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AlignmentPayload {
    score: Option<f64>,
    role: Option<AssetRole>,
    #[serde(default)]
    contributions: Vec<String>,
}

impl AssetPayload {
    fn check(&self) -> Result<(), String> {
        let mut c = FieldChecker::new();
        c.scoped("metadata", |c| {
            if let Some(q) = self.metadata.quality_score {
                c.bounded("quality_score", q, 0.0, 10.0);
            }
            if let Some(d) = self.metadata.duration_seconds {
                c.ensure("duration_seconds", d.is_finite() && d >= 0.0, "must be non-negative");
            }
        });
        c.scoped("alignment", |c| {
            if let Some(score) = self.alignment.score {
                c.probability("score", score);
            }
        });
        c.finish("AssetPayload").map_err(|v| v.to_string())
    }
}

/// Parsed provider reply for one asset
#[derive(Debug)]
enum AssetReply {
    Structured(AssetPayload),
    /// Provider answered without a JSON object
    Unstructured(String),
}

fn parse_asset_reply(text: &str) -> Result<AssetReply, String> {
    match parse_payload::<AssetPayload>(text, "AssetPayload") {
        Ok(payload) => {
            payload.check()?;
            Ok(AssetReply::Structured(payload))
        }
        Err(PayloadError::NoJsonObject) => Ok(AssetReply::Unstructured(text.trim().to_string())),
        Err(e) => Err(e.to_string()),
    }
}

/// Everything one asset task needs, owned so the task can be spawned
struct AssetTask {
    asset: MediaAsset,
    query: String,
    chain: ProviderChain,
    policy: CallPolicy,
    clock: SharedClock,
}

/// Build the kind-specific analysis prompt
pub fn build_asset_prompt(analyzer: &dyn MediaAnalyzer, asset: &MediaAsset, query: &str) -> String {
    let mut prompt = format!(
        "{} kind={}\nasset_id: {}\nlocator: {}\n",
        ASSET_PROMPT_MARKER,
        analyzer.kind(),
        asset.id,
        asset.locator
    );
    if let Some(description) = &asset.description {
        prompt.push_str(&format!("user_description: {}\n", description));
    }
    prompt.push_str(&format!(
        "\nProject request: \"{}\"\n\n{}\n\n",
        query,
        analyzer.prompt_focus()
    ));
    prompt.push_str(
        "Return exactly one JSON object:\n\
         {\"metadata\": {\"width\": n, \"height\": n, \"duration_seconds\": n, \"format\": \"...\", \
         \"aspect_ratio\": \"W:H\", \"quality_score\": 0-10},\n\
         \x20\"content\": {\"description\": \"...\", \"detected_elements\": [], \"style\": \"...\", \"mood\": \"...\"},\n\
         \x20\"alignment\": {\"score\": 0.0-1.0, \"role\": \"primary|reference|supporting|unused\", \"contributions\": []},\n\
         \x20\"processing\": {\"enhancements\": {\"upscale\": bool, \"denoise\": bool, \"color_correction\": bool, \
         \"stabilization\": bool, \"audio_cleanup\": bool, \"transcription\": bool}, \"recommended_tools\": []}}\n\
         Omit metadata you cannot determine.\n",
    );
    prompt
}

async fn run_asset_task(task: AssetTask) -> AssetAnalysis {
    let analyzer = analyzer_for(task.asset.kind);
    let start = task.clock.now();
    let prompt = build_asset_prompt(analyzer, &task.asset, &task.query);

    let result = task
        .chain
        .execute_parsed(&prompt, &GenerateOptions::structured(), &task.policy, parse_asset_reply)
        .await;

    let elapsed = task.clock.elapsed_ms(start);
    match result {
        Ok(success) => {
            let analysis = build_analysis(analyzer, &task.asset, success.value, &success.provider_id, elapsed);
            match analysis.validate() {
                Ok(()) => analysis,
                Err(violation) => AssetAnalysis::failed(&task.asset, violation.to_string(), elapsed),
            }
        }
        Err(e) => {
            warn!(asset_id = %task.asset.id, error = %e, "Asset analysis failed");
            AssetAnalysis::failed(&task.asset, e.to_string(), elapsed)
        }
    }
}

fn build_analysis(
    analyzer: &dyn MediaAnalyzer,
    asset: &MediaAsset,
    reply: AssetReply,
    provider_id: &str,
    elapsed_ms: u64,
) -> AssetAnalysis {
    let inferred_format = asset
        .extension()
        .and_then(|ext| analyzer.infer_format(&ext))
        .map(str::to_string);

    let (metadata, content, alignment, mut processing, outcome) = match reply {
        AssetReply::Structured(payload) => {
            let m = payload.metadata;
            let aspect_ratio = m
                .aspect_ratio
                .filter(|r| parse_aspect_ratio(r).is_some())
                .or_else(|| Some(ratio_from_dimensions(m.width?, m.height?)));
            let metadata = AssetMetadata {
                size_bytes: m.size_bytes,
                width: m.width,
                height: m.height,
                duration_seconds: m.duration_seconds,
                format: m.format.or(inferred_format),
                aspect_ratio,
                quality_score: m.quality_score.unwrap_or(NEUTRAL_QUALITY),
            };

            let provider_described = !payload.content.description.trim().is_empty();
            let description = if provider_described {
                payload.content.description.trim().to_string()
            } else {
                asset.description.clone().unwrap_or_default()
            };
            let content = ContentSummary {
                description,
                detected_elements: payload.content.detected_elements,
                style: payload.content.style.filter(|s| !s.trim().is_empty()),
                mood: payload.content.mood.filter(|s| !s.trim().is_empty()),
            };

            let alignment = QueryAlignment {
                score: payload.alignment.score.unwrap_or(NEUTRAL_ALIGNMENT),
                role: payload.alignment.role.unwrap_or_else(|| analyzer.default_role()),
                contributions: payload.alignment.contributions,
            };

            let outcome = if provider_described {
                ProcessingOutcome::Success
            } else {
                ProcessingOutcome::Partial
            };
            (metadata, content, alignment, payload.processing, outcome)
        }
        AssetReply::Unstructured(text) => {
            let metadata = AssetMetadata {
                format: inferred_format,
                quality_score: NEUTRAL_QUALITY,
                ..Default::default()
            };
            let content = ContentSummary {
                description: truncate_chars(&text, MAX_UNSTRUCTURED_DESCRIPTION),
                ..Default::default()
            };
            let alignment = QueryAlignment {
                score: NEUTRAL_ALIGNMENT,
                role: AssetRole::Supporting,
                contributions: Vec::new(),
            };
            (
                metadata,
                content,
                alignment,
                ProcessingNeeds::default(),
                ProcessingOutcome::Partial,
            )
        }
    };

    analyzer.refine_enhancements(&metadata, &mut processing.enhancements);
    let mut tools: Vec<String> = analyzer.base_tools().iter().map(|t| t.to_string()).collect();
    for tool in processing.recommended_tools.drain(..) {
        if !tools.contains(&tool) {
            tools.push(tool);
        }
    }
    processing.recommended_tools = tools;

    debug!(
        asset_id = %asset.id,
        kind = %asset.kind,
        provider = %provider_id,
        outcome = outcome.as_str(),
        quality = metadata.quality_score,
        "Asset analyzed"
    );

    AssetAnalysis {
        asset_id: asset.id.clone(),
        kind: asset.kind,
        locator: asset.locator.clone(),
        metadata,
        content,
        alignment,
        processing,
        outcome,
        error: None,
        provider: Some(provider_id.to_string()),
        processing_time_ms: elapsed_ms,
    }
}

/// Reduce pixel dimensions to a `W:H` ratio
pub fn ratio_from_dimensions(width: u32, height: u32) -> String {
    fn gcd(a: u32, b: u32) -> u32 {
        if b == 0 {
            a
        } else {
            gcd(b, a % b)
        }
    }
    if width == 0 || height == 0 {
        return "1:1".to_string();
    }
    let d = gcd(width, height);
    let (w, h) = (width / d, height / d);
    // 1366x768 style near-16:9 panels
    match (w, h) {
        (683, 384) => "16:9".to_string(),
        _ => format!("{}:{}", w, h),
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Reject malformed or duplicate asset descriptors
pub fn validate_assets(assets: &[MediaAsset]) -> Result<(), StageError> {
    let mut seen = HashSet::new();
    for (i, asset) in assets.iter().enumerate() {
        if asset.id.trim().is_empty() {
            return Err(StageError::InputValidation(format!("assets[{}]: id must not be empty", i)));
        }
        if asset.locator.trim().is_empty() {
            return Err(StageError::InputValidation(format!(
                "assets[{}] ({}): locator must not be empty",
                i, asset.id
            )));
        }
        if !seen.insert(asset.id.as_str()) {
            return Err(StageError::InputValidation(format!(
                "assets[{}]: duplicate asset id '{}'",
                i, asset.id
            )));
        }
    }
    Ok(())
}

/// Asset analyzer (stage 2)
pub struct AssetAnalyzer {
    chain: ProviderChain,
    clock: SharedClock,
}

impl AssetAnalyzer {
    pub fn new(chain: ProviderChain, clock: SharedClock) -> Self {
        Self { chain, clock }
    }

    /// Analyze every asset concurrently
    ///
    /// # Arguments
    /// * `assets` - Caller-supplied descriptors (may be empty)
    /// * `query` - Normalized query text embedded in every prompt
    /// * `options` - Preference, per-call and stage timeouts, partition thresholds
    ///
    /// # Returns
    /// One analysis per input asset in input order, plus the aggregate.
    /// Individual failures are recorded, never raised.
    pub async fn analyze_all(
        &self,
        assets: &[MediaAsset],
        query: &str,
        options: &AssetOptions,
    ) -> Result<AssetStageResult, StageError> {
        validate_assets(assets)?;
        self.chain.check_preference(&options.model_preference)?;

        let start = self.clock.now();

        if assets.is_empty() {
            info!("No assets supplied, asset-free mode");
            return Ok(AssetStageResult {
                success: true,
                ..Default::default()
            });
        }

        let policy = CallPolicy::new(options.model_preference.clone(), options.provider_timeout);

        let handles: Vec<_> = assets
            .iter()
            .map(|asset| {
                let task = AssetTask {
                    asset: asset.clone(),
                    query: query.to_string(),
                    chain: self.chain.clone(),
                    policy: policy.clone(),
                    clock: self.clock.clone(),
                };
                tokio::spawn(run_asset_task(task))
            })
            .collect();
        let abort_handles: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();

        let joined = match tokio::time::timeout(options.stage_timeout, join_all(handles)).await {
            Ok(joined) => joined,
            Err(_) => {
                for handle in abort_handles {
                    handle.abort();
                }
                return Err(StageError::Timeout(options.stage_timeout));
            }
        };

        let analyses: Vec<AssetAnalysis> = joined
            .into_iter()
            .zip(assets)
            .map(|(joined, asset)| match joined {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!(asset_id = %asset.id, error = %e, "Asset task did not complete");
                    AssetAnalysis::failed(asset, format!("analysis task aborted: {}", e), 0)
                }
            })
            .collect();

        let summary = summarize(&analyses, options, self.clock.elapsed_ms(start));
        let mut provider_usage: BTreeMap<String, usize> = BTreeMap::new();
        for analysis in analyses.iter().filter(|a| a.is_usable()) {
            if let Some(provider) = &analysis.provider {
                *provider_usage.entry(provider.clone()).or_default() += 1;
            }
        }

        let result = AssetStageResult {
            success: summary.successes > 0,
            analyses,
            summary,
            provider_usage,
        };
        result.validate()?;

        info!(
            total = result.summary.total_assets,
            successes = result.summary.successes,
            partials = result.summary.partials,
            failures = result.summary.failures,
            overall_quality = result.summary.overall_quality_score,
            "Asset analysis complete"
        );

        Ok(result)
    }
}

/// Aggregate per-asset results
pub fn summarize(analyses: &[AssetAnalysis], options: &AssetOptions, elapsed_ms: u64) -> AssetSummary {
    let mut by_kind: BTreeMap<MediaKind, usize> = BTreeMap::new();
    for analysis in analyses {
        *by_kind.entry(analysis.kind).or_default() += 1;
    }

    let usable: Vec<&AssetAnalysis> = analyses.iter().filter(|a| a.is_usable()).collect();
    let partials = usable
        .iter()
        .filter(|a| a.outcome == ProcessingOutcome::Partial)
        .count();

    let overall_quality_score = if usable.is_empty() {
        0.0
    } else {
        usable.iter().map(|a| a.metadata.quality_score).sum::<f64>() / usable.len() as f64
    };

    let (primary, reference): (Vec<&AssetAnalysis>, Vec<&AssetAnalysis>) =
        usable.iter().copied().partition(|a| {
            a.metadata.quality_score >= options.primary_quality_threshold
                && a.content.description.chars().count() >= options.min_description_len
        });

    AssetSummary {
        total_assets: analyses.len(),
        by_kind,
        successes: usable.len(),
        partials,
        failures: analyses.len() - usable.len(),
        overall_quality_score,
        primary_candidates: primary.iter().map(|a| a.asset_id.clone()).collect(),
        reference_candidates: reference.iter().map(|a| a.asset_id.clone()).collect(),
        processing_time_ms: elapsed_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ReasoningProvider, ScriptedProvider, ScriptedReply};
    use brieflow_common::time::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn analyzer_with(provider: ScriptedProvider) -> AssetAnalyzer {
        let chain = ProviderChain::new(vec![Arc::new(provider) as Arc<dyn ReasoningProvider>]);
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()));
        AssetAnalyzer::new(chain, clock)
    }

    const GOOD_VIDEO: &str = r#"{"metadata": {"width": 1920, "height": 1080, "duration_seconds": 42, "quality_score": 8},
        "content": {"description": "Drone footage of a coastline at sunset", "style": "cinematic"},
        "alignment": {"score": 0.9, "role": "primary"}}"#;

    #[tokio::test]
    async fn test_empty_asset_list_is_asset_free_mode() {
        let analyzer = analyzer_with(ScriptedProvider::new("p"));
        let result = analyzer
            .analyze_all(&[], "Make a poster.", &AssetOptions::default())
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.analyses.is_empty());
        assert_eq!(result.summary.total_assets, 0);
        assert_eq!(result.summary.overall_quality_score, 0.0);
    }

    #[tokio::test]
    async fn test_failures_recorded_per_asset() {
        let provider = ScriptedProvider::new("p")
            .with_rule("asset_id: broken", ScriptedReply::fail("provider down"))
            .with_default(ScriptedReply::text(GOOD_VIDEO));
        let analyzer = analyzer_with(provider);
        let assets = vec![
            MediaAsset::new("v1", MediaKind::Video, "/media/coast.mp4"),
            MediaAsset::new("broken", MediaKind::Image, "/media/x.png"),
            MediaAsset::new("v2", MediaKind::Video, "/media/city.mov"),
        ];

        let result = analyzer
            .analyze_all(&assets, "Make a reel.", &AssetOptions::default())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.summary.successes, 2);
        assert_eq!(result.summary.failures, 1);
        let ids: Vec<&str> = result.analyses.iter().map(|a| a.asset_id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "broken", "v2"]);
        assert_eq!(result.analyses[1].outcome, ProcessingOutcome::Failed);
        assert_eq!(result.summary.overall_quality_score, 8.0);
        assert_eq!(result.summary.primary_candidates, vec!["v1", "v2"]);
        assert_eq!(result.provider_usage.get("p"), Some(&2));
        assert_eq!(result.summary.by_kind.get(&MediaKind::Video), Some(&2));
    }

    #[tokio::test]
    async fn test_structured_reply_fills_metadata() {
        let analyzer = analyzer_with(ScriptedProvider::new("p").with_default(ScriptedReply::text(GOOD_VIDEO)));
        let assets = vec![MediaAsset::new("v1", MediaKind::Video, "/media/coast.MOV")];
        let result = analyzer
            .analyze_all(&assets, "q", &AssetOptions::default())
            .await
            .unwrap();
        let a = &result.analyses[0];
        assert_eq!(a.outcome, ProcessingOutcome::Success);
        assert_eq!(a.metadata.aspect_ratio.as_deref(), Some("16:9"));
        assert_eq!(a.metadata.format.as_deref(), Some("mov"));
        assert_eq!(a.alignment.role, AssetRole::Primary);
        assert!(a.processing.recommended_tools.contains(&"video_editor".to_string()));
        assert_eq!(a.provider.as_deref(), Some("p"));
    }

    #[tokio::test]
    async fn test_unstructured_reply_is_partial() {
        let analyzer = analyzer_with(
            ScriptedProvider::new("p").with_default(ScriptedReply::text("A blurry photo of a dog.")),
        );
        let assets = vec![MediaAsset::new("i1", MediaKind::Image, "/media/dog.jpg")];
        let result = analyzer
            .analyze_all(&assets, "q", &AssetOptions::default())
            .await
            .unwrap();
        let a = &result.analyses[0];
        assert_eq!(a.outcome, ProcessingOutcome::Partial);
        assert_eq!(a.content.description, "A blurry photo of a dog.");
        assert_eq!(a.metadata.format.as_deref(), Some("jpeg"));
        assert_eq!(a.metadata.quality_score, NEUTRAL_QUALITY);
        assert_eq!(result.summary.partials, 1);
        assert_eq!(result.summary.successes, 1);
        assert!(result.summary.primary_candidates.is_empty());
        assert_eq!(result.summary.reference_candidates, vec!["i1"]);
    }

    #[tokio::test]
    async fn test_all_failed_is_not_stage_fatal() {
        let analyzer = analyzer_with(ScriptedProvider::new("p").with_default(ScriptedReply::fail("down")));
        let assets = vec![MediaAsset::new("a", MediaKind::Audio, "/a.wav")];
        let result = analyzer
            .analyze_all(&assets, "q", &AssetOptions::default())
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.summary.failures, 1);
        assert!(result.analyses[0].error.as_deref().unwrap().contains("all providers failed"));
    }

    #[tokio::test]
    async fn test_stage_timeout_is_fatal() {
        let analyzer = analyzer_with(
            ScriptedProvider::new("p")
                .with_default(ScriptedReply::text(GOOD_VIDEO))
                .with_delay(Duration::from_secs(5)),
        );
        let options = AssetOptions {
            stage_timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let assets = vec![MediaAsset::new("v", MediaKind::Video, "/v.mp4")];
        let err = analyzer.analyze_all(&assets, "q", &options).await.unwrap_err();
        assert!(matches!(err, StageError::Timeout(_)));
    }

    #[test]
    fn test_validate_assets() {
        let dup = vec![
            MediaAsset::new("a", MediaKind::Image, "/1.png"),
            MediaAsset::new("a", MediaKind::Image, "/2.png"),
        ];
        assert!(matches!(validate_assets(&dup), Err(StageError::InputValidation(_))));

        let empty_locator = vec![MediaAsset::new("a", MediaKind::Image, " ")];
        assert!(validate_assets(&empty_locator).is_err());
        assert!(validate_assets(&[]).is_ok());
    }

    #[test]
    fn test_ratio_from_dimensions() {
        assert_eq!(ratio_from_dimensions(1920, 1080), "16:9");
        assert_eq!(ratio_from_dimensions(1080, 1920), "9:16");
        assert_eq!(ratio_from_dimensions(1080, 1080), "1:1");
        assert_eq!(ratio_from_dimensions(1366, 768), "16:9");
    }

    #[test]
    fn test_prompt_embeds_query_and_locator() {
        let asset = MediaAsset::new("hero", MediaKind::Image, "https://cdn/x.png").with_description("logo");
        let prompt = build_asset_prompt(analyzer_for(MediaKind::Image), &asset, "Make a poster.");
        assert!(prompt.starts_with("### brieflow:asset_analysis kind=image"));
        assert!(prompt.contains("asset_id: hero"));
        assert!(prompt.contains("locator: https://cdn/x.png"));
        assert!(prompt.contains("user_description: logo"));
        assert!(prompt.contains("Make a poster."));
    }
}
