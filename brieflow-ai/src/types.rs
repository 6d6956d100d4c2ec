// Shared Types and Data Contracts
//
// Contracts between the request intake, the query analyzer (stage 1) and the
// asset analyzer (stage 2). Synthesis and final-document types live next to
// the stages that own them.
//
// Every stage output is produced once and never mutated by a later stage;
// downstream stages derive new values from borrowed inputs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// Media and output kinds
// ============================================================================

/// Declared kind of a caller-supplied asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Text,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Text => "text",
        }
    }

    /// Parse a case-insensitive kind name
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" | "img" | "photo" => Some(Self::Image),
            "video" | "clip" => Some(Self::Video),
            "audio" | "sound" | "music" => Some(Self::Audio),
            "text" | "doc" | "document" => Some(Self::Text),
            _ => None,
        }
    }

    /// Output medium this asset kind can directly stand for (text has none)
    pub fn as_output(self) -> Option<OutputType> {
        match self {
            Self::Image => Some(OutputType::Image),
            Self::Video => Some(OutputType::Video),
            Self::Audio => Some(OutputType::Audio),
            Self::Text => None,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primary output medium the user wants produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputType {
    Image,
    Video,
    Audio,
    Mixed,
}

impl OutputType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Mixed => "mixed",
        }
    }

    /// Time-based media that need a narrative structure
    pub fn is_sequential(self) -> bool {
        matches!(self, Self::Video | Self::Audio)
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Request inputs
// ============================================================================

/// Caller-supplied media asset (read-only to the pipeline)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub id: String,
    /// URL or path of the media
    pub locator: String,
    pub kind: MediaKind,
    /// Optional user-supplied description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl MediaAsset {
    pub fn new(id: impl Into<String>, kind: MediaKind, locator: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            locator: locator.into(),
            kind,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Lower-cased file extension of the locator, ignoring query strings
    pub fn extension(&self) -> Option<String> {
        let path = self
            .locator
            .split(['?', '#'])
            .next()
            .unwrap_or(&self.locator);
        let file = path.rsplit('/').next().unwrap_or(path);
        let (stem, ext) = file.rsplit_once('.')?;
        if stem.is_empty() || ext.is_empty() || ext.len() > 5 {
            return None;
        }
        Some(ext.to_ascii_lowercase())
    }
}

// ============================================================================
// Stage 1 output: QueryAnalysis
// ============================================================================

/// A constraint stated either as one value or as alternative candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintValue<T> {
    Single(T),
    Alternatives(Vec<T>),
}

impl<T> ConstraintValue<T> {
    /// Preferred value: the single value or the first alternative
    pub fn primary(&self) -> Option<&T> {
        match self {
            Self::Single(v) => Some(v),
            Self::Alternatives(vs) => vs.first(),
        }
    }

    pub fn candidates(&self) -> Vec<&T> {
        match self {
            Self::Single(v) => vec![v],
            Self::Alternatives(vs) => vs.iter().collect(),
        }
    }
}

/// Inferred output intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(alias = "type")]
    pub output_type: OutputType,
    /// [0.0, 1.0]
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secondary_outputs: Vec<OutputType>,
}

/// Stylistic/contextual attributes extracted from the query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_palette: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setting: Option<Vec<String>>,
}

impl Modifiers {
    pub fn styles(&self) -> &[String] {
        self.style.as_deref().unwrap_or(&[])
    }

    pub fn moods(&self) -> &[String] {
        self.mood.as_deref().unwrap_or(&[])
    }

    pub fn themes(&self) -> &[String] {
        self.theme.as_deref().unwrap_or(&[])
    }

    pub fn colors(&self) -> &[String] {
        self.color_palette.as_deref().unwrap_or(&[])
    }
}

/// Output-shape constraints stated in the query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_count: Option<ConstraintValue<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<ConstraintValue<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<ConstraintValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<ConstraintValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ConstraintValue<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,
}

/// Missing-information flags plus free-text clarification questions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryGaps {
    #[serde(default)]
    pub missing_style: bool,
    #[serde(default)]
    pub missing_mood: bool,
    #[serde(default)]
    pub missing_subject: bool,
    #[serde(default)]
    pub missing_duration: bool,
    #[serde(default)]
    pub missing_aspect_ratio: bool,
    #[serde(default)]
    pub missing_platform: bool,
    #[serde(default)]
    pub clarifications: Vec<String>,
}

/// Authoritative metadata injected by the query analyzer (never taken from a provider)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryMetadata {
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
    pub provider: String,
    pub normalization_applied: bool,
    pub grammar_corrected: bool,
    pub ui_override_applied: bool,
}

/// Stage 1 output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAnalysis {
    pub original_query: String,
    pub normalized_query: String,
    pub intent: Intent,
    pub modifiers: Modifiers,
    pub constraints: QueryConstraints,
    pub gaps: QueryGaps,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creative_reframing: Option<String>,
    pub metadata: QueryMetadata,
}

// ============================================================================
// Stage 2 output: AssetAnalysis + aggregate
// ============================================================================

/// Best-effort technical metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    /// [0.0, 10.0]
    pub quality_score: f64,
}

impl AssetMetadata {
    /// Pixel count when both dimensions are known
    pub fn pixels(&self) -> Option<u64> {
        Some(u64::from(self.width?) * u64::from(self.height?))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub description: String,
    #[serde(default)]
    pub detected_elements: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
}

/// Utilization bucket / project role of an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetRole {
    Primary,
    Reference,
    Supporting,
    Unused,
}

impl AssetRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Reference => "reference",
            Self::Supporting => "supporting",
            Self::Unused => "unused",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryAlignment {
    /// [0.0, 1.0]
    pub score: f64,
    /// Role suggested by the per-asset analysis (a hint for synthesis)
    pub role: AssetRole,
    #[serde(default)]
    pub contributions: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancementNeeds {
    #[serde(default)]
    pub upscale: bool,
    #[serde(default)]
    pub denoise: bool,
    #[serde(default)]
    pub color_correction: bool,
    #[serde(default)]
    pub stabilization: bool,
    #[serde(default)]
    pub audio_cleanup: bool,
    #[serde(default)]
    pub transcription: bool,
}

impl EnhancementNeeds {
    pub fn any(&self) -> bool {
        self.upscale
            || self.denoise
            || self.color_correction
            || self.stabilization
            || self.audio_cleanup
            || self.transcription
    }

    /// Names of the flagged enhancements
    pub fn flagged(&self) -> Vec<&'static str> {
        let mut out = Vec::new();
        if self.upscale {
            out.push("upscale");
        }
        if self.denoise {
            out.push("denoise");
        }
        if self.color_correction {
            out.push("color_correction");
        }
        if self.stabilization {
            out.push("stabilization");
        }
        if self.audio_cleanup {
            out.push("audio_cleanup");
        }
        if self.transcription {
            out.push("transcription");
        }
        out
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingNeeds {
    #[serde(default)]
    pub enhancements: EnhancementNeeds,
    #[serde(default)]
    pub recommended_tools: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingOutcome {
    Success,
    Partial,
    Failed,
}

impl ProcessingOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }
}

/// Per-asset stage 2 result (exactly one per input asset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAnalysis {
    pub asset_id: String,
    pub kind: MediaKind,
    pub locator: String,
    pub metadata: AssetMetadata,
    pub content: ContentSummary,
    pub alignment: QueryAlignment,
    pub processing: ProcessingNeeds,
    pub outcome: ProcessingOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub processing_time_ms: u64,
}

impl AssetAnalysis {
    /// Whether the analysis produced usable content (success or partial)
    pub fn is_usable(&self) -> bool {
        self.outcome != ProcessingOutcome::Failed
    }

    /// Failure record for an asset whose analysis could not be completed
    pub fn failed(asset: &MediaAsset, error: impl Into<String>, processing_time_ms: u64) -> Self {
        Self {
            asset_id: asset.id.clone(),
            kind: asset.kind,
            locator: asset.locator.clone(),
            metadata: AssetMetadata::default(),
            content: ContentSummary {
                description: asset.description.clone().unwrap_or_default(),
                ..Default::default()
            },
            alignment: QueryAlignment {
                score: 0.0,
                role: AssetRole::Unused,
                contributions: Vec::new(),
            },
            processing: ProcessingNeeds::default(),
            outcome: ProcessingOutcome::Failed,
            error: Some(error.into()),
            provider: None,
            processing_time_ms,
        }
    }
}

/// Aggregate over all per-asset results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetSummary {
    pub total_assets: usize,
    pub by_kind: BTreeMap<MediaKind, usize>,
    /// Success + partial outcomes
    pub successes: usize,
    pub partials: usize,
    pub failures: usize,
    /// Mean per-asset quality [0.0, 10.0], failures excluded
    pub overall_quality_score: f64,
    pub primary_candidates: Vec<String>,
    pub reference_candidates: Vec<String>,
    pub processing_time_ms: u64,
}

/// Stage 2 output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetStageResult {
    pub analyses: Vec<AssetAnalysis>,
    pub summary: AssetSummary,
    /// True when at least one asset succeeded, or no assets were supplied
    pub success: bool,
    /// Provider id -> number of assets it served
    pub provider_usage: BTreeMap<String, usize>,
}

impl AssetStageResult {
    pub fn usable(&self) -> impl Iterator<Item = &AssetAnalysis> {
        self.analyses.iter().filter(|a| a.is_usable())
    }

    pub fn find(&self, asset_id: &str) -> Option<&AssetAnalysis> {
        self.analyses.iter().find(|a| a.asset_id == asset_id)
    }
}
