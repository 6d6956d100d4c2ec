//! Stage 3 output: the unified project understanding
//!
//! Every asset analysed in stage 2 lands in exactly one utilization bucket.
//! `utilization_rate` is `(primary + reference + supporting) / total` and is
//! zero when no assets were supplied.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{AssetRole, MediaKind, OutputType};
use crate::validation::{parse_aspect_ratio, FieldChecker, Schema};

// ============================================================================
// Intent
// ============================================================================

/// Where the creative direction text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectionSource {
    /// Written by a reasoning provider
    Provider,
    /// Provider unavailable or disabled; filled from the template
    Template,
    /// Asset-free mode; output-type profile default
    ProfileDefault,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedIntent {
    pub output_type: OutputType,
    /// [0.0, 1.0]
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default)]
    pub secondary_outputs: Vec<OutputType>,
    /// Multiple asset kinds present with none strictly dominating
    pub mixed_scenario: bool,
    /// Usable assets whose kind matches the output type
    #[serde(default)]
    pub corroborating_assets: Vec<String>,
    pub creative_direction: String,
    pub direction_source: DirectionSource,
}

// ============================================================================
// Constraints
// ============================================================================

/// Precedence tier a constraint value was taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSource {
    Query,
    Assets,
    Platform,
    Profile,
}

/// A constraint value tagged with its source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sourced<T> {
    pub value: T,
    pub source: ConstraintSource,
}

impl<T> Sourced<T> {
    pub fn new(value: T, source: ConstraintSource) -> Self {
        Self { value, source }
    }

    pub fn is_stated(&self) -> bool {
        self.source == ConstraintSource::Query
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechnicalConstraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<Sourced<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<Sourced<String>>,
    pub resolution: Sourced<String>,
    pub format: Sourced<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_count: Option<Sourced<u32>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlatformConstraints {
    /// Recognized platform names, canonicalized
    #[serde(default)]
    pub targets: Vec<String>,
    /// Stated platforms with no known profile
    #[serde(default)]
    pub unrecognized: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_seconds: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreativeConstraints {
    #[serde(default)]
    pub styles: Vec<String>,
    #[serde(default)]
    pub moods: Vec<String>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub color_palette: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionConstraints {
    /// Kinds among usable assets
    #[serde(default)]
    pub available_kinds: Vec<MediaKind>,
    /// Usable assets with at least one enhancement flag
    #[serde(default)]
    pub enhancement_assets: Vec<String>,
    /// No usable asset can stand in for the output medium
    pub requires_generation: bool,
    #[serde(default)]
    pub recommended_tools: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedConstraints {
    pub technical: TechnicalConstraints,
    pub platform: PlatformConstraints,
    pub creative: CreativeConstraints,
    pub production: ProductionConstraints,
}

// ============================================================================
// Asset utilization
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetAssignment {
    pub asset_id: String,
    pub kind: MediaKind,
    pub role: AssetRole,
    /// Alignment score the role was derived from
    pub score: f64,
    pub rationale: String,
    /// Processing priority; primary assets only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityTier>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetUtilization {
    pub primary_assets: Vec<AssetAssignment>,
    pub reference_assets: Vec<AssetAssignment>,
    pub supporting_assets: Vec<AssetAssignment>,
    pub unused_assets: Vec<AssetAssignment>,
    pub total_assets: usize,
    pub utilization_rate: f64,
}

impl AssetUtilization {
    /// Buckets paired with the role they hold
    pub fn buckets(&self) -> [(AssetRole, &[AssetAssignment]); 4] {
        [
            (AssetRole::Primary, self.primary_assets.as_slice()),
            (AssetRole::Reference, self.reference_assets.as_slice()),
            (AssetRole::Supporting, self.supporting_assets.as_slice()),
            (AssetRole::Unused, self.unused_assets.as_slice()),
        ]
    }

    pub fn assigned_count(&self) -> usize {
        self.buckets().iter().map(|(_, b)| b.len()).sum()
    }

    pub fn role_of(&self, asset_id: &str) -> Option<AssetRole> {
        self.buckets()
            .into_iter()
            .find(|(_, bucket)| bucket.iter().any(|a| a.asset_id == asset_id))
            .map(|(role, _)| role)
    }

    pub fn primary_ids(&self) -> Vec<&str> {
        self.primary_assets.iter().map(|a| a.asset_id.as_str()).collect()
    }

    pub fn reference_ids(&self) -> Vec<&str> {
        self.reference_assets.iter().map(|a| a.asset_id.as_str()).collect()
    }
}

// ============================================================================
// Gaps and contradictions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    Content,
    Style,
    Technical,
    Quality,
    Information,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Critical,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    #[serde(rename = "type")]
    pub gap_type: GapType,
    pub impact: Impact,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_default: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_assets: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionType {
    IntentVsAssets,
    StyleConflict,
    ConstraintConflict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    #[serde(rename = "type")]
    pub contradiction_type: ContradictionType,
    pub description: String,
    /// Asset ids or constraint names involved
    #[serde(default)]
    pub involved: Vec<String>,
    pub resolution: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis {
    pub gaps: Vec<Gap>,
    pub contradictions: Vec<Contradiction>,
    /// Essential elements that had to be defaulted
    #[serde(default)]
    pub missing_elements: Vec<String>,
}

impl GapAnalysis {
    pub fn count_impact(&self, impact: Impact) -> usize {
        self.gaps.iter().filter(|g| g.impact == impact).count()
    }

    pub fn has_critical(&self) -> bool {
        self.count_impact(Impact::Critical) > 0
    }

    pub fn contradictions_of(&self, kind: ContradictionType) -> impl Iterator<Item = &Contradiction> {
        self.contradictions
            .iter()
            .filter(move |c| c.contradiction_type == kind)
    }
}

// ============================================================================
// Creative synthesis
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleFusion {
    #[serde(default)]
    pub query_styles: Vec<String>,
    /// Dominant styles across primary and reference assets, most frequent first
    #[serde(default)]
    pub asset_styles: Vec<String>,
    pub strategy: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodPlan {
    #[serde(default)]
    pub target_moods: Vec<String>,
    #[serde(default)]
    pub asset_moods: Vec<String>,
    pub integration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeBeat {
    pub name: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub purpose: String,
    #[serde(default)]
    pub assets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeStructure {
    pub total_duration_seconds: f64,
    pub beats: Vec<NarrativeBeat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreativeSynthesis {
    pub style_fusion: StyleFusion,
    pub mood_plan: MoodPlan,
    /// Present only for sequential media
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<NarrativeStructure>,
}

// ============================================================================
// Production recommendations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
    Simple,
    Moderate,
    Complex,
}

impl ComplexityTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Moderate => "moderate",
            Self::Complex => "complex",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationDimension {
    Speed,
    Quality,
    Cost,
    Complexity,
    Automation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStep {
    /// 1-based position
    pub order: u32,
    pub id: String,
    pub name: String,
    pub inputs: Vec<String>,
    pub expected_output: String,
    pub tool_categories: Vec<String>,
    pub estimated_minutes: u32,
    pub complexity: ComplexityTier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityTargets {
    pub resolution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loudness_lufs: Option<f64>,
    /// [1, 10]
    pub min_quality_score: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Optimization {
    pub dimension: OptimizationDimension,
    pub suggestion: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecommendations {
    pub steps: Vec<PipelineStep>,
    pub quality_targets: QualityTargets,
    pub optimizations: Vec<Optimization>,
}

// ============================================================================
// Metadata and root
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisMetadata {
    /// min(intent confidence, alignment score)
    pub synthesis_confidence: f64,
    /// Mean alignment of usable assets; absent in asset-free mode
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment_score: Option<f64>,
    pub completeness_score: f64,
    pub complexity: ComplexityTier,
    pub complexity_score: f64,
    pub asset_free: bool,
    pub processing_time_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Stage 3 output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedProjectUnderstanding {
    pub intent: UnifiedIntent,
    pub constraints: UnifiedConstraints,
    pub utilization: AssetUtilization,
    pub gap_analysis: GapAnalysis,
    pub creative: CreativeSynthesis,
    pub recommendations: ProductionRecommendations,
    pub metadata: SynthesisMetadata,
}

impl Schema for UnifiedProjectUnderstanding {
    const NAME: &'static str = "UnifiedProjectUnderstanding";

    fn check(&self, c: &mut FieldChecker) {
        c.scoped("intent", |c| {
            c.probability("confidence", self.intent.confidence);
            c.non_empty("creative_direction", &self.intent.creative_direction);
            c.ensure(
                "secondary_outputs",
                !self.intent.secondary_outputs.contains(&self.intent.output_type),
                "must not repeat the primary output type",
            );
        });

        c.scoped("constraints.technical", |c| {
            let t = &self.constraints.technical;
            if let Some(d) = &t.duration_seconds {
                c.ensure(
                    "duration_seconds",
                    d.value.is_finite() && d.value > 0.0,
                    "must be positive",
                );
            }
            if let Some(r) = &t.aspect_ratio {
                c.ensure(
                    "aspect_ratio",
                    parse_aspect_ratio(&r.value).is_some(),
                    format!("must look like W:H, got '{}'", r.value),
                );
            }
            c.non_empty("resolution", &t.resolution.value);
            c.non_empty("format", &t.format.value);
        });

        c.scoped("utilization", |c| check_utilization(c, &self.utilization));

        c.scoped("gap_analysis", |c| {
            for (i, gap) in self.gap_analysis.gaps.iter().enumerate() {
                c.indexed("gaps", i, |c| c.non_empty("description", &gap.description));
            }
            for (i, contradiction) in self.gap_analysis.contradictions.iter().enumerate() {
                c.indexed("contradictions", i, |c| {
                    c.non_empty("description", &contradiction.description);
                    c.non_empty("resolution", &contradiction.resolution);
                });
            }
        });

        c.scoped("creative", |c| {
            c.ensure(
                "narrative",
                self.creative.narrative.is_none() || self.intent.output_type.is_sequential(),
                "narrative is only defined for sequential media",
            );
            if let Some(narrative) = &self.creative.narrative {
                c.scoped("narrative", |c| {
                    let mut cursor = 0.0;
                    for (i, beat) in narrative.beats.iter().enumerate() {
                        c.indexed("beats", i, |c| {
                            c.ensure(
                                "start_seconds",
                                beat.start_seconds >= cursor && beat.end_seconds > beat.start_seconds,
                                "beats must be ordered and non-empty",
                            );
                            c.ensure(
                                "end_seconds",
                                beat.end_seconds <= narrative.total_duration_seconds + 1e-6,
                                "beat exceeds total duration",
                            );
                        });
                        cursor = beat.end_seconds;
                    }
                });
            }
        });

        c.scoped("recommendations", |c| {
            c.ensure(
                "steps",
                !self.recommendations.steps.is_empty(),
                "at least one step is required",
            );
            for (i, step) in self.recommendations.steps.iter().enumerate() {
                c.indexed("steps", i, |c| {
                    c.ensure(
                        "order",
                        step.order as usize == i + 1,
                        format!("expected order {}, got {}", i + 1, step.order),
                    );
                    c.non_empty("id", &step.id);
                });
            }
            let min_quality = self.recommendations.quality_targets.min_quality_score;
            c.ensure(
                "quality_targets.min_quality_score",
                (1..=10).contains(&min_quality),
                format!("must be within [1, 10], got {}", min_quality),
            );
        });

        c.scoped("metadata", |c| {
            c.probability("synthesis_confidence", self.metadata.synthesis_confidence);
            c.probability("completeness_score", self.metadata.completeness_score);
            c.probability("complexity_score", self.metadata.complexity_score);
            if let Some(alignment) = self.metadata.alignment_score {
                c.probability("alignment_score", alignment);
            }
        });
    }
}

pub(crate) fn check_utilization(c: &mut FieldChecker, u: &AssetUtilization) {
    let mut seen = HashSet::new();
    for (role, bucket) in u.buckets() {
        let name = format!("{}_assets", role.as_str());
        for (i, assignment) in bucket.iter().enumerate() {
            c.indexed(&name, i, |c| {
                c.ensure(
                    "asset_id",
                    seen.insert(assignment.asset_id.as_str()),
                    format!("asset '{}' assigned to more than one bucket", assignment.asset_id),
                );
                c.ensure(
                    "role",
                    assignment.role == role,
                    format!("role {} filed under {}", assignment.role.as_str(), role.as_str()),
                );
                c.probability("score", assignment.score);
                c.ensure(
                    "priority",
                    assignment.priority.is_none() || role == AssetRole::Primary,
                    "only primary assets carry a priority",
                );
            });
        }
    }

    c.ensure(
        "total_assets",
        u.assigned_count() == u.total_assets,
        format!("{} assigned != {} total", u.assigned_count(), u.total_assets),
    );

    let expected = utilization_rate(u);
    c.probability("utilization_rate", u.utilization_rate);
    c.ensure(
        "utilization_rate",
        (u.utilization_rate - expected).abs() < 1e-9,
        format!("expected {}, got {}", expected, u.utilization_rate),
    );
}

/// (primary + reference + supporting) / total, zero for an empty set
pub fn utilization_rate(u: &AssetUtilization) -> f64 {
    if u.total_assets == 0 {
        return 0.0;
    }
    let used = u.primary_assets.len() + u.reference_assets.len() + u.supporting_assets.len();
    used as f64 / u.total_assets as f64
}
