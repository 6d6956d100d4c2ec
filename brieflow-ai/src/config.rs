//! Configuration for brieflow-ai
//!
//! Bootstrap configuration is read from a TOML file resolved with
//! CLI → ENV (`BRIEFLOW_CONFIG`) → `~/.config/brieflow/brieflow-ai.toml` →
//! built-in defaults priority. Provider API keys are never stored in TOML;
//! each provider entry names the environment variable holding its key.
//!
//! Every stage receives its slice of [`PipelineConfig`] explicitly.

use brieflow_common::config::{load_toml_config, resolve_config_path, LoggingConfig};
use brieflow_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::provider::ModelPreference;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "BRIEFLOW_CONFIG";

/// Default config file name inside the per-user config directory
pub const CONFIG_FILE_NAME: &str = "brieflow-ai.toml";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub server: ServerConfig,

    /// Reasoning providers, most capable first
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,

    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl TomlConfig {
    /// Resolve and load the config file, falling back to defaults when none exists
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path, CONFIG_ENV_VAR, CONFIG_FILE_NAME)? {
            Some(path) => {
                let config: TomlConfig = load_toml_config(&path)?;
                config.validate()?;
                info!(
                    path = %path.display(),
                    providers = config.providers.len(),
                    "Loaded configuration"
                );
                Ok(config)
            }
            None => {
                info!("No config file found, using built-in defaults");
                Ok(TomlConfig::default())
            }
        }
    }

    /// Reject configurations that cannot produce a working provider chain
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.providers {
            if entry.id.trim().is_empty() {
                return Err(Error::Config("Provider entry with empty id".to_string()));
            }
            if !seen.insert(entry.id.as_str()) {
                return Err(Error::Config(format!("Duplicate provider id: {}", entry.id)));
            }
            match entry.kind {
                ProviderKind::OpenaiCompatible => {
                    if entry.endpoint.trim().is_empty() || entry.model.trim().is_empty() {
                        return Err(Error::Config(format!(
                            "Provider {}: endpoint and model are required",
                            entry.id
                        )));
                    }
                }
                ProviderKind::Scripted => {
                    if entry.script.is_none() {
                        return Err(Error::Config(format!(
                            "Provider {}: scripted providers need a script file",
                            entry.id
                        )));
                    }
                }
            }
            if entry.requests_per_second == 0 {
                return Err(Error::Config(format!(
                    "Provider {}: requests_per_second must be at least 1",
                    entry.id
                )));
            }
        }
        self.pipeline.scoring.validate()
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

/// Provider implementation selected by a config entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Chat-completions HTTP endpoint
    #[default]
    OpenaiCompatible,
    /// Canned replies from a JSON script file (offline runs)
    Scripted,
}

/// One reasoning provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Stable provider id used in model preferences and reports
    pub id: String,
    #[serde(default)]
    pub kind: ProviderKind,
    /// Chat-completions endpoint URL
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub model: String,
    /// Script file for `kind = "scripted"`
    #[serde(default)]
    pub script: Option<PathBuf>,
    /// Environment variable holding the API key (optional for local endpoints)
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderEntry {
    fn default() -> Self {
        Self {
            id: String::new(),
            kind: ProviderKind::default(),
            endpoint: String::new(),
            model: String::new(),
            script: None,
            api_key_env: None,
            requests_per_second: default_requests_per_second(),
            timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_requests_per_second() -> u32 {
    2
}

fn default_provider_timeout_secs() -> u64 {
    30
}

/// Depth of gap analysis in the synthesis stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GapAnalysisDepth {
    /// Structural gaps only
    #[default]
    Basic,
    /// Structural gaps plus query clarification questions
    Thorough,
}

/// Per-stage pipeline configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub query: QueryStageConfig,
    #[serde(default)]
    pub assets: AssetStageConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryStageConfig {
    #[serde(default)]
    pub model_preference: ModelPreference,
    #[serde(default = "default_true")]
    pub grammar_correction: bool,
    #[serde(default)]
    pub creative_reframing: bool,
    #[serde(default = "default_true")]
    pub fallback_enabled: bool,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
}

impl Default for QueryStageConfig {
    fn default() -> Self {
        Self {
            model_preference: ModelPreference::Auto,
            grammar_correction: true,
            creative_reframing: false,
            fallback_enabled: true,
            provider_timeout_secs: default_provider_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetStageConfig {
    #[serde(default)]
    pub model_preference: ModelPreference,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
    /// Caller-level timeout for the whole fan-out (stage-fatal when exceeded)
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
    /// Quality score at or above which an asset is a primary-content candidate
    #[serde(default = "default_primary_quality_threshold")]
    pub primary_quality_threshold: f64,
    /// Minimum description length for a primary-content candidate
    #[serde(default = "default_min_description_len")]
    pub min_description_len: usize,
}

impl Default for AssetStageConfig {
    fn default() -> Self {
        Self {
            model_preference: ModelPreference::Auto,
            provider_timeout_secs: default_provider_timeout_secs(),
            stage_timeout_secs: default_stage_timeout_secs(),
            primary_quality_threshold: default_primary_quality_threshold(),
            min_description_len: default_min_description_len(),
        }
    }
}

fn default_stage_timeout_secs() -> u64 {
    120
}

fn default_primary_quality_threshold() -> f64 {
    6.0
}

fn default_min_description_len() -> usize {
    20
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    #[serde(default)]
    pub model_preference: ModelPreference,
    /// Ask a provider for the creative-direction narrative
    #[serde(default = "default_true")]
    pub ai_synthesis: bool,
    #[serde(default)]
    pub gap_analysis_depth: GapAnalysisDepth,
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            model_preference: ModelPreference::Auto,
            ai_synthesis: true,
            gap_analysis_depth: GapAnalysisDepth::Basic,
            provider_timeout_secs: default_provider_timeout_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// Tunable scoring constants
///
/// Blend structure is fixed (stage confidences averaged, completeness
/// penalized per gap severity); the weights are configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Intent confidence boost when an asset kind matches the declared output
    pub corroboration_boost: f64,
    /// Below this confidence a mixed-kind asset set switches intent to mixed
    pub mixed_override_confidence: f64,
    pub primary_alignment_threshold: f64,
    pub reference_alignment_threshold: f64,
    pub supporting_alignment_threshold: f64,
    /// Per-asset quality (0-10) below which a quality gap is raised
    pub low_quality_threshold: f64,
    /// Style labels less similar than this conflict
    pub style_similarity_threshold: f64,
    pub critical_gap_penalty: f64,
    pub high_gap_penalty: f64,
    pub missing_element_penalty: f64,
    pub quality_confidence_weight: f64,
    pub quality_completeness_weight: f64,
    /// Documents below this overall confidence are partial
    pub partial_confidence_threshold: f64,
    pub complexity_diversity_weight: f64,
    pub complexity_enhancement_weight: f64,
    pub complexity_issue_weight: f64,
    /// Complexity scores at or above these are moderate / complex
    pub moderate_complexity_threshold: f64,
    pub complex_complexity_threshold: f64,
    /// Primary-asset priority = alignment weight * alignment + quality weight * quality / 10
    pub priority_alignment_weight: f64,
    pub priority_quality_weight: f64,
    pub critical_priority_threshold: f64,
    pub high_priority_threshold: f64,
    pub medium_priority_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            corroboration_boost: 0.1,
            mixed_override_confidence: 0.5,
            primary_alignment_threshold: 0.7,
            reference_alignment_threshold: 0.45,
            supporting_alignment_threshold: 0.25,
            low_quality_threshold: 5.0,
            style_similarity_threshold: 0.5,
            critical_gap_penalty: 0.2,
            high_gap_penalty: 0.1,
            missing_element_penalty: 0.05,
            quality_confidence_weight: 0.6,
            quality_completeness_weight: 0.4,
            partial_confidence_threshold: 0.5,
            complexity_diversity_weight: 0.4,
            complexity_enhancement_weight: 0.3,
            complexity_issue_weight: 0.3,
            moderate_complexity_threshold: 0.33,
            complex_complexity_threshold: 0.66,
            priority_alignment_weight: 0.7,
            priority_quality_weight: 0.3,
            critical_priority_threshold: 0.85,
            high_priority_threshold: 0.75,
            medium_priority_threshold: 0.6,
        }
    }
}

impl ScoringConfig {
    pub fn validate(&self) -> Result<()> {
        let unit = [
            ("corroboration_boost", self.corroboration_boost),
            ("mixed_override_confidence", self.mixed_override_confidence),
            ("primary_alignment_threshold", self.primary_alignment_threshold),
            ("reference_alignment_threshold", self.reference_alignment_threshold),
            ("supporting_alignment_threshold", self.supporting_alignment_threshold),
            ("style_similarity_threshold", self.style_similarity_threshold),
            ("critical_gap_penalty", self.critical_gap_penalty),
            ("high_gap_penalty", self.high_gap_penalty),
            ("missing_element_penalty", self.missing_element_penalty),
            ("partial_confidence_threshold", self.partial_confidence_threshold),
            ("priority_alignment_weight", self.priority_alignment_weight),
            ("priority_quality_weight", self.priority_quality_weight),
            ("critical_priority_threshold", self.critical_priority_threshold),
            ("high_priority_threshold", self.high_priority_threshold),
            ("medium_priority_threshold", self.medium_priority_threshold),
            ("moderate_complexity_threshold", self.moderate_complexity_threshold),
            ("complex_complexity_threshold", self.complex_complexity_threshold),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "scoring.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        if !(self.supporting_alignment_threshold <= self.reference_alignment_threshold
            && self.reference_alignment_threshold <= self.primary_alignment_threshold)
        {
            return Err(Error::Config(
                "scoring alignment thresholds must satisfy supporting <= reference <= primary"
                    .to_string(),
            ));
        }

        let quality_weights = self.quality_confidence_weight + self.quality_completeness_weight;
        if (quality_weights - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "scoring quality weights must sum to 1.0, got {}",
                quality_weights
            )));
        }

        if !(self.medium_priority_threshold <= self.high_priority_threshold
            && self.high_priority_threshold <= self.critical_priority_threshold)
        {
            return Err(Error::Config(
                "scoring priority thresholds must satisfy medium <= high <= critical".to_string(),
            ));
        }

        if self.moderate_complexity_threshold > self.complex_complexity_threshold {
            return Err(Error::Config(
                "scoring complexity thresholds must satisfy moderate <= complex".to_string(),
            ));
        }

        let priority_weights = self.priority_alignment_weight + self.priority_quality_weight;
        if (priority_weights - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "scoring priority weights must sum to 1.0, got {}",
                priority_weights
            )));
        }

        if !(0.0..=10.0).contains(&self.low_quality_threshold) {
            return Err(Error::Config(
                "scoring.low_quality_threshold must be within [0, 10]".to_string(),
            ));
        }

        Ok(())
    }
}
