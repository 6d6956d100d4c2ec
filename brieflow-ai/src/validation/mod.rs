// Schema Validation
//
// Concept: Single validation boundary after every pipeline stage
// Synchronization: Every stage output implements `Schema`; stages call
// `validate()` before handing their result on
//
// Values that fail their declared shape are rejected with a field-level
// report, never coerced.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::provider::extract_json_object;
use crate::types::{AssetAnalysis, AssetStageResult, ProcessingOutcome, QueryAnalysis, QueryConstraints};

/// One field-level problem
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Dotted path, e.g. `analyses[2].metadata.quality_score`
    pub path: String,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A value failed its declared shape
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{target} failed validation ({} error(s)): {}", .errors.len(), summary(.errors))]
pub struct SchemaViolation {
    pub target: &'static str,
    pub errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects field errors under a path prefix
#[derive(Debug, Default)]
pub struct FieldChecker {
    prefix: Vec<String>,
    errors: Vec<FieldError>,
}

impl FieldChecker {
    pub fn new() -> Self {
        Self::default()
    }

    fn path(&self, field: &str) -> String {
        let mut path = String::new();
        for segment in &self.prefix {
            if !path.is_empty() && !segment.starts_with('[') {
                path.push('.');
            }
            path.push_str(segment);
        }
        if !field.is_empty() {
            if !path.is_empty() && !field.starts_with('[') {
                path.push('.');
            }
            path.push_str(field);
        }
        if path.is_empty() {
            path.push('$');
        }
        path
    }

    /// Run `f` with `segment` appended to the path prefix
    pub fn scoped(&mut self, segment: impl Into<String>, f: impl FnOnce(&mut Self)) {
        self.prefix.push(segment.into());
        f(self);
        self.prefix.pop();
    }

    /// Run `f` for an indexed element (`name[i]`)
    pub fn indexed(&mut self, name: &str, index: usize, f: impl FnOnce(&mut Self)) {
        self.scoped(format!("{}[{}]", name, index), f);
    }

    pub fn fail(&mut self, field: &str, message: impl Into<String>) {
        let path = self.path(field);
        self.errors.push(FieldError {
            path,
            message: message.into(),
        });
    }

    /// Probability/confidence in [0, 1]
    pub fn probability(&mut self, field: &str, value: f64) {
        self.bounded(field, value, 0.0, 1.0);
    }

    pub fn bounded(&mut self, field: &str, value: f64, min: f64, max: f64) {
        if !value.is_finite() {
            self.fail(field, format!("must be a finite number, got {}", value));
        } else if value < min || value > max {
            self.fail(field, format!("must be within [{}, {}], got {}", min, max, value));
        }
    }

    pub fn non_empty(&mut self, field: &str, value: &str) {
        if value.trim().is_empty() {
            self.fail(field, "must not be empty");
        }
    }

    pub fn ensure(&mut self, field: &str, condition: bool, message: impl Into<String>) {
        if !condition {
            self.fail(field, message);
        }
    }

    pub fn finish(self, target: &'static str) -> Result<(), SchemaViolation> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaViolation {
                target,
                errors: self.errors,
            })
        }
    }
}

/// A stage output with a declared shape
pub trait Schema {
    /// Name used in violation reports
    const NAME: &'static str;

    fn check(&self, checker: &mut FieldChecker);

    fn validate(&self) -> Result<(), SchemaViolation> {
        let mut checker = FieldChecker::new();
        self.check(&mut checker);
        checker.finish(Self::NAME)
    }
}

/// Why a provider payload could not be turned into a typed value
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PayloadError {
    #[error("no JSON object found in provider response")]
    NoJsonObject,

    #[error(transparent)]
    Invalid(#[from] SchemaViolation),
}

/// Extract the first JSON object from `raw` and deserialize it as `T`
///
/// Deserialization errors become a single field error at `$`; no field is
/// coerced or defaulted beyond what `T`'s serde attributes declare.
pub fn parse_payload<T: DeserializeOwned>(raw: &str, target: &'static str) -> Result<T, PayloadError> {
    let json = extract_json_object(raw).ok_or(PayloadError::NoJsonObject)?;
    serde_json::from_str(json).map_err(|e| {
        PayloadError::Invalid(SchemaViolation {
            target,
            errors: vec![FieldError {
                path: "$".to_string(),
                message: e.to_string(),
            }],
        })
    })
}

/// Parse `W:H` into positive integer parts
pub fn parse_aspect_ratio(value: &str) -> Option<(u32, u32)> {
    let (w, h) = value.trim().split_once(':')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// Whether two aspect ratios describe the same shape (`16:9` == ` 32 : 18`)
///
/// Unparseable values compare as trimmed text.
pub fn same_aspect_ratio(a: &str, b: &str) -> bool {
    match (parse_aspect_ratio(a), parse_aspect_ratio(b)) {
        (Some((aw, ah)), Some((bw, bh))) => aw as u64 * bh as u64 == bw as u64 * ah as u64,
        _ => a.trim() == b.trim(),
    }
}

/// Parse `WxH` resolutions or the common names (`720p`, `1080p`, `4k`)
pub fn parse_resolution(value: &str) -> Option<(u32, u32)> {
    let normalized = value.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "480p" => return Some((854, 480)),
        "720p" | "hd" => return Some((1280, 720)),
        "1080p" | "fhd" | "full hd" => return Some((1920, 1080)),
        "1440p" | "2k" => return Some((2560, 1440)),
        "2160p" | "4k" | "uhd" => return Some((3840, 2160)),
        _ => {}
    }
    let (w, h) = normalized.split_once('x')?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

pub(crate) fn check_constraints(checker: &mut FieldChecker, constraints: &QueryConstraints) {
    if let Some(count) = &constraints.image_count {
        let candidates = count.candidates();
        checker.ensure("image_count", !candidates.is_empty(), "alternatives must not be empty");
        for c in candidates {
            checker.ensure("image_count", *c >= 1, "must be at least 1");
        }
    }
    if let Some(duration) = &constraints.duration_seconds {
        let candidates = duration.candidates();
        checker.ensure(
            "duration_seconds",
            !candidates.is_empty(),
            "alternatives must not be empty",
        );
        for d in candidates {
            checker.ensure(
                "duration_seconds",
                d.is_finite() && *d > 0.0,
                format!("must be positive, got {}", d),
            );
        }
    }
    if let Some(ratio) = &constraints.aspect_ratio {
        let candidates = ratio.candidates();
        checker.ensure("aspect_ratio", !candidates.is_empty(), "alternatives must not be empty");
        for r in candidates {
            checker.ensure(
                "aspect_ratio",
                parse_aspect_ratio(r).is_some(),
                format!("must look like W:H, got '{}'", r),
            );
        }
    }
    if let Some(resolution) = &constraints.resolution {
        let candidates = resolution.candidates();
        checker.ensure("resolution", !candidates.is_empty(), "alternatives must not be empty");
        for r in candidates {
            checker.ensure(
                "resolution",
                parse_resolution(r).is_some(),
                format!("must be WxH or a named resolution, got '{}'", r),
            );
        }
    }
    if let Some(format) = &constraints.format {
        checker.ensure(
            "format",
            !format.candidates().is_empty(),
            "alternatives must not be empty",
        );
    }
}

impl Schema for QueryAnalysis {
    const NAME: &'static str = "QueryAnalysis";

    fn check(&self, c: &mut FieldChecker) {
        c.non_empty("original_query", &self.original_query);
        c.non_empty("normalized_query", &self.normalized_query);
        c.scoped("intent", |c| {
            c.probability("confidence", self.intent.confidence);
            c.ensure(
                "secondary_outputs",
                !self.intent.secondary_outputs.contains(&self.intent.output_type),
                "must not repeat the primary output type",
            );
        });
        c.scoped("constraints", |c| check_constraints(c, &self.constraints));
        c.scoped("metadata", |c| c.non_empty("provider", &self.metadata.provider));
    }
}

impl Schema for AssetAnalysis {
    const NAME: &'static str = "AssetAnalysis";

    fn check(&self, c: &mut FieldChecker) {
        c.non_empty("asset_id", &self.asset_id);
        c.non_empty("locator", &self.locator);
        c.scoped("metadata", |c| {
            c.bounded("quality_score", self.metadata.quality_score, 0.0, 10.0);
            if let Some(duration) = self.metadata.duration_seconds {
                c.ensure(
                    "duration_seconds",
                    duration.is_finite() && duration >= 0.0,
                    "must be non-negative",
                );
            }
            if let Some(ratio) = &self.metadata.aspect_ratio {
                c.ensure(
                    "aspect_ratio",
                    parse_aspect_ratio(ratio).is_some(),
                    format!("must look like W:H, got '{}'", ratio),
                );
            }
        });
        c.scoped("alignment", |c| c.probability("score", self.alignment.score));
        match self.outcome {
            ProcessingOutcome::Failed => c.ensure(
                "error",
                self.error.as_deref().is_some_and(|e| !e.trim().is_empty()),
                "failed outcome must carry an error",
            ),
            _ => c.ensure(
                "error",
                self.error.is_none(),
                "only failed outcomes carry an error",
            ),
        }
    }
}

impl Schema for AssetStageResult {
    const NAME: &'static str = "AssetStageResult";

    fn check(&self, c: &mut FieldChecker) {
        let mut ids = HashSet::new();
        for (i, analysis) in self.analyses.iter().enumerate() {
            c.indexed("analyses", i, |c| {
                analysis.check(c);
                c.ensure(
                    "asset_id",
                    ids.insert(analysis.asset_id.as_str()),
                    format!("duplicate asset id '{}'", analysis.asset_id),
                );
            });
        }

        let s = &self.summary;
        c.scoped("summary", |c| {
            c.ensure(
                "total_assets",
                s.total_assets == self.analyses.len(),
                format!("{} != {} analyses", s.total_assets, self.analyses.len()),
            );
            c.ensure(
                "successes",
                s.successes + s.failures == s.total_assets,
                "successes + failures must equal total_assets",
            );
            c.ensure("partials", s.partials <= s.successes, "partials exceed successes");
            c.bounded("overall_quality_score", s.overall_quality_score, 0.0, 10.0);
            for (i, id) in s
                .primary_candidates
                .iter()
                .chain(s.reference_candidates.iter())
                .enumerate()
            {
                c.ensure(
                    &format!("candidates[{}]", i),
                    ids.contains(id.as_str()),
                    format!("unknown asset id '{}'", id),
                );
            }
        });
    }
}
