// Stage 1: Query Analyzer
//
// Concept: Turn raw user text into a validated QueryAnalysis
// Synchronization: Input is the raw query plus QueryOptions; output feeds the
// asset analyzer (normalized text) and the synthesizer (full analysis)
//
// Algorithm:
// 1. Normalize text (whitespace, terminal punctuation, optional grammar repair)
// 2. Build one structured-analysis prompt; caller-selected medium is authoritative
// 3. Run the prompt through the provider chain (preference first, then fallback);
//    responses without a well-formed JSON payload count as provider failures
// 4. Inject authoritative metadata (timestamp, timing, provider, normalization flags)
// 5. Apply the caller's output-type selection and derive missing-information flags
// 6. Validate against the QueryAnalysis schema
//
// All providers failing is fatal for this stage.

use brieflow_common::time::SharedClock;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use super::normalizer::normalize_query;
use super::StageError;
use crate::config::QueryStageConfig;
use crate::provider::{CallPolicy, GenerateOptions, ModelPreference, ProviderChain};
use crate::types::{
    Intent, Modifiers, OutputType, QueryAnalysis, QueryConstraints, QueryGaps, QueryMetadata,
};
use crate::validation::{check_constraints, parse_payload, FieldChecker, Schema};

/// Prompt marker identifying query-analysis prompts
pub const QUERY_PROMPT_MARKER: &str = "### brieflow:query_analysis";

/// Minimum confidence when the caller selected the output type explicitly
const SELECTED_OUTPUT_CONFIDENCE: f64 = 0.9;

/// Per-run query analysis options
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub grammar_correction: bool,
    pub creative_reframing: bool,
    pub model_preference: ModelPreference,
    pub fallback_enabled: bool,
    /// Medium chosen in the caller's UI; overrides text-inferred intent
    pub selected_output_type: Option<OutputType>,
    pub provider_timeout: Duration,
}

impl QueryOptions {
    pub fn from_config(config: &QueryStageConfig) -> Self {
        Self {
            grammar_correction: config.grammar_correction,
            creative_reframing: config.creative_reframing,
            model_preference: config.model_preference.clone(),
            fallback_enabled: config.fallback_enabled,
            selected_output_type: None,
            provider_timeout: Duration::from_secs(config.provider_timeout_secs.max(1)),
        }
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self::from_config(&QueryStageConfig::default())
    }
}

/// Provider-produced portion of a QueryAnalysis
#[derive(Debug, Deserialize)]
struct QueryAnalysisPayload {
    intent: Intent,
    #[serde(default)]
    modifiers: Modifiers,
    #[serde(default)]
    constraints: QueryConstraints,
    #[serde(default)]
    gaps: QueryGaps,
    #[serde(default)]
    creative_reframing: Option<String>,
}

impl QueryAnalysisPayload {
    fn check(&self) -> Result<(), String> {
        let mut checker = FieldChecker::new();
        checker.scoped("intent", |c| c.probability("confidence", self.intent.confidence));
        checker.scoped("constraints", |c| check_constraints(c, &self.constraints));
        checker
            .finish("QueryAnalysisPayload")
            .map_err(|v| v.to_string())
    }
}

/// Stage 1 result
#[derive(Debug, Clone)]
pub struct QueryStageOutput {
    pub analysis: QueryAnalysis,
    pub provider_id: String,
    pub attempts: usize,
    pub elapsed_ms: u64,
    /// Recovered provider failures and applied overrides
    pub warnings: Vec<String>,
}

/// Query analyzer (stage 1)
pub struct QueryAnalyzer {
    chain: ProviderChain,
    clock: SharedClock,
}

impl QueryAnalyzer {
    pub fn new(chain: ProviderChain, clock: SharedClock) -> Self {
        Self { chain, clock }
    }

    /// Analyze a raw query
    ///
    /// # Arguments
    /// * `raw_query` - User text as supplied
    /// * `options` - Toggles, model preference and caller-selected medium
    ///
    /// # Returns
    /// Validated analysis plus the id of the provider that served it, or the
    /// stage error naming the last attempted provider
    pub async fn analyze(
        &self,
        raw_query: &str,
        options: &QueryOptions,
    ) -> Result<QueryStageOutput, StageError> {
        if raw_query.trim().is_empty() {
            return Err(StageError::InputValidation("query must not be empty".to_string()));
        }

        let start = self.clock.now();
        let normalized = normalize_query(raw_query, options.grammar_correction);
        let prompt = build_query_prompt(&normalized.text, options);

        let policy = CallPolicy::new(options.model_preference.clone(), options.provider_timeout)
            .with_fallback(options.fallback_enabled);

        let result = self
            .chain
            .execute_parsed(&prompt, &GenerateOptions::structured(), &policy, |text| {
                let payload: QueryAnalysisPayload =
                    parse_payload(text, "QueryAnalysisPayload").map_err(|e| e.to_string())?;
                payload.check()?;
                Ok(payload)
            })
            .await?;

        let mut warnings: Vec<String> = result
            .failures
            .iter()
            .map(|f| format!("query_analysis: recovered provider failure: {}", f))
            .collect();

        let payload = result.value;
        let mut intent = payload.intent;
        let mut ui_override_applied = false;

        if let Some(selected) = options.selected_output_type {
            if selected != intent.output_type {
                warnings.push(format!(
                    "query_analysis: caller-selected output '{}' overrides inferred '{}'",
                    selected, intent.output_type
                ));
                intent.reasoning = format!(
                    "Output type selected by caller (text suggested {}). {}",
                    intent.output_type, intent.reasoning
                )
                .trim()
                .to_string();
            }
            intent.output_type = selected;
            intent.confidence = intent.confidence.max(SELECTED_OUTPUT_CONFIDENCE);
            ui_override_applied = true;
        }
        let mut secondary = Vec::with_capacity(intent.secondary_outputs.len());
        for output in intent.secondary_outputs.drain(..) {
            if output != intent.output_type && !secondary.contains(&output) {
                secondary.push(output);
            }
        }
        intent.secondary_outputs = secondary;
        if intent.reasoning.trim().is_empty() {
            intent.reasoning = format!("Inferred {} output from request text", intent.output_type);
        }

        let gaps = derive_gaps(payload.gaps, &payload.modifiers, &payload.constraints, intent.output_type);

        let creative_reframing = if options.creative_reframing {
            payload.creative_reframing.filter(|r| !r.trim().is_empty())
        } else {
            None
        };

        let elapsed_ms = self.clock.elapsed_ms(start);
        let analysis = QueryAnalysis {
            original_query: raw_query.to_string(),
            normalized_query: normalized.text,
            intent,
            modifiers: payload.modifiers,
            constraints: payload.constraints,
            gaps,
            creative_reframing,
            metadata: QueryMetadata {
                timestamp: start,
                processing_time_ms: elapsed_ms,
                provider: result.provider_id.clone(),
                normalization_applied: normalized.normalization_applied,
                grammar_corrected: normalized.grammar_corrected,
                ui_override_applied,
            },
        };

        analysis.validate()?;

        info!(
            provider = %result.provider_id,
            output_type = %analysis.intent.output_type,
            confidence = analysis.intent.confidence,
            attempts = result.failures.len() + 1,
            "Query analysis complete"
        );
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "Query analysis completed with warnings");
        }

        Ok(QueryStageOutput {
            analysis,
            attempts: result.failures.len() + 1,
            provider_id: result.provider_id,
            elapsed_ms,
            warnings,
        })
    }
}

/// Merge provider gap flags with flags derived from what was extracted
fn derive_gaps(
    mut gaps: QueryGaps,
    modifiers: &Modifiers,
    constraints: &QueryConstraints,
    output_type: OutputType,
) -> QueryGaps {
    gaps.missing_style |= modifiers.styles().is_empty();
    gaps.missing_mood |= modifiers.moods().is_empty();
    gaps.missing_subject |= modifiers.subject.as_deref().unwrap_or(&[]).is_empty();
    gaps.missing_platform |= constraints.platforms.as_deref().unwrap_or(&[]).is_empty();
    if output_type.is_sequential() {
        gaps.missing_duration |= constraints.duration_seconds.is_none();
    }
    if matches!(output_type, OutputType::Image | OutputType::Video | OutputType::Mixed) {
        gaps.missing_aspect_ratio |= constraints.aspect_ratio.is_none();
    }
    gaps.clarifications.retain(|c| !c.trim().is_empty());
    gaps
}

/// Build the structured-analysis prompt
pub fn build_query_prompt(normalized_query: &str, options: &QueryOptions) -> String {
    let mut prompt = String::new();
    prompt.push_str(QUERY_PROMPT_MARKER);
    prompt.push_str("\nYou analyze creative production requests.\n\n");
    prompt.push_str("Request:\n\"\"\"\n");
    prompt.push_str(normalized_query);
    prompt.push_str("\n\"\"\"\n\n");

    if let Some(selected) = options.selected_output_type {
        prompt.push_str(&format!(
            "The caller has already selected the output medium: {}. Treat any medium \
             mentioned in the request text as descriptive content, not as an override.\n\n",
            selected
        ));
    } else {
        prompt.push_str(
            "Infer the output medium from the request. Mentions of other media are \
             descriptive content unless the request clearly asks for that medium.\n\n",
        );
    }

    prompt.push_str(
        "Return exactly one JSON object with this shape:\n\
         {\n\
         \x20 \"intent\": {\"output_type\": \"image|video|audio|mixed\", \"confidence\": 0.0-1.0, \
         \"reasoning\": \"...\", \"secondary_outputs\": []},\n\
         \x20 \"modifiers\": {\"style\": [], \"mood\": [], \"theme\": [], \"color_palette\": [], \
         \"subject\": [], \"setting\": []},\n\
         \x20 \"constraints\": {\"image_count\": n, \"duration_seconds\": n or [n, ...], \
         \"aspect_ratio\": \"W:H\", \"resolution\": \"...\", \"format\": \"...\", \"platforms\": []},\n\
         \x20 \"gaps\": {\"missing_style\": bool, \"missing_mood\": bool, \"missing_subject\": bool, \
         \"missing_duration\": bool, \"missing_aspect_ratio\": bool, \"missing_platform\": bool, \
         \"clarifications\": []}",
    );
    if options.creative_reframing {
        prompt.push_str(",\n  \"creative_reframing\": \"one sentence restating the request as a creative brief\"");
    }
    prompt.push_str("\n}\nOmit constraint fields the request does not state.\n");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ReasoningProvider, ScriptedProvider, ScriptedReply};
    use brieflow_common::time::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    const VIDEO_REPLY: &str = r#"Here you go:
{"intent": {"output_type": "video", "confidence": 0.82, "reasoning": "teaser with duration"},
 "modifiers": {"mood": ["energetic"], "subject": ["product"]},
 "constraints": {"duration_seconds": 30, "aspect_ratio": "16:9"},
 "gaps": {"clarifications": ["Which product?"]},
 "creative_reframing": "A punchy product reveal."}"#;

    fn analyzer(providers: Vec<ScriptedProvider>) -> QueryAnalyzer {
        let chain = ProviderChain::new(
            providers
                .into_iter()
                .map(|p| Arc::new(p) as Arc<dyn ReasoningProvider>)
                .collect(),
        );
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()));
        QueryAnalyzer::new(chain, clock)
    }

    #[tokio::test]
    async fn test_analyze_injects_metadata() {
        let qa = analyzer(vec![ScriptedProvider::new("primary")
            .with_rule(QUERY_PROMPT_MARKER, ScriptedReply::text(VIDEO_REPLY))]);

        let out = qa
            .analyze("make a 30s product teaser, 16:9, energetic mood", &QueryOptions::default())
            .await
            .unwrap();

        let a = &out.analysis;
        assert_eq!(out.provider_id, "primary");
        assert_eq!(a.metadata.provider, "primary");
        assert_eq!(a.metadata.timestamp, Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        assert!(a.metadata.normalization_applied);
        assert!(a.metadata.grammar_corrected);
        assert_eq!(a.intent.output_type, OutputType::Video);
        assert_eq!(a.constraints.duration_seconds.as_ref().and_then(|d| d.primary()), Some(&30.0));
        assert!(a.gaps.missing_style);
        assert!(!a.gaps.missing_mood);
        assert!(!a.gaps.missing_duration);
        // reframing is dropped unless requested
        assert_eq!(a.creative_reframing, None);
    }

    #[tokio::test]
    async fn test_secondary_outputs_deduplicated() {
        let reply = r#"{"intent": {"output_type": "video", "confidence": 0.7,
            "secondary_outputs": ["image", "audio", "video", "image", "audio"]}}"#;
        let qa = analyzer(vec![ScriptedProvider::new("primary").with_default(ScriptedReply::text(reply))]);

        let out = qa.analyze("a trailer with stills and a score", &QueryOptions::default()).await.unwrap();
        assert_eq!(
            out.analysis.intent.secondary_outputs,
            vec![OutputType::Image, OutputType::Audio]
        );
    }

    #[tokio::test]
    async fn test_fallback_skips_failed_and_malformed() {
        let qa = analyzer(vec![
            ScriptedProvider::new("down").with_default(ScriptedReply::fail("503")),
            ScriptedProvider::new("chatty").with_default(ScriptedReply::text("Probably a video.")),
            ScriptedProvider::new("good").with_default(ScriptedReply::text(VIDEO_REPLY)),
        ]);

        let out = qa.analyze("teaser please", &QueryOptions::default()).await.unwrap();
        assert_eq!(out.provider_id, "good");
        assert_eq!(out.attempts, 3);
        assert_eq!(out.warnings.len(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_confidence_rejected() {
        let qa = analyzer(vec![ScriptedProvider::new("p").with_default(ScriptedReply::text(
            r#"{"intent": {"output_type": "image", "confidence": 4.0}}"#,
        ))]);
        let err = qa.analyze("a poster", &QueryOptions::default()).await.unwrap_err();
        match err {
            StageError::AllProvidersFailed { last_provider, cause, .. } => {
                assert_eq!(last_provider, "p");
                assert!(cause.contains("intent.confidence"));
            }
            other => panic!("Expected AllProvidersFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_selected_output_type_is_authoritative() {
        let provider = ScriptedProvider::new("p").with_default(ScriptedReply::text(VIDEO_REPLY));
        let qa = analyzer(vec![provider.clone()]);
        let options = QueryOptions {
            selected_output_type: Some(OutputType::Image),
            ..Default::default()
        };

        let out = qa.analyze("a video-style poster", &options).await.unwrap();
        assert_eq!(out.analysis.intent.output_type, OutputType::Image);
        assert!(out.analysis.intent.confidence >= 0.9);
        assert!(out.analysis.metadata.ui_override_applied);
        assert!(out.analysis.intent.reasoning.starts_with("Output type selected by caller"));
        assert!(provider.received_prompts()[0].contains("already selected the output medium: image"));
    }

    #[tokio::test]
    async fn test_creative_reframing_kept_when_requested() {
        let qa = analyzer(vec![ScriptedProvider::new("p").with_default(ScriptedReply::text(VIDEO_REPLY))]);
        let options = QueryOptions {
            creative_reframing: true,
            ..Default::default()
        };
        let out = qa.analyze("teaser", &options).await.unwrap();
        assert_eq!(out.analysis.creative_reframing.as_deref(), Some("A punchy product reveal."));
    }

    #[tokio::test]
    async fn test_empty_query_rejected_without_calls() {
        let provider = ScriptedProvider::new("p").with_default(ScriptedReply::text(VIDEO_REPLY));
        let calls = provider.call_counter();
        let qa = analyzer(vec![provider]);

        let err = qa.analyze("   ", &QueryOptions::default()).await.unwrap_err();
        assert!(matches!(err, StageError::InputValidation(_)));
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }

    #[test]
    fn test_prompt_mentions_reframing_only_when_enabled() {
        let off = build_query_prompt("Make a poster.", &QueryOptions::default());
        assert!(off.starts_with(QUERY_PROMPT_MARKER));
        assert!(!off.contains("creative_reframing"));

        let on = build_query_prompt(
            "Make a poster.",
            &QueryOptions {
                creative_reframing: true,
                ..Default::default()
            },
        );
        assert!(on.contains("creative_reframing"));
    }
}
