//! Test Helper Utilities
//!
//! Deterministic providers, a frozen clock and reply builders shared by the
//! integration tests.

#![allow(dead_code)]

use brieflow_ai::config::PipelineConfig;
use brieflow_ai::pipeline::query_analyzer::QUERY_PROMPT_MARKER;
use brieflow_ai::pipeline::synthesis::intent::DIRECTION_PROMPT_MARKER;
use brieflow_ai::pipeline::AnalysisPipeline;
use brieflow_ai::provider::{ProviderChain, ReasoningProvider, ScriptedProvider, ScriptedReply};
use brieflow_common::time::{FixedClock, SharedClock};
use chrono::{TimeZone, Utc};
use serde_json::json;
use std::sync::Arc;

/// Clock frozen at 2026-06-01T10:00:00Z
pub fn fixed_clock() -> SharedClock {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap()))
}

pub fn chain(providers: Vec<ScriptedProvider>) -> ProviderChain {
    ProviderChain::new(
        providers
            .into_iter()
            .map(|p| Arc::new(p) as Arc<dyn ReasoningProvider>)
            .collect(),
    )
}

/// Pipeline over scripted providers with default config and the fixed clock
pub fn pipeline(providers: Vec<ScriptedProvider>) -> AnalysisPipeline {
    AnalysisPipeline::new(chain(providers), PipelineConfig::default(), fixed_clock())
}

/// Stage 1 reply
pub fn query_reply(output_type: &str, confidence: f64, extra: serde_json::Value) -> String {
    let mut reply = json!({
        "intent": {
            "output_type": output_type,
            "confidence": confidence,
            "reasoning": format!("The request asks for {}", output_type),
        }
    });
    if let (Some(target), Some(fields)) = (reply.as_object_mut(), extra.as_object()) {
        for (key, value) in fields {
            target.insert(key.clone(), value.clone());
        }
    }
    reply.to_string()
}

/// Stage 2 reply for one asset
pub fn asset_reply(score: f64, role: &str, quality: f64, width: u32, height: u32) -> String {
    json!({
        "metadata": { "width": width, "height": height, "quality_score": quality },
        "content": {
            "description": format!("Clear footage suited to a {} role", role),
            "detected_elements": ["product"],
        },
        "alignment": { "score": score, "role": role, "contributions": ["establishes the product"] },
    })
    .to_string()
}

/// Prompt marker selecting the asset prompt for `asset_id`
pub fn asset_marker(asset_id: &str) -> String {
    format!("asset_id: {}\n", asset_id)
}

/// Provider answering query analysis with `query` and creative direction
/// with a fixed sentence
pub fn scripted(id: &str, query: String) -> ScriptedProvider {
    ScriptedProvider::new(id)
        .with_rule(DIRECTION_PROMPT_MARKER, ScriptedReply::text("Punchy cuts on the beat, warm grade."))
        .with_rule(QUERY_PROMPT_MARKER, ScriptedReply::text(query))
}
