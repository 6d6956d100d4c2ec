//! Deterministic scripted provider
//!
//! Replies are selected by the first rule whose marker occurs in the prompt,
//! falling back to a default reply. Used for offline runs (`kind = "scripted"`
//! provider entries backed by a JSON script file) and for tests.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{GenerateOptions, ProviderError, ReasoningProvider};
use brieflow_common::{Error, Result};

/// Canned reply
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedReply {
    Text(String),
    /// Simulated provider outage
    Fail(String),
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }
}

/// Script file format
#[derive(Debug, Deserialize)]
struct ScriptFile {
    #[serde(default)]
    rules: Vec<ScriptRule>,
    #[serde(default)]
    default: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ScriptRule {
    marker: String,
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    fail: Option<String>,
}

/// Provider returning canned text keyed by prompt marker
#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    id: String,
    rules: Vec<(String, ScriptedReply)>,
    default: Option<ScriptedReply>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rules: Vec::new(),
            default: None,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply with `reply` whenever the prompt contains `marker`
    pub fn with_rule(mut self, marker: impl Into<String>, reply: ScriptedReply) -> Self {
        self.rules.push((marker.into(), reply));
        self
    }

    pub fn with_default(mut self, reply: ScriptedReply) -> Self {
        self.default = Some(reply);
        self
    }

    /// Sleep before answering (exercises caller timeouts)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Load rules from a JSON script file
    ///
    /// ```json
    /// { "rules": [{ "marker": "asset_id: hero", "reply": "{...}" }], "default": "{...}" }
    /// ```
    pub fn from_file(id: impl Into<String>, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read provider script failed ({}): {}", path.display(), e))
        })?;
        let script: ScriptFile = serde_json::from_str(&content).map_err(|e| {
            Error::Config(format!("Parse provider script failed ({}): {}", path.display(), e))
        })?;

        let mut provider = Self::new(id);
        for rule in script.rules {
            let reply = match (rule.reply, rule.fail) {
                (Some(text), None) => ScriptedReply::Text(text),
                (None, Some(message)) => ScriptedReply::Fail(message),
                _ => {
                    return Err(Error::Config(format!(
                        "Script rule '{}' must set exactly one of reply/fail",
                        rule.marker
                    )))
                }
            };
            provider.rules.push((rule.marker, reply));
        }
        provider.default = script.default.map(ScriptedReply::Text);
        Ok(provider)
    }

    /// Shared counter of `generate` calls
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    /// Prompts received so far, in call order
    pub fn received_prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn select(&self, prompt: &str) -> Option<&ScriptedReply> {
        self.rules
            .iter()
            .find(|(marker, _)| prompt.contains(marker.as_str()))
            .map(|(_, reply)| reply)
            .or(self.default.as_ref())
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerateOptions,
    ) -> std::result::Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.select(prompt) {
            Some(ScriptedReply::Text(text)) => Ok(text.clone()),
            Some(ScriptedReply::Fail(message)) => Err(ProviderError::Http {
                provider: self.id.clone(),
                status: 503,
                message: message.clone(),
            }),
            None => Err(ProviderError::NotConfigured {
                provider: self.id.clone(),
                message: "no scripted reply matches prompt".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_rule_selection_order() {
        let provider = ScriptedProvider::new("s")
            .with_rule("alpha", ScriptedReply::text("A"))
            .with_rule("beta", ScriptedReply::fail("beta down"))
            .with_default(ScriptedReply::text("default"));
        let opts = GenerateOptions::default();

        assert_eq!(provider.generate("alpha and beta", &opts).await.unwrap(), "A");
        assert!(provider.generate("only beta", &opts).await.is_err());
        assert_eq!(provider.generate("gamma", &opts).await.unwrap(), "default");
        assert_eq!(provider.call_counter().load(Ordering::SeqCst), 3);
        assert_eq!(provider.received_prompts()[2], "gamma");
    }

    #[tokio::test]
    async fn test_no_match_without_default() {
        let provider = ScriptedProvider::new("s");
        let err = provider
            .generate("anything", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_load_script_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"rules": [{{"marker": "hero", "reply": "{{\"ok\": true}}"}}, {{"marker": "broken", "fail": "offline"}}], "default": "fallback"}}"#
        )
        .unwrap();

        let provider = ScriptedProvider::from_file("offline", file.path()).unwrap();
        let opts = GenerateOptions::default();
        assert_eq!(provider.generate("hero shot", &opts).await.unwrap(), "{\"ok\": true}");
        assert!(provider.generate("broken", &opts).await.is_err());
        assert_eq!(provider.generate("other", &opts).await.unwrap(), "fallback");
    }

    #[test]
    fn test_script_rule_must_pick_one_reply() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"rules": [{{"marker": "x"}}]}}"#).unwrap();
        assert!(ScriptedProvider::from_file("s", file.path()).is_err());
    }
}
