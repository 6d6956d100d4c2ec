//! Reasoning provider gateway
//!
//! A reasoning provider turns a fully formatted prompt into text. Providers
//! never retry; the ordered fallback policy lives in [`ProviderChain`].
//!
//! - [`OpenAiCompatibleProvider`]: hosted/local chat-completions endpoints
//! - [`ScriptedProvider`]: deterministic canned responses (offline runs, tests)

pub mod chain;
pub mod json_extract;
pub mod openai_compatible;
pub mod scripted;

pub use chain::{CallPolicy, ChainError, ChainSuccess, ProviderChain};
pub use json_extract::extract_json_object;
pub use openai_compatible::OpenAiCompatibleProvider;
pub use scripted::{ScriptedProvider, ScriptedReply};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::{ProviderEntry, ProviderKind};

/// Provider call failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    #[error("{provider}: request timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("{provider}: rate limited: {message}")]
    RateLimited { provider: String, message: String },

    #[error("{provider}: authentication failed: {message}")]
    Authentication { provider: String, message: String },

    #[error("{provider}: HTTP {status}: {message}")]
    Http {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider}: network error: {message}")]
    Network { provider: String, message: String },

    #[error("{provider}: malformed response: {message}")]
    MalformedResponse { provider: String, message: String },

    #[error("{provider}: not configured: {message}")]
    NotConfigured { provider: String, message: String },
}

impl ProviderError {
    /// Id of the provider that failed
    pub fn provider(&self) -> &str {
        match self {
            Self::Timeout { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Authentication { provider, .. }
            | Self::Http { provider, .. }
            | Self::Network { provider, .. }
            | Self::MalformedResponse { provider, .. }
            | Self::NotConfigured { provider, .. } => provider,
        }
    }
}

/// Map an HTTP error status onto a provider error
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> ProviderError {
    let provider = provider.to_string();
    match status {
        401 => ProviderError::Authentication {
            provider,
            message: "invalid API key".to_string(),
        },
        403 => ProviderError::Authentication {
            provider,
            message: "access denied".to_string(),
        },
        429 => ProviderError::RateLimited {
            provider,
            message: body.to_string(),
        },
        _ => ProviderError::Http {
            provider,
            status,
            message: body.to_string(),
        },
    }
}

/// Sampling options passed with every prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(default)]
    pub stop_sequences: Vec<String>,
    /// Ask the provider to constrain its reply to a JSON object
    #[serde(default)]
    pub json_response: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            max_output_tokens: 2048,
            temperature: 0.2,
            top_p: 0.95,
            stop_sequences: Vec::new(),
            json_response: false,
        }
    }
}

impl GenerateOptions {
    /// Low-temperature options for structured JSON extraction
    pub fn structured() -> Self {
        Self {
            temperature: 0.1,
            json_response: true,
            ..Self::default()
        }
    }

    /// Warmer options for free-text creative writing
    pub fn creative() -> Self {
        Self {
            max_output_tokens: 512,
            temperature: 0.8,
            top_p: 0.9,
            stop_sequences: Vec::new(),
            json_response: false,
        }
    }
}

/// Uniform prompt-in/text-out capability
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Stable provider id
    fn id(&self) -> &str;

    /// Generate text for a fully formatted prompt
    ///
    /// Must not panic; every failure is returned as a [`ProviderError`].
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<String, ProviderError>;
}

/// Which provider a stage should try first
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum ModelPreference {
    /// Fixed provider order, most capable first
    #[default]
    Auto,
    /// A specific provider id, then the remaining ones as fallback
    Named(String),
}

impl ModelPreference {
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            Self::Auto
        } else {
            Self::Named(trimmed.to_string())
        }
    }
}

impl fmt::Display for ModelPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Named(id) => f.write_str(id),
        }
    }
}

impl Serialize for ModelPreference {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelPreference {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Build the provider chain from config entries, preserving their order
pub fn build_chain(entries: &[ProviderEntry]) -> brieflow_common::Result<ProviderChain> {
    let mut providers: Vec<Arc<dyn ReasoningProvider>> = Vec::with_capacity(entries.len());
    for entry in entries {
        let provider: Arc<dyn ReasoningProvider> = match entry.kind {
            ProviderKind::OpenaiCompatible => Arc::new(OpenAiCompatibleProvider::from_entry(entry)?),
            ProviderKind::Scripted => {
                let path = entry.script.as_deref().ok_or_else(|| {
                    brieflow_common::Error::Config(format!(
                        "Provider {}: scripted providers need a script file",
                        entry.id
                    ))
                })?;
                Arc::new(ScriptedProvider::from_file(entry.id.clone(), path)?)
            }
        };
        info!(provider = %entry.id, kind = ?entry.kind, "Registered reasoning provider");
        providers.push(provider);
    }
    Ok(ProviderChain::new(providers))
}
