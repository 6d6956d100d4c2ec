// Provider Chain
//
// Concept: Ordered fallback across interchangeable reasoning providers
// Synchronization: Used by every stage that needs a provider call; returns the
// text plus the id of the provider that served it
//
// Algorithm:
// 1. Resolve call order: preferred provider first (if named), then the
//    remaining providers in fixed configured order, each at most once
// 2. Call each provider under a bounded timeout
// 3. First non-empty response the caller can parse wins
// 4. Timeouts, empty and unparseable responses count as provider failures
// 5. When every attempt fails, report the last attempted provider and cause

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::{GenerateOptions, ModelPreference, ProviderError, ReasoningProvider};

/// Per-call policy supplied by the calling stage
#[derive(Debug, Clone)]
pub struct CallPolicy {
    pub preference: ModelPreference,
    /// Try remaining providers after a named preference fails
    ///
    /// `Auto` always walks the full order.
    pub fallback: bool,
    pub timeout: Duration,
}

impl CallPolicy {
    pub fn new(preference: ModelPreference, timeout: Duration) -> Self {
        Self {
            preference,
            fallback: true,
            timeout,
        }
    }

    pub fn with_fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Successful chain call
#[derive(Debug, Clone)]
pub struct ChainSuccess<T = String> {
    pub value: T,
    pub provider_id: String,
    /// Failures recovered by falling back, in attempt order
    pub failures: Vec<ProviderError>,
}

impl<T> ChainSuccess<T> {
    /// Total providers attempted, including the one that succeeded
    pub fn attempts(&self) -> usize {
        self.failures.len() + 1
    }
}

/// Chain call failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ChainError {
    #[error("no reasoning providers configured")]
    NoProviders,

    #[error("unknown provider in model preference: {0}")]
    UnknownProvider(String),

    #[error("all providers failed after {attempts} attempt(s); last provider {last_provider}: {cause}")]
    AllFailed {
        last_provider: String,
        cause: ProviderError,
        attempts: usize,
    },
}

/// Ordered list of providers with fallback
#[derive(Clone)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn ReasoningProvider>>,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.ids())
            .finish()
    }
}

impl ProviderChain {
    /// Build a chain; order is the fixed fallback order (most capable first)
    pub fn new(providers: Vec<Arc<dyn ReasoningProvider>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Verify that a named preference refers to a configured provider
    pub fn check_preference(&self, preference: &ModelPreference) -> Result<(), ChainError> {
        match preference {
            ModelPreference::Auto => Ok(()),
            ModelPreference::Named(id) => {
                if self.providers.iter().any(|p| p.id() == id) {
                    Ok(())
                } else {
                    Err(ChainError::UnknownProvider(id.clone()))
                }
            }
        }
    }

    /// Providers in call order for a preference, each listed once
    pub fn order(
        &self,
        preference: &ModelPreference,
    ) -> Result<Vec<Arc<dyn ReasoningProvider>>, ChainError> {
        self.check_preference(preference)?;

        let mut ordered: Vec<Arc<dyn ReasoningProvider>> = Vec::with_capacity(self.providers.len());
        if let ModelPreference::Named(id) = preference {
            if let Some(p) = self.providers.iter().find(|p| p.id() == id) {
                ordered.push(Arc::clone(p));
            }
        }
        for provider in &self.providers {
            if !ordered.iter().any(|p| p.id() == provider.id()) {
                ordered.push(Arc::clone(provider));
            }
        }
        Ok(ordered)
    }

    /// Run a prompt through the chain
    ///
    /// # Arguments
    /// * `prompt` - Fully formatted prompt
    /// * `options` - Sampling options forwarded unchanged to each provider
    /// * `policy` - Preference, fallback toggle and per-call timeout
    ///
    /// # Returns
    /// The first successful response, or the last failure when all attempts fail
    pub async fn execute(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        policy: &CallPolicy,
    ) -> Result<ChainSuccess, ChainError> {
        self.execute_parsed(prompt, options, policy, |text| Ok(text.to_string()))
            .await
    }

    /// Run a prompt and parse the response, falling back on unparseable output
    ///
    /// A response rejected by `parse` is recorded as a malformed-response
    /// failure for that provider and the next provider is tried.
    pub async fn execute_parsed<T, F>(
        &self,
        prompt: &str,
        options: &GenerateOptions,
        policy: &CallPolicy,
        parse: F,
    ) -> Result<ChainSuccess<T>, ChainError>
    where
        F: Fn(&str) -> Result<T, String>,
    {
        if self.providers.is_empty() {
            return Err(ChainError::NoProviders);
        }

        let order = self.order(&policy.preference)?;
        let limit = match policy.preference {
            ModelPreference::Auto => order.len(),
            ModelPreference::Named(_) if policy.fallback => order.len(),
            ModelPreference::Named(_) => 1,
        };

        let mut failures: Vec<ProviderError> = Vec::new();

        for provider in order.into_iter().take(limit) {
            let provider_id = provider.id().to_string();
            debug!(
                provider = %provider_id,
                prompt_chars = prompt.len(),
                "Calling reasoning provider"
            );

            let outcome = tokio::time::timeout(policy.timeout, provider.generate(prompt, options)).await;
            let error = match outcome {
                Ok(Ok(text)) if text.trim().is_empty() => ProviderError::MalformedResponse {
                    provider: provider_id.clone(),
                    message: "empty response".to_string(),
                },
                Ok(Ok(text)) => match parse(&text) {
                    Ok(value) => {
                        debug!(
                            provider = %provider_id,
                            response_chars = text.len(),
                            attempts = failures.len() + 1,
                            "Provider call succeeded"
                        );
                        return Ok(ChainSuccess {
                            value,
                            provider_id,
                            failures,
                        });
                    }
                    Err(message) => ProviderError::MalformedResponse {
                        provider: provider_id.clone(),
                        message,
                    },
                },
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout {
                    provider: provider_id.clone(),
                    timeout: policy.timeout,
                },
            };

            warn!(provider = %provider_id, error = %error, "Provider call failed");
            failures.push(error);
        }

        let attempts = failures.len();
        match failures.pop() {
            Some(cause) => Err(ChainError::AllFailed {
                last_provider: cause.provider().to_string(),
                cause,
                attempts,
            }),
            None => Err(ChainError::NoProviders),
        }
    }
}
