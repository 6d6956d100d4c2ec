// OpenAI-compatible chat-completions provider
//
// Concept: One hosted (or local) reasoning model behind the uniform
// prompt-in/text-out contract
//
// Resolution: per-provider request timeout and rate limiting from the
// `[[providers]]` config entry; API key read from the environment variable
// the entry names

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, warn};

use super::{parse_http_error, GenerateOptions, ProviderError, ReasoningProvider};
use crate::config::ProviderEntry;
use brieflow_common::config::env_non_empty;
use brieflow_common::{Error, Result};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "is_empty")]
    stop: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, options: &'a GenerateOptions) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: options.max_output_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            stop: &options.stop_sequences,
            response_format: options.json_response.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }
}

fn is_empty(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions HTTP provider
pub struct OpenAiCompatibleProvider {
    id: String,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    /// Set when the configured key variable is missing
    missing_key_env: Option<String>,
    timeout: Duration,
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl OpenAiCompatibleProvider {
    /// Build a provider from its config entry
    pub fn from_entry(entry: &ProviderEntry) -> Result<Self> {
        let timeout = Duration::from_secs(entry.timeout_secs.max(1));
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| Error::Config(format!("HTTP client for {}: {}", entry.id, e)))?;

        let per_second = NonZeroU32::new(entry.requests_per_second).ok_or_else(|| {
            Error::Config(format!(
                "Provider {}: requests_per_second must be at least 1",
                entry.id
            ))
        })?;

        let (api_key, missing_key_env) = match &entry.api_key_env {
            Some(var) => match env_non_empty(var) {
                Some(key) => (Some(key), None),
                None => {
                    warn!(
                        provider = %entry.id,
                        env_var = %var,
                        "API key environment variable not set; provider will be skipped"
                    );
                    (None, Some(var.clone()))
                }
            },
            None => (None, None),
        };

        Ok(Self {
            id: entry.id.clone(),
            endpoint: entry.endpoint.clone(),
            model: entry.model.clone(),
            api_key,
            missing_key_env,
            timeout,
            client,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        })
    }

    fn malformed(&self, message: impl Into<String>) -> ProviderError {
        ProviderError::MalformedResponse {
            provider: self.id.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl ReasoningProvider for OpenAiCompatibleProvider {
    fn id(&self) -> &str {
        &self.id
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerateOptions,
    ) -> std::result::Result<String, ProviderError> {
        if let Some(var) = &self.missing_key_env {
            return Err(ProviderError::NotConfigured {
                provider: self.id.clone(),
                message: format!("environment variable {} not set", var),
            });
        }

        self.rate_limiter.until_ready().await;

        let body = ChatRequest::new(&self.model, prompt, options);

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout {
                    provider: self.id.clone(),
                    timeout: self.timeout,
                }
            } else {
                ProviderError::Network {
                    provider: self.id.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_http_error(status.as_u16(), &text, &self.id));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| self.malformed(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.malformed("response has no message content"))?;

        debug!(
            provider = %self.id,
            model = %self.model,
            response_chars = content.len(),
            "Chat completion received"
        );

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(api_key_env: Option<&str>) -> ProviderEntry {
        ProviderEntry {
            id: "hosted".to_string(),
            endpoint: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            model: "reasoner".to_string(),
            api_key_env: api_key_env.map(str::to_string),
            requests_per_second: 5,
            timeout_secs: 1,
            ..ProviderEntry::default()
        }
    }

    #[test]
    fn test_request_serialization_omits_empty_stop() {
        let options = GenerateOptions::creative();
        let value = serde_json::to_value(ChatRequest::new("m", "hi", &options)).unwrap();
        assert_eq!(value["messages"][0]["content"], "hi");
        assert_eq!(value["max_tokens"], 512);
        assert!(value.get("stop").is_none());
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_structured_requests_json_object() {
        let options = GenerateOptions::structured();
        let value = serde_json::to_value(ChatRequest::new("m", "hi", &options)).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert!(value["temperature"].as_f64().unwrap() < 0.2);
    }

    #[test]
    fn test_zero_rate_rejected() {
        let mut bad = entry(None);
        bad.requests_per_second = 0;
        assert!(OpenAiCompatibleProvider::from_entry(&bad).is_err());
    }

    #[tokio::test]
    async fn test_missing_key_env_is_not_configured() {
        std::env::remove_var("BRIEFLOW_TEST_UNSET_KEY_7781");
        let provider =
            OpenAiCompatibleProvider::from_entry(&entry(Some("BRIEFLOW_TEST_UNSET_KEY_7781")))
                .unwrap();
        let err = provider
            .generate("prompt", &GenerateOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
        assert_eq!(provider.id(), "hosted");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_provider_error() {
        let provider = OpenAiCompatibleProvider::from_entry(&entry(None)).unwrap();
        let result = provider.generate("prompt", &GenerateOptions::default()).await;
        assert!(result.is_err());
    }
}
