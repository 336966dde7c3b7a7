//! Vision-model client.
//!
//! Speaks the OpenAI-compatible chat completions protocol: one user message
//! holding the prompt and the image as a `data:` URL. Transient failures are
//! retried here so callers see exactly one logical call.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;

use crate::analysis::{UpstreamError, UpstreamKind};
use crate::config::AnalyzerConfig;
use crate::resilience::RetryPolicy;
use crate::upstream::transport_error;
use crate::validation::ValidatedImage;

/// Produces a free-text critique of an image. The text may embed JSON.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, image: &ValidatedImage, prompt: &str) -> Result<String, UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

pub struct OpenAiAnalyzer {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    retry: RetryPolicy,
}

impl OpenAiAnalyzer {
    /// Build from config. The API key is read from the configured environment
    /// variable; a missing key only fails when an analysis is attempted.
    pub fn new(config: &AnalyzerConfig) -> Result<Self, UpstreamError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        if api_key.is_none() {
            tracing::warn!(variable = %config.api_key_env, "Analyzer API key is not set");
        }
        Self::with_api_key(config, api_key)
    }

    pub fn with_api_key(config: &AnalyzerConfig, api_key: Option<String>) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::new(UpstreamKind::Generic, format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            retry: RetryPolicy {
                max_attempts: config.max_attempts,
                base_delay_ms: config.base_delay_ms,
                max_delay_ms: config.max_delay_ms,
            },
        })
    }

    async fn call_once(&self, api_key: &str, body: &serde_json::Value) -> Result<String, UpstreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &text));
        }

        let parsed: ChatResponse = response.json().await.map_err(transport_error)?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
    async fn analyze(&self, image: &ValidatedImage, prompt: &str) -> Result<String, UpstreamError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            UpstreamError::new(UpstreamKind::AuthConfig, "analyzer API key is not configured")
        })?;

        let data_url = format!("data:{};base64,{}", image.mime(), STANDARD.encode(image.bytes()));
        let body = json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "response_format": { "type": "json_object" },
            "max_tokens": self.max_tokens,
        });

        tracing::debug!(model = %self.model, image_bytes = image.len(), "Submitting image for analysis");
        let body = &body;
        self.retry
            .run("chat_completions", move || self.call_once(api_key, body))
            .await
    }
}

/// Classify a non-success HTTP answer from the model API.
fn status_error(status: u16, body: &str) -> UpstreamError {
    let kind = match status {
        401 | 403 => UpstreamKind::AuthConfig,
        429 => UpstreamKind::Quota,
        408 | 504 => UpstreamKind::Timeout,
        500..=599 => UpstreamKind::Generic,
        _ => match crate::analysis::classify_message(body) {
            UpstreamKind::Network => UpstreamKind::Generic,
            other => other,
        },
    };
    let snippet: String = body.chars().take(300).collect();
    UpstreamError::new(kind, format!("model API returned {status}: {snippet}")).with_status(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(status_error(401, "").kind, UpstreamKind::AuthConfig);
        assert_eq!(status_error(403, "").kind, UpstreamKind::AuthConfig);
        assert_eq!(status_error(429, "").kind, UpstreamKind::Quota);
        assert_eq!(status_error(504, "").kind, UpstreamKind::Timeout);
        assert_eq!(status_error(502, "").kind, UpstreamKind::Generic);
        assert_eq!(status_error(400, "You exceeded your current quota").kind, UpstreamKind::Quota);
        assert_eq!(status_error(400, "bad image").kind, UpstreamKind::Generic);
    }

    #[test]
    fn test_only_server_errors_are_transient() {
        assert!(status_error(503, "").is_transient());
        assert!(!status_error(400, "bad image").is_transient());
        assert!(!status_error(401, "").is_transient());
    }

    #[test]
    fn test_endpoint_join() {
        let config = AnalyzerConfig {
            api_base: "http://localhost:9/v1/".into(),
            ..AnalyzerConfig::default()
        };
        let analyzer = OpenAiAnalyzer::with_api_key(&config, None).unwrap();
        assert_eq!(analyzer.endpoint, "http://localhost:9/v1/chat/completions");
    }

    #[tokio::test]
    async fn test_missing_key_is_auth_config() {
        use crate::config::UploadConfig;
        use crate::validation::FileValidator;
        use crate::validation::image::fixtures::png;

        let image = FileValidator::new(UploadConfig::default())
            .validate_fetched(png(1, 1, 64), "image/png")
            .unwrap();
        let analyzer = OpenAiAnalyzer::with_api_key(&AnalyzerConfig::default(), None).unwrap();
        let err = analyzer.analyze(&image, "prompt").await.unwrap_err();
        assert_eq!(err.kind, UpstreamKind::AuthConfig);
    }
}
