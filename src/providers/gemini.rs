//! Google Gemini client for text and text+image generation.
//!
//! See: <https://ai.google.dev/api/generate-content>

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::traits::AdvisoryProvider;
use super::{DEFAULT_UPSTREAM_TIMEOUT, http_client, record_request, retry_after_header};
use crate::types::Prompt;
use crate::{KrishiError, Result};

/// Default base URL for the Generative Language API
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

const UPSTREAM: &str = "gemini";

/// Sampling settings sent with every request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    /// Default: 0.5.
    pub temperature: f32,
    /// Default: 1024.
    pub max_output_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            temperature: 0.5,
            max_output_tokens: 1024,
        }
    }
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    api_key: String,
    model: String,
    settings: GenerationSettings,
    http: Client,
    base_url: String,
}

impl GeminiClient {
    /// Create a client with the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client with a custom base URL (for testing with wiremock).
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::with_config(api_key, base_url, DEFAULT_UPSTREAM_TIMEOUT)
    }

    /// Create a client with a custom base URL and request timeout.
    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            settings: GenerationSettings::default(),
            http: http_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Use a different model.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override sampling settings.
    pub fn settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    async fn generate_inner(&self, prompt: &Prompt) -> Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );

        let mut parts = vec![Part::Text {
            text: prompt.text.as_str(),
        }];
        if let Some(image) = &prompt.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: image.mime_type.as_str(),
                    data: STANDARD.encode(&image.data),
                },
            });
        }

        let request = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: self.settings.temperature,
                max_output_tokens: self.settings.max_output_tokens,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(&response);
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status.as_u16(), &body, retry_after));
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed.into_text()
    }
}

/// Map a non-success response to the error taxonomy.
///
/// Quota exhaustion is reported as HTTP 429 and/or a `RESOURCE_EXHAUSTED`
/// status in the body; either is a rate limit.
fn classify_failure(status: u16, body: &str, retry_after: Option<Duration>) -> KrishiError {
    let detail: Option<ErrorBody> = serde_json::from_str(body).ok();
    let (api_status, message) = detail
        .map(|d| (d.error.status, d.error.message))
        .unwrap_or_default();

    if status == 429 || api_status == "RESOURCE_EXHAUSTED" {
        return KrishiError::RateLimited { retry_after };
    }
    match status {
        401 | 403 => KrishiError::Misconfigured {
            upstream: UPSTREAM,
            reason: format!("API key rejected ({status}): {message}"),
        },
        400 if message.contains("API key") => KrishiError::Misconfigured {
            upstream: UPSTREAM,
            reason: message,
        },
        _ => KrishiError::Unavailable(format!("Gemini API error ({status}): {message}")),
    }
}

#[async_trait]
impl AdvisoryProvider for GeminiClient {
    fn name(&self) -> &str {
        UPSTREAM
    }

    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let result = self.generate_inner(prompt).await;
        record_request(UPSTREAM, "generate", &result);
        result
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[derive(Deserialize)]
struct TextPart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    fn into_text(self) -> Result<String> {
        let text: String = self
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(KrishiError::Unavailable(
                "empty response from model".to_string(),
            ));
        }
        Ok(text)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}
