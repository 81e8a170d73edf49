//! Client for the Gemini `generateContent` endpoint.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use brandmatch_core::AppConfig;
use serde::{Deserialize, Serialize};

use crate::error::AiError;
use crate::generator::{GenerationParams, TextGenerator};

/// Connection settings for [`GeminiClient`].
#[derive(Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    pub top_p: f32,
    pub top_k: u32,
}

impl std::fmt::Debug for GeminiSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiSettings")
            .field("api_key", &"[redacted]")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("top_p", &self.top_p)
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl GeminiSettings {
    /// Builds settings from the application config.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::NotConfigured`] when `GEMINI_API_KEY` is unset.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AiError> {
        let api_key = config
            .gemini_api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        Ok(Self {
            api_key,
            base_url: config.gemini_base_url.clone(),
            model: config.gemini_model.clone(),
            timeout_secs: config.ai_timeout_secs,
            top_p: config.ai_top_p,
            top_k: config.ai_top_k,
        })
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    url: String,
    settings: GeminiSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(settings: GeminiSettings) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            settings.base_url.trim_end_matches('/'),
            settings.model
        );
        Ok(Self {
            client,
            url,
            settings,
        })
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn transport_error(&self, err: reqwest::Error) -> AiError {
        if err.is_timeout() {
            AiError::Timeout {
                timeout_secs: self.settings.timeout_secs,
            }
        } else if err.is_connect() {
            AiError::Connect(err)
        } else {
            AiError::Http(err)
        }
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(
        &self,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: [RequestContent {
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens: params.max_output_tokens,
                temperature: params.temperature,
                top_p: self.settings.top_p,
                top_k: self.settings.top_k,
            },
        };
        let started = Instant::now();

        let response = self
            .client
            .post(&self.url)
            .header("x-goog-api-key", &self.settings.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;
        if !status.is_success() {
            tracing::warn!(
                model = %self.settings.model,
                status = status.as_u16(),
                "generateContent failed"
            );
            return Err(AiError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| AiError::Deserialize {
                context: format!("generateContent({})", self.settings.model),
                source: e,
            })?;
        let text = first_candidate_text(parsed)?;

        tracing::debug!(
            model = %self.settings.model,
            prompt_chars = prompt.len(),
            output_chars = text.len(),
            latency_ms = started.elapsed().as_millis(),
            "generateContent succeeded"
        );
        Ok(text)
    }
}

/// Returns the trimmed text of the first part of the first candidate.
fn first_candidate_text(response: GenerateResponse) -> Result<String, AiError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .map_or_else(
                || "no candidates returned".to_string(),
                |r| format!("prompt blocked: {r}"),
            );
        return Err(AiError::InvalidResponse(reason));
    };

    let text = candidate
        .content
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or_else(|| AiError::InvalidResponse("candidate has no text part".to_string()))?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AiError::InvalidResponse("candidate text is empty".to_string()));
    }
    Ok(trimmed.to_string())
}
