//! Google Gemini generator

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::error::{DispatchError, Result};

use super::types::{Generated, GeneratedBlock, Generator, ResponseKind};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini `generateContent` client
pub struct GoogleGenerator {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl std::fmt::Debug for GoogleGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleGenerator")
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GoogleGenerator {
    pub fn new(
        api_key: String,
        model: String,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                DispatchError::GenerationFailure(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key,
            model,
            max_tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API host (proxies, tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, prompt: &str, kind: ResponseKind) -> Result<serde_json::Value> {
        let contents = vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart::Text {
                text: prompt.to_string(),
            }],
        }];

        let mut generation_config = serde_json::json!({
            "maxOutputTokens": self.max_tokens,
        });
        if kind == ResponseKind::Image {
            generation_config["responseModalities"] = serde_json::json!(["TEXT", "IMAGE"]);
        }

        Ok(serde_json::json!({
            "contents": serde_json::to_value(&contents)?,
            "generationConfig": generation_config,
        }))
    }

    /// Convert a Gemini response to provider-agnostic blocks
    fn from_gemini_response(resp: GeminiApiResponse) -> Result<Generated> {
        let candidate = resp.candidates.into_iter().next().ok_or_else(|| {
            let reason = resp
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates".to_string());
            DispatchError::GenerationFailure(format!("Gemini returned no content ({})", reason))
        })?;

        let content = candidate.content.ok_or_else(|| {
            DispatchError::GenerationFailure(format!(
                "Gemini candidate had no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        let mut blocks = Vec::with_capacity(content.parts.len());
        for part in content.parts {
            match part {
                GeminiPart::Text { text } => blocks.push(GeneratedBlock::Text(text)),
                GeminiPart::InlineData { inline_data } => {
                    let data = BASE64.decode(inline_data.data.as_bytes()).map_err(|e| {
                        DispatchError::GenerationFailure(format!(
                            "Invalid inline image data: {}",
                            e
                        ))
                    })?;
                    blocks.push(GeneratedBlock::Image {
                        mime_type: inline_data.mime_type,
                        data,
                    });
                }
            }
        }

        Ok(Generated { blocks })
    }
}

#[async_trait]
impl Generator for GoogleGenerator {
    fn provider_name(&self) -> &str {
        "google"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, kind: ResponseKind) -> Result<Generated> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = self.request_body(prompt, kind)?;

        debug!(
            "Gemini request: model={}, kind={}, prompt_chars={}",
            self.model,
            kind,
            prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                DispatchError::GenerationFailure(format!(
                    "Failed to send request to Gemini API: {}",
                    e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DispatchError::GenerationFailure(format!(
                "Gemini API request failed with status {}: {}",
                status, error_text
            )));
        }

        let api_response: GeminiApiResponse = response.json().await.map_err(|e| {
            DispatchError::GenerationFailure(format!("Failed to parse Gemini API response: {}", e))
        })?;

        debug!(
            "Gemini response: candidates={}",
            api_response.candidates.len()
        );

        Self::from_gemini_response(api_response)
    }
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: GeminiInlineData,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiInlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiApiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiPromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}
