//! Hosted chat model clients.
//!
//! | Provider | Endpoint | Key |
//! |----------|----------|-----|
//! | [`OpenAiChat`] | `POST {base}/v1/chat/completions` | `OPENAI_API_KEY` (Bearer) |
//! | [`GeminiChat`] | `POST {base}/v1beta/models/{model}:generateContent` | `GOOGLE_API_KEY` (`x-goog-api-key`) |
//!
//! Both implement [`ChatModel`]: the given turns are sent in order, one
//! request per call, with no retry.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use docqa_core::llm::ChatModel;
use docqa_core::transcript::{Role, Turn};

use crate::config::ModelConfig;
use crate::credentials;
use crate::error::PipelineError;
use crate::http;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

// ============ OpenAI ============

pub struct OpenAiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiChat {
    pub fn new(
        model: impl Into<String>,
        temperature: f32,
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            client: http::client(timeout_secs)?,
            base_url: http::trim_base(base_url.unwrap_or(OPENAI_BASE_URL)),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, turns: &[Turn]) -> Result<String> {
        let messages: Vec<serde_json::Value> = turns
            .iter()
            .map(|t| json!({ "role": t.role.as_str(), "content": t.content }))
            .collect();
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages,
        });

        let request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);
        let response = http::send_json("OpenAI chat", request).await?;

        let text = response
            .pointer("/choices/0/message/content")
            .and_then(|c| c.as_str())
            .ok_or_else(|| {
                PipelineError::remote("OpenAI chat", "invalid response: missing message content")
            })?;
        Ok(text.to_string())
    }
}

// ============ Gemini ============

pub struct GeminiChat {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl GeminiChat {
    pub fn new(
        model: impl Into<String>,
        temperature: f32,
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            client: http::client(timeout_secs)?,
            base_url: http::trim_base(base_url.unwrap_or(GEMINI_BASE_URL)),
            api_key: api_key.into(),
            model: model.into(),
            temperature,
        })
    }
}

/// Build a `generateContent` request body. System turns are merged into
/// `systemInstruction`; assistant turns use Gemini's `model` role.
fn gemini_body(turns: &[Turn], temperature: f32) -> serde_json::Value {
    let system: Vec<&str> = turns
        .iter()
        .filter(|t| t.role == Role::System)
        .map(|t| t.content.as_str())
        .collect();
    let contents: Vec<serde_json::Value> = turns
        .iter()
        .filter(|t| t.role != Role::System)
        .map(|t| {
            let role = match t.role {
                Role::Assistant => "model",
                _ => "user",
            };
            json!({ "role": role, "parts": [{ "text": t.content }] })
        })
        .collect();

    let mut body = json!({
        "contents": contents,
        "generationConfig": { "temperature": temperature },
    });
    if !system.is_empty() {
        body["systemInstruction"] = json!({ "parts": [{ "text": system.join("\n\n") }] });
    }
    body
}

#[async_trait]
impl ChatModel for GeminiChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, turns: &[Turn]) -> Result<String> {
        let request = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&gemini_body(turns, self.temperature));
        let response = http::send_json("Gemini", request).await?;

        let parts = response
            .pointer("/candidates/0/content/parts")
            .and_then(|p| p.as_array())
            .ok_or_else(|| {
                let reason = response
                    .pointer("/promptFeedback/blockReason")
                    .and_then(|r| r.as_str())
                    .unwrap_or("missing candidates");
                PipelineError::remote("Gemini", format!("no content returned: {}", reason))
            })?;
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect();
        Ok(text)
    }
}

/// Create the chat model described by `config`.
///
/// # Errors
///
/// [`PipelineError::MissingCredential`] when the provider's key is not set.
pub fn create_chat_model(config: &ModelConfig) -> Result<Arc<dyn ChatModel>> {
    let key = credentials::provider_key(&config.provider, config.api_key_env.as_deref())?
        .unwrap_or_default();
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiChat::new(
            &config.model,
            config.temperature,
            key,
            config.base_url.as_deref(),
            config.timeout_secs,
        )?)),
        "gemini" => Ok(Arc::new(GeminiChat::new(
            &config.model,
            config.temperature,
            key,
            config.base_url.as_deref(),
            config.timeout_secs,
        )?)),
        other => bail!("Unknown chat provider: {}", other),
    }
}
