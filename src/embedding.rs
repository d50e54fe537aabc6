//! Embedding provider implementations.
//!
//! - **[`OpenAIProvider`]** calls `POST {base}/v1/embeddings`.
//! - **[`OllamaProvider`]** calls a local Ollama server at `POST {base}/api/embed`.
//!
//! Both send one request per batch and fail on the first error. Use
//! [`create_provider`] to build the configured one and [`embed_in_batches`]
//! to embed a whole document.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::Arc;

use docqa_core::embedding::EmbeddingProvider;

use crate::config::EmbeddingConfig;
use crate::credentials;
use crate::error::PipelineError;
use crate::http;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434";

// ============ OpenAI Provider ============

pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAIProvider {
    pub fn new(
        model: impl Into<String>,
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            client: http::client(timeout_secs)?,
            base_url: http::trim_base(base_url.unwrap_or(OPENAI_BASE_URL)),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let request = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body);
        let json = http::send_json("OpenAI embeddings", request).await?;
        let vectors = parse_openai_response(&json)?;
        check_count(texts.len(), vectors.len())?;
        Ok(vectors)
    }
}

/// Extract `data[].embedding`, ordered by `data[].index` when present.
fn parse_openai_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, PipelineError> {
    let invalid = |what: &str| {
        PipelineError::remote("OpenAI embeddings", format!("invalid response: {}", what))
    };
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| invalid("missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| invalid("missing embedding"))?;
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        indexed.push((index, to_f32(embedding)));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

// ============ Ollama Provider ============

pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaProvider {
    pub fn new(
        model: impl Into<String>,
        base_url: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        Ok(Self {
            client: http::client(timeout_secs)?,
            base_url: http::trim_base(base_url.unwrap_or(OLLAMA_BASE_URL)),
            model: model.into(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });
        let request = self
            .client
            .post(format!("{}/api/embed", self.base_url))
            .json(&body);
        let json = http::send_json("Ollama embeddings", request).await?;
        let vectors: Vec<Vec<f32>> = json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                PipelineError::remote("Ollama embeddings", "invalid response: missing embeddings")
            })?
            .iter()
            .map(|v| v.as_array().map(|a| to_f32(a)).unwrap_or_default())
            .collect();
        check_count(texts.len(), vectors.len())?;
        Ok(vectors)
    }
}

fn to_f32(values: &[serde_json::Value]) -> Vec<f32> {
    values
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect()
}

fn check_count(expected: usize, got: usize) -> Result<(), PipelineError> {
    if expected != got {
        return Err(PipelineError::remote(
            "embeddings",
            format!("expected {} vectors, got {}", expected, got),
        ));
    }
    Ok(())
}

/// Create the configured [`EmbeddingProvider`].
///
/// | Config Value | Provider | Key |
/// |-------------|----------|-----|
/// | `"openai"` | [`OpenAIProvider`] | `OPENAI_API_KEY` |
/// | `"ollama"` | [`OllamaProvider`] | none |
///
/// # Errors
///
/// [`PipelineError::MissingCredential`] when the provider needs a key that
/// is not set.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    let key = credentials::provider_key(&config.provider, config.api_key_env.as_deref())?;
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIProvider::new(
            &config.model,
            key.unwrap_or_default(),
            config.base_url.as_deref(),
            config.timeout_secs,
        )?)),
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            &config.model,
            config.base_url.as_deref(),
            config.timeout_secs,
        )?)),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

/// Embed `texts` in batches of at most `batch_size`, preserving order.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> Result<Vec<Vec<f32>>> {
    let mut vectors = Vec::with_capacity(texts.len());
    for (i, batch) in texts.chunks(batch_size.max(1)).enumerate() {
        tracing::debug!(batch = i, size = batch.len(), "embedding batch");
        vectors.extend(provider.embed(batch).await?);
    }
    Ok(vectors)
}
