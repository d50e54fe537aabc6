//! TOML configuration.
//!
//! Every field has a default, so docqa runs without a config file:
//!
//! ```toml
//! [store]
//! path = "./db"
//!
//! [ingest]
//! document = "document.pdf"
//! replace_existing = false
//!
//! [chunking]
//! chunk_size = 1000
//! chunk_overlap = 200
//!
//! [embedding]
//! provider = "openai"            # openai | ollama
//! model = "text-embedding-ada-002"
//! batch_size = 64
//!
//! [retrieval]
//! k = 3
//!
//! [answer]
//! provider = "openai"            # openai | gemini
//! model = "gpt-4o"
//! temperature = 0.0
//!
//! [chat]
//! provider = "gemini"
//! model = "gemini-pro"
//! temperature = 0.7
//!
//! [server]
//! bind = "0.0.0.0:8000"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use docqa_core::chunk::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use docqa_core::prompt::PromptTemplate;
use docqa_core::rag::DEFAULT_TOP_K;

use crate::error::PipelineError;

/// Config file picked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "./docqa.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub ingest: IngestConfig,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub answer: ModelConfig,
    pub chat: ChatConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Directory holding the on-disk vector store.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    #[serde(default = "default_document")]
    pub document: PathBuf,
    /// Replace records previously ingested from the same document instead
    /// of appending.
    #[serde(default)]
    pub replace_existing: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            document: default_document(),
            replace_existing: false,
        }
    }
}

fn default_document() -> PathBuf {
    PathBuf::from("document.pdf")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Override the provider's API base URL.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key. Defaults per provider.
    #[serde(default)]
    pub api_key_env: Option<String>,
    /// Request timeout. Unset means the HTTP client's default.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            batch_size: default_batch_size(),
            base_url: None,
            api_key_env: None,
            timeout_secs: None,
        }
    }
}

fn default_embedding_provider() -> String {
    "openai".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-ada-002".to_string()
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

fn default_k() -> usize {
    DEFAULT_TOP_K
}

/// A hosted chat model. Used as `[answer]` (the RAG answer model) and,
/// flattened, inside `[chat]`.
#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    #[serde(default = "default_answer_provider")]
    pub provider: String,
    #[serde(default = "default_answer_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Custom answer template; must contain `{context}` and `{question}`.
    #[serde(default)]
    pub template: Option<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: default_answer_provider(),
            model: default_answer_model(),
            temperature: 0.0,
            base_url: None,
            api_key_env: None,
            timeout_secs: None,
            template: None,
        }
    }
}

fn default_answer_provider() -> String {
    "openai".to_string()
}
fn default_answer_model() -> String {
    "gpt-4o".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    #[serde(default = "default_chat_provider")]
    pub provider: String,
    #[serde(default = "default_chat_model")]
    pub model: String,
    #[serde(default = "default_chat_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Optional system instruction placed before the greeting.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_chat_provider(),
            model: default_chat_model(),
            temperature: default_chat_temperature(),
            base_url: None,
            api_key_env: None,
            timeout_secs: None,
            greeting: default_greeting(),
            system_prompt: None,
        }
    }
}

impl ChatConfig {
    /// View the model settings as a [`ModelConfig`] for client construction.
    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            provider: self.provider.clone(),
            model: self.model.clone(),
            temperature: self.temperature,
            base_url: self.base_url.clone(),
            api_key_env: self.api_key_env.clone(),
            timeout_secs: self.timeout_secs,
            template: None,
        }
    }
}

fn default_chat_provider() -> String {
    "gemini".to_string()
}
fn default_chat_model() -> String {
    "gemini-pro".to_string()
}
fn default_chat_temperature() -> f32 {
    0.7
}
fn default_greeting() -> String {
    "Hello! I'm a Gemini-powered AI assistant. How can I help you today?".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

impl Config {
    /// Path of the SQLite file inside the store directory.
    pub fn store_file(&self) -> PathBuf {
        self.store.path.join("store.sqlite")
    }

    /// The answer template, parsed.
    pub fn answer_template(&self) -> Result<PromptTemplate> {
        match &self.answer.template {
            Some(t) => PromptTemplate::parse(t),
            None => Ok(PromptTemplate::default()),
        }
    }
}

/// Load configuration.
///
/// With an explicit `path` the file must exist. Without one,
/// [`DEFAULT_CONFIG_PATH`] is used if present and built-in defaults
/// otherwise.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(p) => parse_file(p)?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            parse_file(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => Config::default(),
    };
    validate(&config).map_err(|e| PipelineError::InvalidConfig(format!("{:#}", e)))?;
    Ok(config)
}

fn parse_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: Config = toml::from_str(&content).map_err(|e| {
        PipelineError::InvalidConfig(format!("{}: {}", path.display(), e.message()))
    })?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }
    if config.retrieval.k < 1 {
        anyhow::bail!("retrieval.k must be >= 1");
    }
    if config.embedding.batch_size < 1 {
        anyhow::bail!("embedding.batch_size must be >= 1");
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai or ollama.",
            other
        ),
    }

    for (section, provider, temperature) in [
        ("answer", &config.answer.provider, config.answer.temperature),
        ("chat", &config.chat.provider, config.chat.temperature),
    ] {
        match provider.as_str() {
            "openai" | "gemini" => {}
            other => anyhow::bail!(
                "Unknown {} provider: '{}'. Must be openai or gemini.",
                section,
                other
            ),
        }
        if !(0.0..=2.0).contains(&temperature) {
            anyhow::bail!("{}.temperature must be in [0.0, 2.0]", section);
        }
    }

    config.answer_template()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_src: &str) -> Result<Config> {
        let config: Config = toml::from_str(toml_src)?;
        validate(&config)?;
        Ok(config)
    }

    #[test]
    fn test_defaults_match_built_in_pipeline() {
        let config = parse("").unwrap();
        assert_eq!(config.store.path, PathBuf::from("./db"));
        assert_eq!(config.ingest.document, PathBuf::from("document.pdf"));
        assert_eq!(config.chunking.chunk_size, 1000);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.embedding.model, "text-embedding-ada-002");
        assert_eq!(config.retrieval.k, 3);
        assert_eq!(config.answer.model, "gpt-4o");
        assert_eq!(config.answer.temperature, 0.0);
        assert_eq!(config.chat.provider, "gemini");
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.store_file(), PathBuf::from("./db/store.sqlite"));
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = parse("[chunking]\nchunk_size = 500\n\n[retrieval]\nk = 5\n").unwrap();
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_overlap, 200);
        assert_eq!(config.retrieval.k, 5);
        assert_eq!(config.embedding.batch_size, 64);
    }

    #[test]
    fn test_rejects_overlap_not_smaller_than_size() {
        let err = parse("[chunking]\nchunk_size = 100\nchunk_overlap = 100\n").unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_rejects_unknown_providers_and_bad_temperature() {
        assert!(parse("[embedding]\nprovider = \"magic\"\n").is_err());
        assert!(parse("[answer]\nprovider = \"magic\"\n").is_err());
        assert!(parse("[chat]\ntemperature = 3.5\n").is_err());
    }

    #[test]
    fn test_rejects_template_without_placeholders() {
        assert!(parse("[answer]\ntemplate = \"no placeholders\"\n").is_err());
        assert!(parse("[answer]\ntemplate = \"{context} / {question}\"\n").is_ok());
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let err = load_config(Some(Path::new("/nonexistent/docqa.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
