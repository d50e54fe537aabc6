//! API key lookup.
//!
//! Keys come from the process environment. A `.env` file in the working
//! directory is loaded once at startup by [`load_dotenv`]; variables already
//! set in the environment win over the file.

use crate::error::PipelineError;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const GOOGLE_API_KEY: &str = "GOOGLE_API_KEY";

/// Load `.env` from the working directory if one exists.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring unreadable .env: {}", e),
    }
}

/// Default key variable for a provider name.
pub fn default_key_var(provider: &str) -> Option<&'static str> {
    match provider {
        "openai" => Some(OPENAI_API_KEY),
        "gemini" => Some(GOOGLE_API_KEY),
        _ => None,
    }
}

/// Read `var`, treating an unset or blank value as missing.
pub fn require_key(var: &str) -> Result<String, PipelineError> {
    match std::env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(PipelineError::MissingCredential {
            var: var.to_string(),
        }),
    }
}

/// Resolve the key for `provider`, honouring an `api_key_env` override.
///
/// Providers without a key (e.g. a local Ollama server) resolve to `None`.
pub fn provider_key(
    provider: &str,
    api_key_env: Option<&str>,
) -> Result<Option<String>, PipelineError> {
    match api_key_env.or_else(|| default_key_var(provider)) {
        Some(var) => require_key(var).map(Some),
        None => Ok(None),
    }
}
