//! Tagged pipeline errors.
//!
//! Every failure a user can act on is a [`PipelineError`]. The three
//! dispositions in docqa consume the same type and differ only in what they
//! do with it:
//!
//! | Disposition | Where | Handling |
//! |-------------|-------|----------|
//! | fatal | `docqa ingest`, `docqa ask`, startup | print the chain, exit non-zero |
//! | HTTP | `docqa serve` | map [`ErrorKind`] to a status and error code |
//! | displayed | `docqa chat` | format into the assistant reply |
//!
//! Plumbing code keeps using `anyhow::Result`; [`classify`] recovers the
//! tagged error from anywhere in an `anyhow` chain.

use std::path::PathBuf;

use docqa_core::store::EmptyStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{var} is not set; add it to the environment or to a .env file")]
    MissingCredential { var: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("document not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("no extractable text in {}", .0.display())]
    EmptyDocument(PathBuf),

    #[error("text extraction failed: {0}")]
    Extract(String),

    #[error("vector store at {} is missing or empty; run `docqa ingest` first", .0.display())]
    StoreUnavailable(PathBuf),

    #[error("{service} request failed: {detail}")]
    Remote { service: String, detail: String },
}

/// Coarse category of a [`PipelineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Input,
    Storage,
    Remote,
    /// Anything that is not a tagged pipeline error (I/O, SQL, bugs).
    Internal,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MissingCredential { .. } | PipelineError::InvalidConfig(_) => {
                ErrorKind::Configuration
            }
            PipelineError::DocumentNotFound(_)
            | PipelineError::EmptyDocument(_)
            | PipelineError::Extract(_) => ErrorKind::Input,
            PipelineError::StoreUnavailable(_) => ErrorKind::Storage,
            PipelineError::Remote { .. } => ErrorKind::Remote,
        }
    }

    pub fn remote(service: impl Into<String>, detail: impl ToString) -> Self {
        PipelineError::Remote {
            service: service.into(),
            detail: detail.to_string(),
        }
    }
}

/// Find the tagged error in an `anyhow` chain and return its kind.
///
/// An [`EmptyStoreError`] from the core crate counts as
/// [`ErrorKind::Storage`].
pub fn classify(err: &anyhow::Error) -> ErrorKind {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<PipelineError>() {
            return e.kind();
        }
        if cause.downcast_ref::<EmptyStoreError>().is_some() {
            return ErrorKind::Storage;
        }
    }
    ErrorKind::Internal
}

/// The result of one chat turn: the assistant text or the reason there is
/// none. Produced by the worker, consumed by the chat UI loop.
pub type Reply = Result<String, PipelineError>;

/// Collapse an `anyhow` error into a [`PipelineError`] for display, keeping
/// the tagged error when there is one.
pub fn into_pipeline_error(err: anyhow::Error, service: &str) -> PipelineError {
    match err.downcast::<PipelineError>() {
        Ok(tagged) => tagged,
        Err(other) => PipelineError::remote(service, format!("{:#}", other)),
    }
}
