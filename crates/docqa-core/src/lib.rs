//! # docqa core
//!
//! Runtime-agnostic logic shared by the `docqa` pipelines: the data model,
//! the recursive overlapping text splitter, the embedding/chat/store traits,
//! an in-memory store, prompt assembly, the chat transcript, and the
//! retrieval-augmented answer chain.
//!
//! This crate has no tokio, sqlx, HTTP, or filesystem dependencies. Concrete
//! providers and the on-disk store live in the `docqa` application crate.

pub mod chunk;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod rag;
pub mod store;
pub mod transcript;
