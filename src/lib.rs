//! # docqa
//!
//! Question answering over a document, in three pipelines:
//!
//! ```text
//! ┌──────────┐   ┌──────────────┐   ┌──────────────┐
//! │ document │──▶│ split+embed  │──▶│ store.sqlite │
//! └──────────┘   └──────────────┘   └──────┬───────┘
//!                                          │ top-K
//!                  ┌───────────────────────┤
//!                  ▼                       ▼
//!             ┌──────────┐           ┌──────────┐
//!             │ docqa ask│           │ POST /ask│
//!             └──────────┘           └──────────┘
//!
//! ┌────────────┐   transcript   ┌────────────┐
//! │ docqa chat │ ◀────────────▶ │ chat model │
//! └────────────┘                └────────────┘
//! ```
//!
//! Pure logic (splitting, prompt assembly, the answer chain, the
//! transcript) lives in `docqa-core`; this crate adds the hosted model
//! clients, the SQLite store, and the CLI surfaces.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`credentials`] | `.env` loading and API key lookup |
//! | [`error`] | Tagged pipeline errors |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`embedding`] | OpenAI and Ollama embedding providers |
//! | [`llm`] | OpenAI and Gemini chat models |
//! | [`http`] | Shared HTTP client and JSON request helper |
//! | [`sqlite_store`] | On-disk vector store |
//! | [`ingest`] | Ingestion pipeline |
//! | [`ask`] | Answer chain wiring and `docqa ask` |
//! | [`server`] | HTTP answer server |
//! | [`chat`] | Interactive terminal chat |
//! | [`stats`] | Store summary |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod ask;
pub mod chat;
pub mod config;
pub mod credentials;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod http;
pub mod ingest;
pub mod llm;
pub mod migrate;
pub mod server;
pub mod sqlite_store;
pub mod stats;
