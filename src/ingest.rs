//! Ingestion pipeline.
//!
//! ```text
//! document ─▶ extract pages ─▶ split ─▶ embed (batched) ─▶ one write transaction
//! ```
//!
//! The credential check runs first so a misconfigured run does no work.
//! Embeddings are computed for the whole document before the store is
//! written, so a remote failure leaves the store untouched.

use anyhow::{Context, Result};
use std::path::PathBuf;

use docqa_core::chunk::RecursiveSplitter;
use docqa_core::embedding::EmbeddingProvider;
use docqa_core::models::{Chunk, EmbeddingRecord};
use docqa_core::store::VectorStore;

use crate::config::Config;
use crate::embedding::{create_provider, embed_in_batches};
use crate::error::PipelineError;
use crate::extract::extract_document;
use crate::sqlite_store::SqliteStore;

/// What one ingestion run did.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub source: String,
    pub pages: usize,
    pub chunks: usize,
    pub records_written: usize,
    pub replaced: bool,
    pub store_path: PathBuf,
}

/// Ingest `config.ingest.document` into the configured store.
pub async fn run_ingest(config: &Config) -> Result<IngestSummary> {
    let provider = create_provider(&config.embedding)?;
    let document = &config.ingest.document;
    let source = document.display().to_string();

    println!("ingest {}", source);
    let extracted = extract_document(document)?;
    println!("  pages: {}", extracted.page_count());

    let splitter =
        RecursiveSplitter::new(config.chunking.chunk_size, config.chunking.chunk_overlap)?;
    let chunks = splitter.split_pages(&extracted.pages);
    if chunks.is_empty() {
        return Err(PipelineError::EmptyDocument(document.clone()).into());
    }
    println!(
        "  chunks: {} (size {}, overlap {})",
        chunks.len(),
        splitter.chunk_size(),
        splitter.chunk_overlap()
    );

    let store = SqliteStore::create(config.store_file())
        .with_expected_model(provider.model_name());
    let written = embed_and_write(config, provider.as_ref(), &store, &source, &chunks).await;
    store.close().await;
    let written = written?;
    let replaced = config.ingest.replace_existing;
    tracing::info!(source = %source, written, replaced, "ingestion complete");

    let summary = IngestSummary {
        source,
        pages: extracted.page_count(),
        chunks: chunks.len(),
        records_written: written,
        replaced,
        store_path: config.store.path.clone(),
    };
    println!("  records written: {}", summary.records_written);
    println!("  store: {}", summary.store_path.display());
    println!("ok");
    Ok(summary)
}

async fn embed_and_write(
    config: &Config,
    provider: &dyn EmbeddingProvider,
    store: &SqliteStore,
    source: &str,
    chunks: &[Chunk],
) -> Result<usize> {
    // Opens the store and checks the recorded model before any remote call
    let existing = store.count().await?;
    tracing::debug!(existing, "store opened");

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = embed_in_batches(provider, &texts, config.embedding.batch_size)
        .await
        .context("failed to embed document chunks")?;
    println!("  embedded: {} ({})", vectors.len(), provider.model_name());

    let records: Vec<EmbeddingRecord> = chunks
        .iter()
        .zip(vectors)
        .map(|(chunk, vector)| EmbeddingRecord::from_chunk(source, chunk, vector))
        .collect();

    if config.ingest.replace_existing {
        store.replace_source(source, &records).await
    } else {
        store.add(&records).await
    }
}
