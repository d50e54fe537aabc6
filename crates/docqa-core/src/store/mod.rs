//! Storage abstraction for embedding records.
//!
//! The [`VectorStore`] trait is everything the ingestion and query
//! pipelines need from a store: append or replace records and run an exact
//! nearest-K search. The SQLite implementation lives in the app crate;
//! [`memory::InMemoryStore`] backs tests.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;

use crate::models::{EmbeddingRecord, RetrievedChunk};

/// Abstract vector store.
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`add`](VectorStore::add) | Append records |
/// | [`replace_source`](VectorStore::replace_source) | Swap all records of one source document |
/// | [`count`](VectorStore::count) | Number of stored records |
/// | [`similarity_search`](VectorStore::similarity_search) | Top-K by cosine similarity |
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append records, returning how many were written.
    async fn add(&self, records: &[EmbeddingRecord]) -> Result<usize>;

    /// Delete every record whose source is `source`, then insert `records`,
    /// atomically where the backend supports it.
    async fn replace_source(&self, source: &str, records: &[EmbeddingRecord]) -> Result<usize>;

    async fn count(&self) -> Result<usize>;

    /// Return at most `k` records ordered by descending cosine similarity.
    ///
    /// Searching a store with no records is an error, never an empty result.
    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>>;
}

/// Returned by stores that hold no records when asked to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmptyStoreError;

impl fmt::Display for EmptyStoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vector store is empty; ingest a document first")
    }
}

impl std::error::Error for EmptyStoreError {}

/// Rank `candidates` against `query` and keep the best `k`.
///
/// Shared by store implementations that search by brute force.
pub fn top_k<'a, I>(query: &[f32], candidates: I, k: usize) -> Vec<RetrievedChunk>
where
    I: IntoIterator<Item = &'a EmbeddingRecord>,
{
    let mut hits: Vec<RetrievedChunk> = candidates
        .into_iter()
        .map(|r| RetrievedChunk {
            source: r.source.clone(),
            page: r.page,
            chunk_index: r.chunk_index,
            text: r.text.clone(),
            score: crate::embedding::cosine_similarity(query, &r.vector),
        })
        .collect();

    hits.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    hits.truncate(k);
    hits
}
