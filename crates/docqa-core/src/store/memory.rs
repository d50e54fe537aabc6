//! In-memory [`VectorStore`] implementation for tests.
//!
//! Records live in a `Vec` behind `std::sync::RwLock`; search is brute-force
//! cosine similarity over all of them.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{EmbeddingRecord, RetrievedChunk};

use super::{top_k, EmptyStoreError, VectorStore};

#[derive(Default)]
pub struct InMemoryStore {
    records: RwLock<Vec<EmbeddingRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<EmbeddingRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn add(&self, records: &[EmbeddingRecord]) -> Result<usize> {
        self.records.write().unwrap().extend_from_slice(records);
        Ok(records.len())
    }

    async fn replace_source(&self, source: &str, records: &[EmbeddingRecord]) -> Result<usize> {
        let mut stored = self.records.write().unwrap();
        stored.retain(|r| r.source != source);
        stored.extend_from_slice(records);
        Ok(records.len())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().unwrap().len())
    }

    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let stored = self.records.read().unwrap();
        if stored.is_empty() {
            return Err(EmptyStoreError.into());
        }
        Ok(top_k(query, stored.iter(), k))
    }
}
