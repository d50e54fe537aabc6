//! Core data models used throughout docqa.
//!
//! These types represent the chunks, stored embedding records, and retrieval
//! results that flow through the ingestion and query pipelines.

use serde::Serialize;

/// A contiguous span of one page's text, produced by [`crate::chunk`].
///
/// `start` and `end` are character offsets (not bytes) into the page text
/// the chunk was cut from, so `end - start` is the chunk length as measured
/// by the splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub id: String,
    /// Position of the chunk within its document, contiguous from 0.
    pub index: i64,
    /// 1-based page number for paged documents.
    pub page: Option<u32>,
    pub start: usize,
    pub end: usize,
    pub text: String,
    /// SHA-256 of `text`, hex encoded.
    pub hash: String,
}

impl Chunk {
    /// Length in characters.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A chunk paired with its embedding vector; the unit stored in and
/// retrieved from a [`crate::store::VectorStore`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    pub id: String,
    /// Source document path as given at ingestion time.
    pub source: String,
    pub page: Option<u32>,
    pub chunk_index: i64,
    pub text: String,
    pub hash: String,
    pub vector: Vec<f32>,
}

impl EmbeddingRecord {
    pub fn from_chunk(source: &str, chunk: &Chunk, vector: Vec<f32>) -> Self {
        Self {
            id: chunk.id.clone(),
            source: source.to_string(),
            page: chunk.page,
            chunk_index: chunk.index,
            text: chunk.text.clone(),
            hash: chunk.hash.clone(),
            vector,
        }
    }
}

/// One hit of a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub source: String,
    pub page: Option<u32>,
    pub chunk_index: i64,
    pub text: String,
    /// Cosine similarity to the query vector.
    pub score: f32,
}
