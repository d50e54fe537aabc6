//! SQLite-backed [`VectorStore`].
//!
//! The store is a single file (`store.sqlite`) inside the configured store
//! directory. Records carry their embedding as a little-endian `f32` BLOB;
//! search loads every vector and ranks them by brute-force cosine
//! similarity.
//!
//! The connection is opened lazily on first use. A query-side store whose
//! file does not exist fails with [`PipelineError::StoreUnavailable`] at
//! that point rather than at construction, so `docqa serve` can start
//! before the first ingestion and pick the store up once it exists.
//!
//! The embedding model used to build the store is recorded in
//! `store_meta`. Opening the store with a different model is rejected:
//! vectors from two models are not comparable.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use std::path::PathBuf;
use tokio::sync::OnceCell;

use docqa_core::embedding::{blob_to_vec, vec_to_blob};
use docqa_core::models::{EmbeddingRecord, RetrievedChunk};
use docqa_core::store::{top_k, VectorStore};

use crate::db;
use crate::error::PipelineError;
use crate::migrate;

const META_MODEL: &str = "embedding_model";
const META_DIMS: &str = "embedding_dims";

/// SQLite implementation of [`VectorStore`].
pub struct SqliteStore {
    path: PathBuf,
    create: bool,
    expected_model: Option<String>,
    pool: OnceCell<SqlitePool>,
}

/// Summary of a store's contents, shown by `docqa stats`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreStats {
    pub records: usize,
    pub sources: Vec<(String, usize)>,
    pub embedding_model: Option<String>,
    pub dims: Option<usize>,
}

impl SqliteStore {
    /// A store for ingestion: the file and schema are created on first use.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create: true,
            expected_model: None,
            pool: OnceCell::new(),
        }
    }

    /// A store for queries: the file must already exist.
    pub fn open_existing(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            create: false,
            expected_model: None,
            pool: OnceCell::new(),
        }
    }

    /// Reject the store on open if it was built with a different model.
    pub fn with_expected_model(mut self, model: impl Into<String>) -> Self {
        self.expected_model = Some(model.into());
        self
    }

    async fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .get_or_try_init(|| async {
                if !self.create && !self.path.exists() {
                    return Err(anyhow::Error::new(PipelineError::StoreUnavailable(
                        self.path.clone(),
                    )));
                }
                let pool = db::connect(&self.path, self.create).await?;
                migrate::run_migrations(&pool).await?;
                if let Some(expected) = &self.expected_model {
                    check_model(&pool, expected).await?;
                }
                tracing::debug!(path = %self.path.display(), "opened vector store");
                Ok::<_, anyhow::Error>(pool)
            })
            .await
    }

    /// Close the pool if it was opened. The last connection to close
    /// checkpoints the WAL back into the database file.
    pub async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
            tracing::debug!(path = %self.path.display(), "closed vector store");
        }
    }

    /// The embedding model and dimensionality recorded at ingestion.
    pub async fn embedding_model(&self) -> Result<Option<(String, usize)>> {
        let pool = self.pool().await?;
        read_model(pool).await
    }

    pub async fn stats(&self) -> Result<StoreStats> {
        let pool = self.pool().await?;
        let records = count_records(pool).await?;
        let rows = sqlx::query(
            "SELECT source, COUNT(*) AS n FROM records GROUP BY source ORDER BY source",
        )
        .fetch_all(pool)
        .await?;
        let sources: Vec<(String, usize)> = rows
            .iter()
            .map(|row| (row.get("source"), row.get::<i64, _>("n") as usize))
            .collect();
        let model = read_model(pool).await?;

        Ok(StoreStats {
            records,
            sources,
            embedding_model: model.as_ref().map(|(m, _)| m.clone()),
            dims: model.map(|(_, d)| d),
        })
    }

    async fn write(&self, replace: Option<&str>, records: &[EmbeddingRecord]) -> Result<usize> {
        let pool = self.pool().await?;
        let dims = match records.first() {
            Some(r) => r.vector.len(),
            None => 0,
        };
        if records.iter().any(|r| r.vector.len() != dims) {
            anyhow::bail!("records have inconsistent embedding dimensions");
        }
        if let Some((_, stored)) = read_model(pool).await? {
            if !records.is_empty() && stored != dims {
                return Err(PipelineError::InvalidConfig(format!(
                    "store holds {}-dimensional vectors but the embedding model produced {}",
                    stored, dims
                ))
                .into());
            }
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = pool.begin().await?;

        if let Some(source) = replace {
            let deleted = sqlx::query("DELETE FROM records WHERE source = ?")
                .bind(source)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            tracing::debug!(source, deleted, "replaced existing records");
        }

        for record in records {
            sqlx::query(
                r#"
                INSERT INTO records (id, source, page, chunk_index, text, hash,
                                     embedding, dims, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&record.id)
            .bind(&record.source)
            .bind(record.page.map(i64::from))
            .bind(record.chunk_index)
            .bind(&record.text)
            .bind(&record.hash)
            .bind(vec_to_blob(&record.vector))
            .bind(dims as i64)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        if !records.is_empty() {
            if let Some(model) = &self.expected_model {
                for (key, value) in [(META_MODEL, model.clone()), (META_DIMS, dims.to_string())] {
                    sqlx::query(
                        r#"
                        INSERT INTO store_meta (key, value) VALUES (?, ?)
                        ON CONFLICT(key) DO UPDATE SET value = excluded.value
                        "#,
                    )
                    .bind(key)
                    .bind(value)
                    .execute(&mut *tx)
                    .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(records.len())
    }
}

async fn read_model(pool: &SqlitePool) -> Result<Option<(String, usize)>> {
    let model: Option<String> = sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
        .bind(META_MODEL)
        .fetch_optional(pool)
        .await?;
    let dims: Option<String> = sqlx::query_scalar("SELECT value FROM store_meta WHERE key = ?")
        .bind(META_DIMS)
        .fetch_optional(pool)
        .await?;

    match (model, dims) {
        (Some(model), Some(dims)) => Ok(Some((model, dims.parse()?))),
        _ => Ok(None),
    }
}

async fn check_model(pool: &SqlitePool, expected: &str) -> Result<()> {
    if let Some((stored, _)) = read_model(pool).await? {
        if stored != expected {
            return Err(PipelineError::InvalidConfig(format!(
                "store was built with embedding model '{}' but '{}' is configured",
                stored, expected
            ))
            .into());
        }
    }
    Ok(())
}

async fn count_records(pool: &SqlitePool) -> Result<usize> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records")
        .fetch_one(pool)
        .await?;
    Ok(n as usize)
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn add(&self, records: &[EmbeddingRecord]) -> Result<usize> {
        self.write(None, records).await
    }

    async fn replace_source(&self, source: &str, records: &[EmbeddingRecord]) -> Result<usize> {
        self.write(Some(source), records).await
    }

    async fn count(&self) -> Result<usize> {
        count_records(self.pool().await?).await
    }

    async fn similarity_search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievedChunk>> {
        let pool = self.pool().await?;
        let rows = sqlx::query(
            "SELECT id, source, page, chunk_index, text, hash, embedding FROM records",
        )
        .fetch_all(pool)
        .await?;

        if rows.is_empty() {
            return Err(PipelineError::StoreUnavailable(self.path.clone()).into());
        }

        let records: Vec<EmbeddingRecord> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                EmbeddingRecord {
                    id: row.get("id"),
                    source: row.get("source"),
                    page: row.get::<Option<i64>, _>("page").map(|p| p as u32),
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    hash: row.get("hash"),
                    vector: blob_to_vec(&blob),
                }
            })
            .collect();

        if let Some(first) = records.first() {
            if first.vector.len() != query.len() {
                anyhow::bail!(
                    "query vector has {} dimensions but the store holds {}",
                    query.len(),
                    first.vector.len()
                );
            }
        }

        Ok(top_k(query, &records, k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, ErrorKind};

    fn record(id: &str, source: &str, index: i64, text: &str, vector: Vec<f32>) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.to_string(),
            source: source.to_string(),
            page: Some(1),
            chunk_index: index,
            text: text.to_string(),
            hash: docqa_core::chunk::hash_text(text),
            vector,
        }
    }

    fn store_file(dir: &tempfile::TempDir) -> PathBuf {
        dir.path().join("db").join("store.sqlite")
    }

    #[tokio::test]
    async fn test_missing_store_fails_on_first_query() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_existing(store_file(&dir));
        let err = store.similarity_search(&[1.0, 0.0], 3).await.unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Storage);
        assert!(!store_file(&dir).exists());
    }

    #[tokio::test]
    async fn test_close_checkpoints_wal() {
        let dir = tempfile::tempdir().unwrap();
        let file = store_file(&dir);
        let store = SqliteStore::create(&file);
        store
            .add(&[record("a", "doc.pdf", 0, "alpha", vec![1.0, 0.0])])
            .await
            .unwrap();
        store.close().await;

        let wal = file.with_extension("sqlite-wal");
        let wal_len = std::fs::metadata(&wal).map(|m| m.len()).unwrap_or(0);
        assert_eq!(wal_len, 0);

        let reader = SqliteStore::open_existing(&file);
        assert_eq!(reader.count().await.unwrap(), 1);
        reader.close().await;
    }

    #[tokio::test]
    async fn test_close_without_open_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open_existing(store_file(&dir));
        store.close().await;
        assert!(!store_file(&dir).exists());
    }

    #[tokio::test]
    async fn test_add_then_search_ranks_by_similarity() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::create(store_file(&dir)).with_expected_model("test-model");
        store
            .add(&[
                record("a", "doc.pdf", 0, "alpha", vec![1.0, 0.0]),
                record("b", "doc.pdf", 1, "beta", vec![0.0, 1.0]),
                record("c", "doc.pdf", 2, "mostly alpha", vec![0.9, 0.1]),
            ])
            .await
            .unwrap();

        let reader = SqliteStore::open_existing(store_file(&dir)).with_expected_model("test-model");
        assert_eq!(reader.count().await.unwrap(), 3);
        let hits = reader.similarity_search(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "alpha");
        assert_eq!(hits[1].text, "mostly alpha");
        assert_eq!(hits[0].page, Some(1));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_empty_store_is_unavailable_not_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::create(store_file(&dir));
        assert_eq!(store.count().await.unwrap(), 0);
        let err = store.similarity_search(&[1.0], 3).await.unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_append_and_replace_source() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::create(store_file(&dir));
        store
            .add(&[record("a", "one.pdf", 0, "old", vec![1.0])])
            .await
            .unwrap();
        store
            .add(&[record("b", "two.pdf", 0, "other", vec![1.0])])
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        store
            .replace_source(
                "one.pdf",
                &[
                    record("c", "one.pdf", 0, "new", vec![1.0]),
                    record("d", "one.pdf", 1, "newer", vec![1.0]),
                ],
            )
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.records, 3);
        assert_eq!(
            stats.sources,
            vec![("one.pdf".to_string(), 2), ("two.pdf".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_records_model_and_rejects_a_different_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::create(store_file(&dir)).with_expected_model("model-a");
        store
            .add(&[record("a", "doc.pdf", 0, "alpha", vec![1.0, 0.0, 0.0])])
            .await
            .unwrap();
        assert_eq!(
            store.embedding_model().await.unwrap(),
            Some(("model-a".to_string(), 3))
        );

        let other = SqliteStore::open_existing(store_file(&dir)).with_expected_model("model-b");
        let err = other.count().await.unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Configuration);
        assert!(err.to_string().contains("model-a"));
    }

    #[tokio::test]
    async fn test_rejects_dimension_change() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::create(store_file(&dir)).with_expected_model("m");
        store
            .add(&[record("a", "doc.pdf", 0, "alpha", vec![1.0, 0.0])])
            .await
            .unwrap();
        assert!(store
            .add(&[record("b", "doc.pdf", 1, "beta", vec![1.0, 0.0, 0.0])])
            .await
            .is_err());
        assert_eq!(store.count().await.unwrap(), 1);
    }
}
