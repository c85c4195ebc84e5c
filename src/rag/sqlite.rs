//! SQLite-backed RAG store implementation.
//!
//! SQLite holds chunk text, metadata and embeddings; search is brute-force
//! cosine similarity over the stored vectors. Rows are ordered by `seq`, the
//! rowid, which upserts preserve.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::error::RetrievalError;
use super::store::{checked_query, checked_vector, validate_k, KnowledgeChunk, RagStore, RankedResult};
use crate::core::config::AppPaths;
use crate::vector_math::rank_descending_by_cosine;

pub struct SqliteRagStore {
    pool: SqlitePool,
    /// Serializes the read-check-write sequence of an upsert.
    write_lock: Mutex<()>,
}

impl SqliteRagStore {
    pub async fn new(paths: &AppPaths) -> Result<Self, RetrievalError> {
        Self::with_path(paths.rag_db_path.clone()).await
    }

    pub async fn with_path(db_path: PathBuf) -> Result<Self, RetrievalError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(RetrievalError::store)?;

        let store = Self {
            pool,
            write_lock: Mutex::new(()),
        };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), RetrievalError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_chunks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                chunk_id TEXT NOT NULL UNIQUE,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL,
                dimension INTEGER NOT NULL,
                created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RetrievalError::store)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS rag_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(RetrievalError::store)?;

        Ok(())
    }

    fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
        embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect()
    }

    fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> KnowledgeChunk {
        let metadata_str: String = row.get("metadata");
        let metadata =
            serde_json::from_str::<BTreeMap<String, String>>(&metadata_str).unwrap_or_default();
        let embedding: Vec<u8> = row.get("embedding");

        KnowledgeChunk {
            id: row.get("chunk_id"),
            text: row.get("content"),
            metadata,
            vector: Some(Self::deserialize_embedding(&embedding)),
        }
    }

    async fn corpus_dimension_excluding(&self, chunk_id: &str) -> Result<Option<usize>, RetrievalError> {
        let dimension: Option<i64> = sqlx::query_scalar(
            "SELECT dimension FROM rag_chunks WHERE chunk_id != ?1 ORDER BY seq LIMIT 1",
        )
        .bind(chunk_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RetrievalError::store)?;

        Ok(dimension.map(|d| d as usize))
    }
}

#[async_trait]
impl RagStore for SqliteRagStore {
    async fn upsert(&self, mut chunk: KnowledgeChunk) -> Result<String, RetrievalError> {
        if chunk.id.trim().is_empty() {
            chunk.id = Uuid::new_v4().to_string();
        }

        let _guard = self.write_lock.lock().await;
        let dimension = self.corpus_dimension_excluding(&chunk.id).await?;
        let vector = checked_vector(&chunk, dimension)?;

        let blob = Self::serialize_embedding(&vector);
        let metadata_str = serde_json::to_string(&chunk.metadata).map_err(RetrievalError::store)?;

        sqlx::query(
            "INSERT INTO rag_chunks (chunk_id, content, metadata, embedding, dimension)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(chunk_id) DO UPDATE SET
                content = excluded.content,
                metadata = excluded.metadata,
                embedding = excluded.embedding,
                dimension = excluded.dimension",
        )
        .bind(&chunk.id)
        .bind(&chunk.text)
        .bind(&metadata_str)
        .bind(&blob)
        .bind(vector.len() as i64)
        .execute(&self.pool)
        .await
        .map_err(RetrievalError::store)?;

        Ok(chunk.id)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RankedResult>, RetrievalError> {
        validate_k(k)?;

        let rows = sqlx::query(
            "SELECT chunk_id, content, metadata, embedding
             FROM rag_chunks
             ORDER BY seq",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RetrievalError::store)?;
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let chunks: Vec<KnowledgeChunk> = rows.iter().map(Self::row_to_chunk).collect();
        let dimension = chunks[0].vector.as_ref().map(Vec::len);
        checked_query(vector, dimension)?;
        let ranked = rank_descending_by_cosine(
            vector,
            chunks
                .iter()
                .map(|chunk| chunk.vector.as_deref().unwrap_or(&[])),
        );

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| RankedResult {
                chunk: chunks[idx].clone(),
                score,
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<KnowledgeChunk>, RetrievalError> {
        let row = sqlx::query(
            "SELECT chunk_id, content, metadata, embedding
             FROM rag_chunks
             WHERE chunk_id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RetrievalError::store)?;

        Ok(row.as_ref().map(Self::row_to_chunk))
    }

    async fn delete(&self, id: &str) -> Result<bool, RetrievalError> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM rag_chunks WHERE chunk_id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RetrievalError::store)?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear(&self) -> Result<(), RetrievalError> {
        let _guard = self.write_lock.lock().await;
        sqlx::query("DELETE FROM rag_chunks")
            .execute(&self.pool)
            .await
            .map_err(RetrievalError::store)?;

        Ok(())
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rag_chunks")
            .fetch_one(&self.pool)
            .await
            .map_err(RetrievalError::store)?;

        Ok(count as usize)
    }

    async fn embedding_model(&self) -> Result<Option<String>, RetrievalError> {
        sqlx::query_scalar("SELECT value FROM rag_meta WHERE key = 'embedding_model'")
            .fetch_optional(&self.pool)
            .await
            .map_err(RetrievalError::store)
    }

    async fn set_embedding_model(&self, model_id: &str) -> Result<(), RetrievalError> {
        sqlx::query(
            "INSERT OR REPLACE INTO rag_meta (key, value, updated_at)
             VALUES ('embedding_model', ?1, STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))",
        )
        .bind(model_id)
        .execute(&self.pool)
        .await
        .map_err(RetrievalError::store)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteRagStore {
        let tmp = std::env::temp_dir().join(format!(
            "ragbot-rag-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        SqliteRagStore::with_path(tmp).await.unwrap()
    }

    fn make_chunk(id: &str, content: &str, vector: Vec<f32>) -> KnowledgeChunk {
        KnowledgeChunk::new(content)
            .with_id(id)
            .with_vector(vector)
            .with_metadata("source", "test")
    }

    #[tokio::test]
    async fn upsert_and_query() {
        let store = test_store().await;

        let embedding = vec![1.0, 0.0, 0.0];
        store
            .upsert(make_chunk("c1", "Hello world", embedding.clone()))
            .await
            .unwrap();
        assert_eq!(store.count().await.unwrap(), 1);

        let results = store.query(&embedding, 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "c1");
        assert_eq!(results[0].chunk.metadata.get("source").map(String::as_str), Some("test"));
        assert!(results[0].score > 0.99);
    }

    #[tokio::test]
    async fn reupsert_keeps_insertion_order_for_ties() {
        let store = test_store().await;

        store.upsert(make_chunk("c1", "first", vec![1.0, 0.0])).await.unwrap();
        store.upsert(make_chunk("c2", "second", vec![2.0, 0.0])).await.unwrap();
        store.upsert(make_chunk("c1", "first, edited", vec![3.0, 0.0])).await.unwrap();

        let results = store.query(&[1.0, 0.0], 5).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(results[0].chunk.text, "first, edited");
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn rejects_dimension_mismatch() {
        let store = test_store().await;

        store.upsert(make_chunk("c1", "a", vec![1.0, 0.0])).await.unwrap();
        let err = store
            .upsert(make_chunk("c2", "b", vec![1.0, 0.0, 0.0]))
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }

    #[tokio::test]
    async fn query_with_wrong_dimension_is_an_embedding_error() {
        let store = test_store().await;

        store.upsert(make_chunk("c1", "a", vec![1.0, 0.0])).await.unwrap();
        store.upsert(make_chunk("c2", "b", vec![0.0, 1.0])).await.unwrap();

        let err = store.query(&[0.0, 1.0, 0.0], 1).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
        assert_eq!(store.query(&[0.0, 1.0], 1).await.unwrap()[0].chunk.id, "c2");
    }

    #[tokio::test]
    async fn clear_keeps_embedding_model_record() {
        let store = test_store().await;

        assert_eq!(store.embedding_model().await.unwrap(), None);
        store.set_embedding_model("remote:text-embedding-004").await.unwrap();
        store.upsert(make_chunk("c1", "data", vec![1.0])).await.unwrap();

        store.clear().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.query(&[1.0], 3).await.unwrap().is_empty());
        assert_eq!(
            store.embedding_model().await.unwrap().as_deref(),
            Some("remote:text-embedding-004")
        );
    }

    #[tokio::test]
    async fn get_and_delete() {
        let store = test_store().await;

        store.upsert(make_chunk("c1", "Rust memory safety", vec![1.0])).await.unwrap();
        let chunk = store.get("c1").await.unwrap().unwrap();
        assert_eq!(chunk.text, "Rust memory safety");
        assert_eq!(chunk.vector, Some(vec![1.0]));

        assert!(store.delete("c1").await.unwrap());
        assert!(store.get("c1").await.unwrap().is_none());
    }
}
