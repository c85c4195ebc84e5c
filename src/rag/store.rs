//! RagStore trait: the similarity index over the knowledge corpus.
//!
//! The store exclusively owns chunk text, metadata and vectors. Two
//! implementations exist: `InMemoryRagStore` and `SqliteRagStore`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::RetrievalError;

/// A unit of retrievable knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Unique within a corpus. Assigned by the store when empty.
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    /// Set once the chunk has been embedded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
}

impl KnowledgeChunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            text: text.into(),
            metadata: BTreeMap::new(),
            vector: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// One entry of a ranked query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedResult {
    pub chunk: KnowledgeChunk,
    /// Cosine similarity, higher is better.
    pub score: f32,
}

/// Abstract similarity index.
///
/// Implementations must:
/// - serialize writes, so a reader sees either the old or the fully written
///   new chunk, never a partial one
/// - rank by descending cosine similarity, breaking ties by first-insertion
///   order
/// - return an empty result (not an error) for an empty corpus
#[async_trait]
pub trait RagStore: Send + Sync {
    /// Stores the chunk, assigning an id if it has none. Re-upserting an
    /// existing id replaces text, metadata and vector but keeps its original
    /// insertion position.
    async fn upsert(&self, chunk: KnowledgeChunk) -> Result<String, RetrievalError>;

    /// Top-`k` chunks by cosine similarity. `k` must be positive; a `k`
    /// larger than the corpus returns the whole corpus ranked.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RankedResult>, RetrievalError>;

    async fn get(&self, id: &str) -> Result<Option<KnowledgeChunk>, RetrievalError>;

    async fn delete(&self, id: &str) -> Result<bool, RetrievalError>;

    /// Removes every chunk. The recorded embedding model survives.
    async fn clear(&self) -> Result<(), RetrievalError>;

    async fn count(&self) -> Result<usize, RetrievalError>;

    /// Identifier of the embedding model the corpus vectors came from.
    async fn embedding_model(&self) -> Result<Option<String>, RetrievalError>;

    async fn set_embedding_model(&self, model_id: &str) -> Result<(), RetrievalError>;
}

pub(crate) fn validate_k(k: usize) -> Result<(), RetrievalError> {
    if k == 0 {
        return Err(RetrievalError::Validation(
            "k must be a positive integer".to_string(),
        ));
    }
    Ok(())
}

/// Checks that a chunk carries a usable vector matching the corpus dimension.
pub(crate) fn checked_vector(
    chunk: &KnowledgeChunk,
    corpus_dimension: Option<usize>,
) -> Result<Vec<f32>, RetrievalError> {
    let vector = chunk
        .vector
        .clone()
        .ok_or_else(|| RetrievalError::Embedding("chunk has no vector".to_string()))?;

    if vector.is_empty() {
        return Err(RetrievalError::Embedding("empty vector".to_string()));
    }
    if !crate::vector_math::is_finite_vector(&vector) {
        return Err(RetrievalError::Embedding(
            "vector contains non-finite values".to_string(),
        ));
    }
    if let Some(expected) = corpus_dimension {
        if expected != vector.len() {
            return Err(RetrievalError::Embedding(format!(
                "dimension mismatch: corpus uses {}, got {}",
                expected,
                vector.len()
            )));
        }
    }
    Ok(vector)
}

/// Checks a query vector against the corpus dimension.
pub(crate) fn checked_query(
    vector: &[f32],
    corpus_dimension: Option<usize>,
) -> Result<(), RetrievalError> {
    if vector.is_empty() || !crate::vector_math::is_finite_vector(vector) {
        return Err(RetrievalError::Embedding(
            "query vector is empty or non-finite".to_string(),
        ));
    }
    match corpus_dimension {
        Some(expected) if expected != vector.len() => Err(RetrievalError::Embedding(format!(
            "query dimension mismatch: corpus uses {}, got {}",
            expected,
            vector.len()
        ))),
        _ => Ok(()),
    }
}
