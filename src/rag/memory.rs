//! In-process RAG store.
//!
//! The corpus lives behind a single `RwLock`: upserts take the write half, so
//! writes are serialized and a chunk becomes visible only once fully stored,
//! while queries share the read half.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::error::RetrievalError;
use super::store::{checked_query, checked_vector, validate_k, KnowledgeChunk, RagStore, RankedResult};
use crate::vector_math::rank_descending_by_cosine;

#[derive(Default)]
struct Corpus {
    /// Chunks keyed by first-insertion sequence; iteration order is the
    /// tie-break order.
    chunks: BTreeMap<u64, KnowledgeChunk>,
    ids: HashMap<String, u64>,
    next_seq: u64,
    embedding_model: Option<String>,
}

impl Corpus {
    fn dimension(&self) -> Option<usize> {
        self.chunks
            .values()
            .find_map(|chunk| chunk.vector.as_ref().map(Vec::len))
    }

    fn dimension_excluding(&self, id: &str) -> Option<usize> {
        self.chunks
            .values()
            .find(|chunk| chunk.id != id)
            .and_then(|chunk| chunk.vector.as_ref().map(Vec::len))
    }
}

#[derive(Default)]
pub struct InMemoryRagStore {
    corpus: RwLock<Corpus>,
}

impl InMemoryRagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RagStore for InMemoryRagStore {
    async fn upsert(&self, mut chunk: KnowledgeChunk) -> Result<String, RetrievalError> {
        if chunk.id.trim().is_empty() {
            chunk.id = Uuid::new_v4().to_string();
        }

        let mut corpus = self.corpus.write().await;
        let vector = checked_vector(&chunk, corpus.dimension_excluding(&chunk.id))?;
        chunk.vector = Some(vector);

        let id = chunk.id.clone();
        let seq = match corpus.ids.get(&id) {
            Some(seq) => *seq,
            None => {
                let seq = corpus.next_seq;
                corpus.next_seq += 1;
                corpus.ids.insert(id.clone(), seq);
                seq
            }
        };
        corpus.chunks.insert(seq, chunk);

        Ok(id)
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<RankedResult>, RetrievalError> {
        validate_k(k)?;

        let corpus = self.corpus.read().await;
        if corpus.chunks.is_empty() {
            return Ok(Vec::new());
        }
        checked_query(vector, corpus.dimension())?;

        let ordered: Vec<&KnowledgeChunk> = corpus.chunks.values().collect();
        let ranked = rank_descending_by_cosine(
            vector,
            ordered
                .iter()
                .map(|chunk| chunk.vector.as_deref().unwrap_or(&[])),
        );

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(idx, score)| RankedResult {
                chunk: ordered[idx].clone(),
                score,
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<KnowledgeChunk>, RetrievalError> {
        let corpus = self.corpus.read().await;
        Ok(corpus
            .ids
            .get(id)
            .and_then(|seq| corpus.chunks.get(seq))
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, RetrievalError> {
        let mut corpus = self.corpus.write().await;
        let Some(seq) = corpus.ids.remove(id) else {
            return Ok(false);
        };
        corpus.chunks.remove(&seq);
        Ok(true)
    }

    async fn clear(&self) -> Result<(), RetrievalError> {
        let mut corpus = self.corpus.write().await;
        corpus.chunks.clear();
        corpus.ids.clear();
        Ok(())
    }

    async fn count(&self) -> Result<usize, RetrievalError> {
        Ok(self.corpus.read().await.chunks.len())
    }

    async fn embedding_model(&self) -> Result<Option<String>, RetrievalError> {
        Ok(self.corpus.read().await.embedding_model.clone())
    }

    async fn set_embedding_model(&self, model_id: &str) -> Result<(), RetrievalError> {
        self.corpus.write().await.embedding_model = Some(model_id.to_string());
        Ok(())
    }
}
