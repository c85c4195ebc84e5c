//! Retrieval Engine.
//!
//! Composes the text normalizer, an embedding provider and a `RagStore`:
//! - `ingest`: text -> chunks -> vectors -> upserts, skipping chunks whose
//!   embedding fails
//! - `resolve`: query -> vector -> top-k passages -> grounded prompt -> answer
//!
//! The engine holds no corpus state of its own. Every provider call is bounded
//! by `EngineConfig::provider_timeout`.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::context_builder::{ContextBuilderConfig, RAGContextBuilder};
use super::error::RetrievalError;
use super::normalizer::{NormalizerConfig, TextNormalizer};
use super::store::{KnowledgeChunk, RagStore};
use crate::core::config::{defaults, RagSettings};
use crate::llm::{validate_embedding, AnswerSynthesizer, EmbeddingProvider, ProviderError};

/// Reply returned instead of calling any provider when nothing is stored.
pub const EMPTY_CORPUS_REPLY: &str = "Knowledge base is empty.";

const DEFAULT_SOURCE: &str = "text";
const FAILED_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub max_context_chars: usize,
    pub max_chunk_chars: usize,
    pub provider_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_top_k: defaults::default_top_k(),
            max_top_k: defaults::max_top_k(),
            max_context_chars: defaults::max_context_chars(),
            max_chunk_chars: defaults::max_chunk_chars(),
            provider_timeout: Duration::from_secs(defaults::provider_timeout_secs()),
        }
    }
}

impl From<&RagSettings> for EngineConfig {
    fn from(settings: &RagSettings) -> Self {
        Self {
            default_top_k: settings.default_top_k,
            max_top_k: settings.max_top_k,
            max_context_chars: settings.max_context_chars,
            max_chunk_chars: settings.max_chunk_chars,
            provider_timeout: Duration::from_secs(settings.provider_timeout_secs),
        }
    }
}

/// A chunk skipped during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedChunk {
    pub index: usize,
    pub text_preview: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestReport {
    /// Stored chunk ids in document order, without repeats.
    pub chunk_ids: Vec<String>,
    pub failed: Vec<FailedChunk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub chunk_id: String,
    pub score: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub reply: String,
    pub sources: Vec<SourceRef>,
    pub empty_corpus: bool,
}

impl Resolution {
    fn empty_corpus() -> Self {
        Self {
            reply: EMPTY_CORPUS_REPLY.to_string(),
            sources: Vec::new(),
            empty_corpus: true,
        }
    }
}

pub struct RetrievalEngine {
    store: Arc<dyn RagStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    synthesizer: Arc<dyn AnswerSynthesizer>,
    normalizer: TextNormalizer,
    context_builder: RAGContextBuilder,
    config: EngineConfig,
}

impl RetrievalEngine {
    pub fn new(
        store: Arc<dyn RagStore>,
        embedder: Arc<dyn EmbeddingProvider>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        config: EngineConfig,
    ) -> Self {
        let normalizer = TextNormalizer::new(NormalizerConfig {
            max_chunk_chars: config.max_chunk_chars,
        });
        let context_builder = RAGContextBuilder::new(ContextBuilderConfig {
            max_context_chars: config.max_context_chars,
        });

        Self {
            store,
            embedder,
            synthesizer,
            normalizer,
            context_builder,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn embedding_model(&self) -> &str {
        self.embedder.model_id()
    }

    pub fn generation_model(&self) -> &str {
        self.synthesizer.model_id()
    }

    /// Makes the stored corpus agree with the configured embedding model.
    ///
    /// A corpus built in a different embedding space is cleared; its vectors
    /// cannot be compared with the current provider's. Returns `true` if the
    /// corpus was cleared.
    pub async fn align_embedding_space(&self) -> Result<bool, RetrievalError> {
        let current = self.embedder.model_id();
        match self.store.embedding_model().await? {
            Some(recorded) if recorded == current => Ok(false),
            Some(recorded) => {
                let stale = self.store.count().await?;
                warn!(
                    "Embedding model changed from {} to {}; clearing {} stale chunks",
                    recorded, current, stale
                );
                self.store.clear().await?;
                self.store.set_embedding_model(current).await?;
                Ok(true)
            }
            None => {
                if self.store.count().await? > 0 {
                    warn!("Corpus has no recorded embedding model; clearing it");
                    self.store.clear().await?;
                }
                self.store.set_embedding_model(current).await?;
                Ok(false)
            }
        }
    }

    /// Fails when the corpus was embedded by a different model than the
    /// current provider. Never writes.
    async fn check_embedding_space(&self) -> Result<(), RetrievalError> {
        let current = self.embedder.model_id();
        match self.store.embedding_model().await? {
            Some(recorded) if recorded != current => Err(RetrievalError::Embedding(format!(
                "corpus was embedded with {}, provider is {}",
                recorded, current
            ))),
            _ => Ok(()),
        }
    }

    async fn ensure_embedding_space(&self) -> Result<(), RetrievalError> {
        let current = self.embedder.model_id();
        match self.store.embedding_model().await? {
            Some(recorded) if recorded == current => Ok(()),
            Some(recorded) => Err(RetrievalError::Embedding(format!(
                "corpus was embedded with {}, provider is {}",
                recorded, current
            ))),
            None => self.store.set_embedding_model(current).await,
        }
    }

    /// Splits `text` into chunks, embeds and stores each one.
    ///
    /// A chunk whose embedding fails (or times out) is reported in
    /// `IngestReport::failed` and the rest continue. When no chunk could be
    /// stored at all the call fails with `RetrievalError::Embedding`. Index
    /// errors abort the call; chunks stored before the error stay stored.
    pub async fn ingest(
        &self,
        text: &str,
        metadata: BTreeMap<String, String>,
    ) -> Result<IngestReport, RetrievalError> {
        let chunks = self.normalizer.normalize(text);
        let mut report = IngestReport::default();
        if chunks.is_empty() {
            debug!("Nothing to ingest after normalization");
            return Ok(report);
        }

        self.ensure_embedding_space().await?;

        let source = metadata
            .get("source")
            .cloned()
            .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
        let ingested_at = Utc::now().to_rfc3339();

        for (index, chunk_text) in chunks.into_iter().enumerate() {
            let vector = match self.embed_checked(&chunk_text).await {
                Ok(vector) => vector,
                Err(err) => {
                    warn!("Skipping chunk {} from {}: {}", index, source, err);
                    report.failed.push(FailedChunk {
                        index,
                        text_preview: chunk_text.chars().take(FAILED_PREVIEW_CHARS).collect(),
                        reason: err.to_string(),
                    });
                    continue;
                }
            };

            let text_preview: String = chunk_text.chars().take(FAILED_PREVIEW_CHARS).collect();
            let mut chunk = KnowledgeChunk::new(chunk_text).with_vector(vector);
            chunk.id = chunk_id(&source, &chunk.text);
            chunk.metadata = metadata.clone();
            chunk.metadata.insert("source".to_string(), source.clone());
            chunk.metadata.insert("chunk_index".to_string(), index.to_string());
            chunk.metadata.insert("ingested_at".to_string(), ingested_at.clone());

            match self.store.upsert(chunk).await {
                Ok(id) => {
                    if !report.chunk_ids.contains(&id) {
                        report.chunk_ids.push(id);
                    }
                }
                Err(RetrievalError::Embedding(reason)) => {
                    warn!("Index rejected chunk {} from {}: {}", index, source, reason);
                    report.failed.push(FailedChunk {
                        index,
                        text_preview,
                        reason,
                    });
                }
                Err(err) => return Err(err),
            }
        }

        if report.chunk_ids.is_empty() {
            if let Some(first) = report.failed.first() {
                return Err(RetrievalError::Embedding(format!(
                    "no chunk could be embedded ({} failed): {}",
                    report.failed.len(),
                    first.reason
                )));
            }
        }

        info!(
            "Ingested {} chunks from {} ({} failed)",
            report.chunk_ids.len(),
            source,
            report.failed.len()
        );
        Ok(report)
    }

    /// Answers `query` from the stored knowledge.
    ///
    /// An empty corpus yields the `EMPTY_CORPUS_REPLY` sentinel without
    /// touching either provider, whatever the query.
    pub async fn resolve(
        &self,
        query: &str,
        top_k: Option<usize>,
    ) -> Result<Resolution, RetrievalError> {
        if self.store.count().await? == 0 {
            debug!("Resolve on empty corpus");
            return Ok(Resolution::empty_corpus());
        }

        let query = query.trim();
        if query.is_empty() {
            return Err(RetrievalError::Validation("message must not be empty".to_string()));
        }
        let top_k = self.effective_top_k(top_k)?;
        self.check_embedding_space().await?;

        let vector = self.embed_checked(query).await?;
        let ranked = self.store.query(&vector, top_k).await?;
        if ranked.is_empty() {
            // Cleared between the count and the query.
            return Ok(Resolution::empty_corpus());
        }

        let grounded = self.context_builder.build_prompt(query, &ranked);
        debug!(
            "Resolving with {} passages ({} prompt chars)",
            grounded.passages.len(),
            grounded.prompt.len()
        );

        let reply = self
            .bounded("generation", RetrievalError::generation, self.synthesizer.generate(&grounded.prompt))
            .await?;

        Ok(Resolution {
            reply: reply.trim().to_string(),
            sources: grounded
                .passages
                .iter()
                .map(|p| SourceRef {
                    chunk_id: p.chunk.id.clone(),
                    score: p.score,
                })
                .collect(),
            empty_corpus: false,
        })
    }

    pub async fn clear(&self) -> Result<(), RetrievalError> {
        self.store.clear().await?;
        info!("Knowledge base cleared");
        Ok(())
    }

    pub async fn corpus_size(&self) -> Result<usize, RetrievalError> {
        self.store.count().await
    }

    fn effective_top_k(&self, requested: Option<usize>) -> Result<usize, RetrievalError> {
        let k = requested.unwrap_or(self.config.default_top_k);
        if k == 0 {
            return Err(RetrievalError::Validation("top_k must be at least 1".to_string()));
        }
        Ok(k.min(self.config.max_top_k.max(1)))
    }

    async fn embed_checked(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let vector = self
            .bounded("embedding", RetrievalError::embedding, self.embedder.embed(text))
            .await?;
        validate_embedding(&vector, None).map_err(RetrievalError::embedding)?;
        Ok(vector)
    }

    async fn bounded<T, F>(
        &self,
        stage: &'static str,
        wrap: fn(ProviderError) -> RetrievalError,
        call: F,
    ) -> Result<T, RetrievalError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let started = Instant::now();
        match tokio::time::timeout(self.config.provider_timeout, call).await {
            Ok(result) => {
                debug!("{} call took {:?}", stage, started.elapsed());
                result.map_err(wrap)
            }
            Err(_) => Err(RetrievalError::ProviderTimeout {
                stage,
                secs: self.config.provider_timeout.as_secs(),
            }),
        }
    }
}

/// Content-addressed chunk id: the first 16 bytes of SHA-256 over
/// `source \0 text`, hex encoded.
pub fn chunk_id(source: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..16])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashingEmbedder;
    use crate::rag::memory::InMemoryRagStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct CountingEmbedder {
        inner: HashingEmbedder,
        calls: AtomicUsize,
    }

    impl CountingEmbedder {
        fn new() -> Self {
            Self {
                inner: HashingEmbedder::default(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn model_id(&self) -> &str {
            self.inner.model_id()
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if text.contains("FAIL") {
                return Err(ProviderError::Http("connection reset".to_string()));
            }
            self.inner.embed(text).await
        }
    }

    struct SlowEmbedder;

    #[async_trait]
    impl EmbeddingProvider for SlowEmbedder {
        fn model_id(&self) -> &str {
            "slow"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![1.0])
        }
    }

    #[derive(Default)]
    struct RecordingSynthesizer {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl AnswerSynthesizer for RecordingSynthesizer {
        fn model_id(&self) -> &str {
            "recording"
        }

        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok("  The sky is blue.  ".to_string())
        }
    }

    fn engine_with(
        embedder: Arc<dyn EmbeddingProvider>,
        synthesizer: Arc<RecordingSynthesizer>,
        config: EngineConfig,
    ) -> (RetrievalEngine, Arc<InMemoryRagStore>) {
        let store = Arc::new(InMemoryRagStore::new());
        let engine = RetrievalEngine::new(store.clone(), embedder, synthesizer, config);
        (engine, store)
    }

    fn source(name: &str) -> BTreeMap<String, String> {
        BTreeMap::from([("source".to_string(), name.to_string())])
    }

    #[tokio::test]
    async fn sky_scenario() {
        let embedder = Arc::new(CountingEmbedder::new());
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, store) = engine_with(embedder.clone(), synth.clone(), EngineConfig::default());

        let empty = engine.resolve("What color is the sky?", None).await.unwrap();
        assert!(empty.empty_corpus);
        assert_eq!(empty.reply, EMPTY_CORPUS_REPLY);
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

        let report = engine
            .ingest("The sky is blue.\nWater boils at 100C.", source("notes"))
            .await
            .unwrap();
        assert_eq!(report.chunk_ids.len(), 2);
        assert!(report.failed.is_empty());
        assert_eq!(store.count().await.unwrap(), 2);

        let resolution = engine.resolve("What color is the sky?", None).await.unwrap();
        assert!(!resolution.empty_corpus);
        assert_eq!(resolution.reply, "The sky is blue.");
        assert_eq!(resolution.sources.len(), 1);
        assert_eq!(resolution.sources[0].chunk_id, report.chunk_ids[0]);

        let prompts = synth.prompts.lock().unwrap();
        assert!(prompts[0].contains("Knowledge:\nThe sky is blue.\n\nQuestion:\nWhat color is the sky?"));
    }

    #[tokio::test]
    async fn chunk_metadata_is_recorded() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, store) =
            engine_with(Arc::new(CountingEmbedder::new()), synth, EngineConfig::default());

        let report = engine.ingest("alpha line\nbeta line", source("doc.pdf")).await.unwrap();
        let chunk = store.get(&report.chunk_ids[1]).await.unwrap().unwrap();

        assert_eq!(chunk.metadata.get("source").map(String::as_str), Some("doc.pdf"));
        assert_eq!(chunk.metadata.get("chunk_index").map(String::as_str), Some("1"));
        assert!(chunk.metadata.contains_key("ingested_at"));
        assert_eq!(store.embedding_model().await.unwrap().as_deref(), Some("local-hash-384"));
    }

    #[tokio::test]
    async fn failed_embedding_skips_chunk_only() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, store) =
            engine_with(Arc::new(CountingEmbedder::new()), synth, EngineConfig::default());

        let report = engine
            .ingest("first good line\nthis one will FAIL\nthird good line", BTreeMap::new())
            .await
            .unwrap();

        assert_eq!(report.chunk_ids.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].index, 1);
        assert!(report.failed[0].reason.contains("embedding failed"));
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn reingest_is_idempotent_and_ids_deduplicated() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, store) =
            engine_with(Arc::new(CountingEmbedder::new()), synth, EngineConfig::default());

        let first = engine.ingest("same line\nsame line\nother", source("a")).await.unwrap();
        assert_eq!(first.chunk_ids.len(), 2);

        let second = engine.ingest("same line\nother", source("a")).await.unwrap();
        assert_eq!(first.chunk_ids, second.chunk_ids);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn clear_then_resolve_returns_sentinel() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, _store) =
            engine_with(Arc::new(CountingEmbedder::new()), synth.clone(), EngineConfig::default());

        engine.ingest("The sky is blue.", BTreeMap::new()).await.unwrap();
        engine.clear().await.unwrap();

        assert_eq!(engine.corpus_size().await.unwrap(), 0);
        let resolution = engine.resolve("anything", None).await.unwrap();
        assert!(resolution.empty_corpus);
        assert!(synth.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejects_blank_query_and_zero_top_k() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, _store) =
            engine_with(Arc::new(CountingEmbedder::new()), synth, EngineConfig::default());

        assert!(engine.resolve("   ", None).await.unwrap().empty_corpus);

        engine.ingest("The sky is blue.", BTreeMap::new()).await.unwrap();
        assert!(engine.resolve("   ", None).await.unwrap_err().is_validation());
        assert!(engine.resolve("sky", Some(0)).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn every_chunk_failing_fails_the_ingest() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, store) =
            engine_with(Arc::new(CountingEmbedder::new()), synth, EngineConfig::default());

        let err = engine
            .ingest("FAIL one\nFAIL two", BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(ref reason) if reason.contains("connection reset")));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn each_paragraph_is_found_by_its_own_words() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, _store) =
            engine_with(Arc::new(CountingEmbedder::new()), synth, EngineConfig::default());

        let document = "Volcanic basalt cools into hexagonal columns along the coast.\n\
                        Honeybees communicate flower locations through a waggle dance.\n\
                        Compilers lower syntax trees into intermediate representations.\n\
                        Glaciers carve deep fjords during repeated ice ages.";
        let report = engine.ingest(document, source("doc")).await.unwrap();
        assert_eq!(report.chunk_ids.len(), 4);

        let queries = [
            "basalt cools into hexagonal columns",
            "waggle dance of honeybees",
            "lower syntax trees into intermediate",
            "glaciers carve deep fjords",
        ];
        for (expected, query) in report.chunk_ids.iter().zip(queries) {
            let resolution = engine.resolve(query, None).await.unwrap();
            assert_eq!(&resolution.sources[0].chunk_id, expected, "query: {}", query);
        }
    }

    struct FixedEmbedder;

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        fn model_id(&self) -> &str {
            "fixed-3"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            Ok(vec![0.0, 1.0, 0.0])
        }
    }

    #[tokio::test]
    async fn query_vector_of_wrong_dimension_is_rejected() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, store) =
            engine_with(Arc::new(FixedEmbedder), synth.clone(), EngineConfig::default());

        store.set_embedding_model("fixed-3").await.unwrap();
        store
            .upsert(KnowledgeChunk::new("east").with_id("a").with_vector(vec![1.0, 0.0]))
            .await
            .unwrap();
        store
            .upsert(KnowledgeChunk::new("north").with_id("b").with_vector(vec![0.0, 1.0]))
            .await
            .unwrap();

        let err = engine.resolve("Water boils", None).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
        assert!(synth.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_refuses_foreign_embedding_space() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let embedder = Arc::new(CountingEmbedder::new());
        let (engine, store) = engine_with(embedder.clone(), synth, EngineConfig::default());

        store.set_embedding_model("remote:other").await.unwrap();
        store
            .upsert(KnowledgeChunk::new("old").with_id("old").with_vector(vec![1.0; 384]))
            .await
            .unwrap();

        let err = engine.resolve("old", None).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn top_k_is_clamped_and_passages_ordered() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let config = EngineConfig {
            max_top_k: 2,
            ..EngineConfig::default()
        };
        let (engine, _store) = engine_with(Arc::new(CountingEmbedder::new()), synth, config);

        engine
            .ingest("The sky is blue.\nThe sky is grey at night.\nWater boils at 100C.", BTreeMap::new())
            .await
            .unwrap();

        let resolution = engine.resolve("sky", Some(50)).await.unwrap();
        assert_eq!(resolution.sources.len(), 2);
        assert!(resolution.sources[0].score >= resolution.sources[1].score);
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let config = EngineConfig {
            provider_timeout: Duration::from_millis(20),
            ..EngineConfig::default()
        };
        let (engine, store) = engine_with(Arc::new(SlowEmbedder), synth, config);

        let err = engine.ingest("some text", BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(ref reason) if reason.contains("timed out")));

        store
            .upsert(KnowledgeChunk::new("seed").with_id("seed").with_vector(vec![1.0]))
            .await
            .unwrap();
        let err = engine.resolve("query", None).await.unwrap_err();
        assert!(matches!(err, RetrievalError::ProviderTimeout { stage: "embedding", .. }));
    }

    #[tokio::test]
    async fn align_clears_foreign_embedding_space() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, store) =
            engine_with(Arc::new(CountingEmbedder::new()), synth, EngineConfig::default());

        store.set_embedding_model("remote:text-embedding-004").await.unwrap();
        store
            .upsert(KnowledgeChunk::new("old").with_id("old").with_vector(vec![1.0, 0.0]))
            .await
            .unwrap();

        assert!(engine.align_embedding_space().await.unwrap());
        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(store.embedding_model().await.unwrap().as_deref(), Some("local-hash-384"));
        assert!(!engine.align_embedding_space().await.unwrap());
    }

    #[tokio::test]
    async fn ingest_refuses_mixed_embedding_space() {
        let synth = Arc::new(RecordingSynthesizer::default());
        let (engine, store) =
            engine_with(Arc::new(CountingEmbedder::new()), synth, EngineConfig::default());

        store.set_embedding_model("remote:other").await.unwrap();
        let err = engine.ingest("text", BTreeMap::new()).await.unwrap_err();
        assert!(matches!(err, RetrievalError::Embedding(_)));
    }

    #[test]
    fn chunk_ids_are_content_addressed() {
        let a = chunk_id("notes", "The sky is blue.");
        assert_eq!(a.len(), 32);
        assert_eq!(a, chunk_id("notes", "The sky is blue."));
        assert_ne!(a, chunk_id("other", "The sky is blue."));
    }
}
