use std::sync::Arc;

use crate::core::config::{AppConfig, AppPaths, EmbeddingBackend, StoreBackend};
use crate::extract::WebExtractor;
use crate::llm::{AnswerSynthesizer, EmbeddingProvider, HashingEmbedder, OpenAiCompatProvider};
use crate::rag::{EngineConfig, InMemoryRagStore, RagStore, RetrievalEngine, SqliteRagStore};

pub mod error;

use error::InitializationError;

/// Application state shared across all routes.
///
/// Built once at startup; the engine owns the store and provider handles and
/// releases them when the last reference is dropped.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<AppConfig>,
    pub engine: Arc<RetrievalEngine>,
    pub web: Arc<WebExtractor>,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Checking the provider credential
    /// 2. Opening the configured RAG store
    /// 3. Building the embedding and generation providers
    /// 4. Clearing a corpus left behind by a different embedding model
    pub async fn initialize(
        paths: Arc<AppPaths>,
        config: AppConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        if config.llm.api_key().is_none() {
            return Err(InitializationError::MissingApiKey);
        }

        let rag_store: Arc<dyn RagStore> = match config.rag.store {
            StoreBackend::Memory => Arc::new(InMemoryRagStore::new()),
            StoreBackend::Sqlite => Arc::new(
                SqliteRagStore::new(paths.as_ref())
                    .await
                    .map_err(InitializationError::Rag)?,
            ),
        };

        let engine_config = EngineConfig::from(&config.rag);
        let remote = Arc::new(
            OpenAiCompatProvider::new(&config.llm, engine_config.provider_timeout)
                .map_err(InitializationError::Llm)?,
        );

        let embedder: Arc<dyn EmbeddingProvider> = match config.llm.embedding_backend {
            EmbeddingBackend::Remote => remote.clone(),
            EmbeddingBackend::Local => {
                Arc::new(HashingEmbedder::new(config.llm.embedding_dimension))
            }
        };
        let synthesizer: Arc<dyn AnswerSynthesizer> = remote;

        let engine = RetrievalEngine::new(rag_store, embedder, synthesizer, engine_config);
        if engine
            .align_embedding_space()
            .await
            .map_err(InitializationError::Rag)?
        {
            tracing::warn!("Knowledge base was reset for embedding model {}", engine.embedding_model());
        }

        let web = WebExtractor::new(&config.web).map_err(InitializationError::Web)?;

        tracing::info!(
            "RAG engine ready: store={:?}, embedding={}, generation={}",
            config.rag.store,
            engine.embedding_model(),
            engine.generation_model()
        );

        Ok(Self::from_parts(paths, config, engine, web))
    }

    /// Assembles state from already constructed parts.
    pub fn from_parts(
        paths: Arc<AppPaths>,
        config: AppConfig,
        engine: RetrievalEngine,
        web: WebExtractor,
    ) -> Arc<Self> {
        Arc::new(AppState {
            paths,
            config: Arc::new(config),
            engine: Arc::new(engine),
            web: Arc::new(web),
        })
    }
}
