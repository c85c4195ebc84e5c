//! RAG (Retrieval-Augmented Generation) module.
//!
//! This module provides:
//! - `RetrievalEngine`: ingests text into the knowledge corpus and resolves
//!   questions against it
//! - `RAGContextBuilder`: builds the grounding prompt from ranked passages
//! - `RagStore`: the similarity index, with in-memory and SQLite backends

pub mod context_builder;
pub mod engine;
pub mod error;
pub mod memory;
pub mod normalizer;
pub mod sqlite;
pub mod store;

pub use context_builder::{ContextBuilderConfig, GroundedPrompt, RAGContextBuilder};
pub use engine::{
    EngineConfig, FailedChunk, IngestReport, Resolution, RetrievalEngine, SourceRef,
    EMPTY_CORPUS_REPLY,
};
pub use error::RetrievalError;
pub use memory::InMemoryRagStore;
pub use normalizer::{NormalizerConfig, TextNormalizer};
pub use sqlite::SqliteRagStore;
pub use store::{KnowledgeChunk, RagStore, RankedResult};
