use thiserror::Error;

use crate::llm::ProviderError;
use crate::rag::RetrievalError;

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("No API key configured: set GEMINI_API_KEY or llm.api_key")]
    MissingApiKey,

    #[error("Failed to initialize RAG store: {0}")]
    Rag(#[source] RetrievalError),

    #[error("Failed to initialize LLM provider: {0}")]
    Llm(#[source] ProviderError),

    #[error("Failed to initialize web extractor: {0}")]
    Web(#[source] RetrievalError),
}
