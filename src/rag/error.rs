use thiserror::Error;

/// Failures surfaced at the retrieval engine boundary.
///
/// Every variant carries the stage that failed so callers can report it
/// without seeing provider-specific error types.
#[derive(Debug, Error)]
pub enum RetrievalError {
    /// Bad input shape or type. Rejected synchronously, never retried.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("{stage} timed out after {secs}s")]
    ProviderTimeout { stage: &'static str, secs: u64 },

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("extraction failed ({stage}): {detail}")]
    Extraction { stage: &'static str, detail: String },

    #[error("index error: {0}")]
    Store(String),
}

impl RetrievalError {
    pub fn embedding<E: std::fmt::Display>(err: E) -> Self {
        RetrievalError::Embedding(err.to_string())
    }

    pub fn generation<E: std::fmt::Display>(err: E) -> Self {
        RetrievalError::Generation(err.to_string())
    }

    pub fn store<E: std::fmt::Display>(err: E) -> Self {
        RetrievalError::Store(err.to_string())
    }

    pub fn extraction<E: std::fmt::Display>(stage: &'static str, err: E) -> Self {
        RetrievalError::Extraction {
            stage,
            detail: err.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, RetrievalError::Validation(_))
    }
}
