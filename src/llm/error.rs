use thiserror::Error;

/// Errors raised by model providers before the engine adds stage context.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn http<E: std::fmt::Display>(err: E) -> Self {
        ProviderError::Http(err.to_string())
    }

    pub fn malformed<E: std::fmt::Display>(err: E) -> Self {
        ProviderError::Malformed(err.to_string())
    }
}
