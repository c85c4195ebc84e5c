pub mod error;
pub mod hashing;
pub mod openai_compat;
pub mod provider;
pub mod types;

pub use error::ProviderError;
pub use hashing::HashingEmbedder;
pub use openai_compat::OpenAiCompatProvider;
pub use provider::{validate_embedding, AnswerSynthesizer, EmbeddingProvider};
pub use types::{ChatMessage, ChatRequest};
