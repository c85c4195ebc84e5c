//! Defaults for every optional configuration key.
//!
//! The remote defaults target Google's OpenAI-compatible Gemini endpoint,
//! which serves both chat completions and embeddings.

pub const GEMINI_OPENAI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

pub fn host() -> String {
    "127.0.0.1".to_string()
}

pub fn port() -> u16 {
    8000
}

pub fn cors_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

pub fn base_url() -> String {
    GEMINI_OPENAI_BASE_URL.to_string()
}

pub fn chat_model() -> String {
    "gemini-2.0-flash".to_string()
}

pub fn embedding_model() -> String {
    "text-embedding-004".to_string()
}

pub fn embedding_dimension() -> usize {
    384
}

pub fn default_top_k() -> usize {
    1
}

pub fn max_top_k() -> usize {
    10
}

pub fn max_context_chars() -> usize {
    8_000
}

pub fn max_chunk_chars() -> usize {
    2_000
}

pub fn provider_timeout_secs() -> u64 {
    30
}

pub fn fetch_timeout_secs() -> u64 {
    20
}

pub fn user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string()
}
