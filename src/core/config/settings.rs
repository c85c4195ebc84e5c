use serde::{Deserialize, Serialize};

use super::defaults;

/// Typed view over the merged `config.yml` + `secrets.yaml` + environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub rag: RagSettings,
    #[serde(default)]
    pub web: WebConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "defaults::host")]
    pub host: String,
    #[serde(default = "defaults::port")]
    pub port: u16,
    #[serde(default = "defaults::cors_allowed_origins")]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: defaults::host(),
            port: defaults::port(),
            cors_allowed_origins: defaults::cors_allowed_origins(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// Hosted embedding endpoint, same credentials as generation.
    Remote,
    /// In-process feature hashing, no network.
    Local,
}

impl Default for EmbeddingBackend {
    fn default() -> Self {
        EmbeddingBackend::Remote
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "defaults::base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "defaults::chat_model")]
    pub chat_model: String,
    #[serde(default = "defaults::embedding_model")]
    pub embedding_model: String,
    #[serde(default)]
    pub embedding_backend: EmbeddingBackend,
    /// Dimension of the local hashing embedder; remote models report their own.
    #[serde(default = "defaults::embedding_dimension")]
    pub embedding_dimension: usize,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            api_key: None,
            chat_model: defaults::chat_model(),
            embedding_model: defaults::embedding_model(),
            embedding_backend: EmbeddingBackend::default(),
            embedding_dimension: defaults::embedding_dimension(),
            temperature: None,
            max_tokens: None,
        }
    }
}

impl LlmConfig {
    /// The API key, if one is configured and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagSettings {
    #[serde(default = "default_store")]
    pub store: StoreBackend,
    #[serde(default = "defaults::default_top_k")]
    pub default_top_k: usize,
    #[serde(default = "defaults::max_top_k")]
    pub max_top_k: usize,
    #[serde(default = "defaults::max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default = "defaults::max_chunk_chars")]
    pub max_chunk_chars: usize,
    #[serde(default = "defaults::provider_timeout_secs")]
    pub provider_timeout_secs: u64,
}

fn default_store() -> StoreBackend {
    StoreBackend::Memory
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            store: default_store(),
            default_top_k: defaults::default_top_k(),
            max_top_k: defaults::max_top_k(),
            max_context_chars: defaults::max_context_chars(),
            max_chunk_chars: defaults::max_chunk_chars(),
            provider_timeout_secs: defaults::provider_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "defaults::fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Browserless-compatible rendering service used when a plain fetch
    /// yields no text.
    #[serde(default)]
    pub render_endpoint: Option<String>,
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: defaults::fetch_timeout_secs(),
            render_endpoint: None,
            user_agent: defaults::user_agent(),
        }
    }
}
