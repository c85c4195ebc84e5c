//! Hosted model provider speaking the OpenAI wire format.
//!
//! Serves both embeddings (`/embeddings`) and answer generation
//! (`/chat/completions`). The default endpoint is Gemini's OpenAI-compatible
//! surface; any server exposing the same routes works.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::error::ProviderError;
use super::provider::{validate_embedding, AnswerSynthesizer, EmbeddingProvider};
use super::types::{ChatMessage, ChatRequest};
use crate::core::config::LlmConfig;

#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: Option<String>,
    chat_model: String,
    embedding_model: String,
    embedding_model_id: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: &LlmConfig, request_timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(ProviderError::http)?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key().map(str::to_string),
            chat_model: config.chat_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_model_id: format!("remote:{}", config.embedding_model),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let builder = self.client.post(url);
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send_json(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let res = self
            .post(path)
            .json(body)
            .send()
            .await
            .map_err(ProviderError::http)?;

        let status = res.status();
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        res.json().await.map_err(ProviderError::malformed)
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": self.chat_model,
            "messages": request.messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = request.temperature { obj.insert("temperature".to_string(), json!(t)); }
            if let Some(t) = request.max_tokens { obj.insert("max_tokens".to_string(), json!(t)); }
        }

        let payload = self.send_json("/chat/completions", &body).await?;
        parse_chat_content(&payload)
    }
}

fn parse_chat_content(payload: &Value) -> Result<String, ProviderError> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(|content| content.trim().to_string())
        .ok_or_else(|| ProviderError::Malformed("missing choices[0].message.content".to_string()))
}

fn parse_embeddings(payload: &Value, expected: usize) -> Result<Vec<Vec<f32>>, ProviderError> {
    let data = payload["data"]
        .as_array()
        .ok_or_else(|| ProviderError::Malformed("missing data array".to_string()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let values = item["embedding"]
            .as_array()
            .ok_or_else(|| ProviderError::Malformed("missing embedding".to_string()))?;
        let vector = values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| ProviderError::Malformed("non-numeric embedding value".to_string()))
            })
            .collect::<Result<Vec<f32>, _>>()?;
        let index = item["index"].as_u64().map(|i| i as usize).unwrap_or(position);
        indexed.push((index, vector));
    }

    if indexed.len() != expected {
        return Err(ProviderError::Malformed(format!(
            "expected {} embeddings, got {}",
            expected,
            indexed.len()
        )));
    }

    indexed.sort_by_key(|(index, _)| *index);
    let vectors: Vec<Vec<f32>> = indexed.into_iter().map(|(_, v)| v).collect();

    let dimension = vectors.first().map(Vec::len);
    for vector in &vectors {
        validate_embedding(vector, dimension)?;
    }
    Ok(vectors)
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatProvider {
    fn model_id(&self) -> &str {
        &self.embedding_model_id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| ProviderError::Malformed("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = json!({
            "model": self.embedding_model,
            "input": texts,
        });

        let payload = self.send_json("/embeddings", &body).await?;
        parse_embeddings(&payload, texts.len())
    }
}

#[async_trait]
impl AnswerSynthesizer for OpenAiCompatProvider {
    fn model_id(&self) -> &str {
        &self.chat_model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let request = ChatRequest::new(vec![ChatMessage::user(prompt)])
            .with_sampling(self.temperature, self.max_tokens);
        self.chat(request).await
    }
}
