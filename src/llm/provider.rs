use async_trait::async_trait;

use super::error::ProviderError;
use crate::vector_math::is_finite_vector;

/// Maps text into a fixed-length embedding space.
///
/// Every vector stored in one corpus must come from the same `model_id`;
/// the store records it and the engine refuses to mix spaces.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Stable identifier of the embedding space, e.g. `local-hash-384`.
    fn model_id(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }
}

/// Produces the natural-language answer from a grounded prompt.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    fn model_id(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Rejects empty, wrongly sized or non-finite embeddings.
pub fn validate_embedding(vector: &[f32], expected_dim: Option<usize>) -> Result<(), ProviderError> {
    if vector.is_empty() {
        return Err(ProviderError::Malformed("empty embedding".to_string()));
    }
    if let Some(expected) = expected_dim {
        if vector.len() != expected {
            return Err(ProviderError::Malformed(format!(
                "expected {} dimensions, got {}",
                expected,
                vector.len()
            )));
        }
    }
    if !is_finite_vector(vector) {
        return Err(ProviderError::Malformed(
            "embedding contains non-finite values".to_string(),
        ));
    }
    Ok(())
}
