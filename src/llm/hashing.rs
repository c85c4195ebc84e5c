//! FNV-1a feature-hashing embedder, the local embedding backend.
//!
//! Character 3- and 4-grams of the lowercased text are hashed into a fixed
//! number of signed buckets and the result is L2-normalised. Purely lexical,
//! but deterministic and free of network calls.

use async_trait::async_trait;

use super::error::ProviderError;
use super::provider::EmbeddingProvider;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;
const NGRAM_RANGE: (usize, usize) = (3, 4);

#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
    model_id: String,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        let dimension = dimension.max(1);
        Self {
            dimension,
            model_id: format!("local-hash-{}", dimension),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let chars: Vec<char> = text.to_lowercase().chars().collect();

        for n in NGRAM_RANGE.0..=NGRAM_RANGE.1 {
            if n > chars.len() {
                continue;
            }
            for window in chars.windows(n) {
                let ngram: String = window.iter().collect();
                let h = fnv1a(ngram.as_bytes());
                let bucket = (h % self.dimension as u64) as usize;
                let sign = if (h >> 32) & 1 == 0 { 1.0f32 } else { -1.0f32 };
                vector[bucket] += sign;
            }
        }

        l2_normalize(&mut vector);
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(crate::core::config::defaults::embedding_dimension())
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

fn l2_normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_sync(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector_math::cosine_similarity;

    #[tokio::test]
    async fn embeddings_are_unit_length_and_deterministic() {
        let emb = HashingEmbedder::new(64);
        let v = emb.embed("hello world").await.unwrap();
        assert_eq!(v.len(), 64);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.01);
        assert_eq!(v, emb.embed("hello world").await.unwrap());
    }

    #[tokio::test]
    async fn case_insensitive() {
        let emb = HashingEmbedder::new(64);
        assert_eq!(
            emb.embed("Hello").await.unwrap(),
            emb.embed("hello").await.unwrap()
        );
    }

    #[tokio::test]
    async fn short_input_is_a_zero_vector() {
        let emb = HashingEmbedder::new(32);
        let v = emb.embed("").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
        let v = emb.embed("ab").await.unwrap();
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn related_text_scores_higher() {
        let emb = HashingEmbedder::default();
        let query = emb.embed("What color is the sky?").await.unwrap();
        let sky = emb.embed("The sky is blue.").await.unwrap();
        let water = emb.embed("Water boils at 100C.").await.unwrap();

        assert!(cosine_similarity(&query, &sky) > cosine_similarity(&query, &water));
    }

    #[tokio::test]
    async fn batch_matches_single_calls() {
        let emb = HashingEmbedder::new(128);
        let texts = vec!["alpha".to_string(), "beta".to_string()];
        let batch = emb.embed_batch(&texts).await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[1], emb.embed("beta").await.unwrap());
    }

    #[test]
    fn model_id_names_the_space() {
        assert_eq!(HashingEmbedder::new(256).model_id(), "local-hash-256");
        assert_eq!(HashingEmbedder::new(0).dimension(), 1);
    }
}
