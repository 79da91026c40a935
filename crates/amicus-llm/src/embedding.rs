//! Text embedders
//!
//! [`OpenAIEmbedder`] calls the embeddings endpoint. [`HashingEmbedder`] is a
//! deterministic offline fallback that projects word tokens into a fixed
//! number of buckets; it is good enough for tests and air-gapped runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 1536;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Expected {expected} embeddings, got {got}")]
    CountMismatch { expected: usize, got: usize },
    #[error("Expected dimension {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Turns texts into fixed-dimension vectors
#[async_trait]
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Model identifier
    fn model(&self) -> &str;

    /// Length of every vector this embedder returns
    fn dimension(&self) -> usize;

    /// Embed a batch; output order matches input order
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Check a batch against the expected count and dimension
pub fn check_batch(
    vectors: &[Vec<f32>],
    expected: usize,
    dimension: usize,
) -> Result<(), EmbeddingError> {
    if vectors.len() != expected {
        return Err(EmbeddingError::CountMismatch {
            expected,
            got: vectors.len(),
        });
    }
    if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
        return Err(EmbeddingError::DimensionMismatch {
            expected: dimension,
            got: bad.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

/// OpenAI embeddings client
#[derive(Debug)]
pub struct OpenAIEmbedder {
    api_key: String,
    model: String,
    dimension: usize,
    client: reqwest::Client,
    base_url: String,
}

impl OpenAIEmbedder {
    pub fn new(api_key: &str, model: &str, dimension: usize) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            dimension,
            client: reqwest::Client::new(),
            base_url: crate::openai::DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Only the v3 models accept a `dimensions` override
    fn dimensions_param(&self) -> Option<usize> {
        self.model
            .starts_with("text-embedding-3")
            .then_some(self.dimension)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimensions_param(),
        };

        let response = self
            .client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EmbeddingError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::RequestFailed(format!(
                "Status: {}, Body: {}",
                status, body
            )));
        }

        let mut api_response: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        api_response.data.sort_by_key(|d| d.index);
        let vectors: Vec<Vec<f32>> = api_response
            .data
            .into_iter()
            .map(|d| d.embedding)
            .collect();

        check_batch(&vectors, texts.len(), self.dimension)?;
        tracing::debug!(model = %self.model, count = vectors.len(), "Embedded batch");
        Ok(vectors)
    }
}

/// Deterministic feature-hashing embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Embed one text: signed token counts, L2-normalized
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();
        let mut any = false;

        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.as_bytes());
            let (bucket, sign) = self.bucket(&digest);
            vector[bucket] += sign;
            any = true;
        }

        if !any {
            // No word tokens: fall back to one bucket keyed by the raw text
            let digest = Sha256::digest(text.as_bytes());
            let (bucket, _) = self.bucket(&digest);
            vector[bucket] = 1.0;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }

    fn bucket(&self, digest: &[u8]) -> (usize, f32) {
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(head) % self.dimension as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model(&self) -> &str {
        "feature-hashing"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_hashing_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec!["Premium processing fee".to_string()];
        let a = embedder.embed(&texts).await.unwrap();
        let b = embedder.embed(&texts).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 64);
        let norm: f32 = a[0].iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_similarity_tracks_overlap() {
        let embedder = HashingEmbedder::new(256);
        let query = embedder.embed_one("I-140 filing fee");
        let close = embedder.embed_one("The filing fee for Form I-140");
        let far = embedder.embed_one("judging the work of others in the field");
        assert!(cosine(&query, &close) > cosine(&query, &far));
    }

    #[test]
    fn test_hashing_empty_text_is_not_zero() {
        let embedder = HashingEmbedder::new(16);
        let v = embedder.embed_one("  --  ");
        assert!(v.iter().any(|x| *x != 0.0));
    }

    #[test]
    fn test_check_batch() {
        assert!(check_batch(&[vec![0.0; 3]], 1, 3).is_ok());
        assert!(matches!(
            check_batch(&[vec![0.0; 3]], 2, 3),
            Err(EmbeddingError::CountMismatch { expected: 2, got: 1 })
        ));
        assert!(matches!(
            check_batch(&[vec![0.0; 2]], 1, 3),
            Err(EmbeddingError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_dimensions_param_only_for_v3() {
        assert_eq!(
            OpenAIEmbedder::new("k", "text-embedding-3-small", 512).dimensions_param(),
            Some(512)
        );
        assert_eq!(
            OpenAIEmbedder::new("k", "text-embedding-ada-002", 1536).dimensions_param(),
            None
        );
    }
}
