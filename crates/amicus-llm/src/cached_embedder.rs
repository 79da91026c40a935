//! Cached embedder wrapper using Moka
//!
//! Ingesting a source twice embeds mostly identical chunks, and queries
//! repeat. Vectors are keyed by SHA-256 of model and text.

use async_trait::async_trait;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::embedding::{check_batch, Embedder, EmbeddingError};

/// Configuration for the embedding cache
#[derive(Debug, Clone)]
pub struct EmbeddingCacheConfig {
    /// Maximum number of cached vectors
    pub max_entries: u64,
    /// Time-to-live for cached entries
    pub ttl: Duration,
}

impl Default for EmbeddingCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            ttl: Duration::from_secs(3600),
        }
    }
}

fn cache_key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update(b"|");
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Embedder wrapper that only sends uncached texts to the inner embedder
#[derive(Debug)]
pub struct CachedEmbedder<E: Embedder> {
    inner: E,
    cache: Cache<String, Vec<f32>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<E: Embedder> CachedEmbedder<E> {
    pub fn new(embedder: E, config: EmbeddingCacheConfig) -> Self {
        Self {
            inner: embedder,
            cache: Cache::builder()
                .max_capacity(config.max_entries)
                .time_to_live(config.ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Create with default configuration
    pub fn wrap(embedder: E) -> Self {
        Self::new(embedder, EmbeddingCacheConfig::default())
    }

    /// (hits, misses)
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }
}

#[async_trait]
impl<E: Embedder + 'static> Embedder for CachedEmbedder<E> {
    fn model(&self) -> &str {
        self.inner.model()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let keys: Vec<String> = texts
            .iter()
            .map(|t| cache_key(self.inner.model(), t))
            .collect();

        let mut out: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing = Vec::new();
        for (i, key) in keys.iter().enumerate() {
            let cached = self.cache.get(key).await;
            if cached.is_none() {
                missing.push(i);
            }
            out.push(cached);
        }

        self.hits
            .fetch_add((texts.len() - missing.len()) as u64, Ordering::Relaxed);
        self.misses
            .fetch_add(missing.len() as u64, Ordering::Relaxed);

        if !missing.is_empty() {
            let batch: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let vectors = self.inner.embed(&batch).await?;
            check_batch(&vectors, batch.len(), self.inner.dimension())?;

            for (&i, vector) in missing.iter().zip(vectors) {
                self.cache.insert(keys[i].clone(), vector.clone()).await;
                out[i] = Some(vector);
            }
            tracing::debug!(fresh = missing.len(), total = texts.len(), "Embedding cache fill");
        }

        Ok(out.into_iter().flatten().collect())
    }
}
