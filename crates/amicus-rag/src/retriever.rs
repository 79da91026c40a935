//! Query-time retrieval: embed, search, render snippets

use std::sync::Arc;
use thiserror::Error;

use amicus_llm::{Embedder, EmbeddingError};
use amicus_persist::{ChunkHit, VectorError, VectorIndex};

pub const DEFAULT_TOP_K: usize = 8;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Index error: {0}")]
    Index(#[from] VectorError),
    #[error("Embedder returned no vector for the query")]
    EmptyEmbedding,
}

#[derive(Debug, Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Nearest chunks for `query`, closest first
    pub async fn retrieve_hits(
        &self,
        query: &str,
        categories: Option<&[String]>,
        top_k: usize,
    ) -> Result<Vec<ChunkHit>, RetrievalError> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self.embedder.embed(&[query.to_string()]).await?;
        let vector = vectors.pop().ok_or(RetrievalError::EmptyEmbedding)?;
        let hits = self.index.query(&vector, categories, top_k).await?;

        metrics::counter!("amicus_rag_queries_total").increment(1);
        tracing::debug!(
            hits = hits.len(),
            top_k,
            categories = ?categories,
            "Retrieved snippets"
        );
        Ok(hits)
    }

    /// Rendered snippet block; empty when nothing matches
    pub async fn retrieve(
        &self,
        query: &str,
        categories: Option<&[String]>,
        top_k: usize,
    ) -> Result<String, RetrievalError> {
        let hits = self.retrieve_hits(query, categories, top_k).await?;
        Ok(render(&hits))
    }
}

/// Render hits as `[category] title / URL / CHUNK / --- / text` blocks
pub fn render(hits: &[ChunkHit]) -> String {
    hits.iter()
        .map(|hit| {
            let c = &hit.chunk;
            format!(
                "[{}] {}\nURL: {}\nCHUNK: {}\n---\n{}\n",
                c.category, c.source_title, c.source_url, c.chunk_id, c.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}
