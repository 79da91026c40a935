//! Ingestion: page text -> chunks -> embeddings -> index rows

use std::sync::Arc;
use thiserror::Error;

use amicus_llm::{Embedder, EmbeddingError};
use amicus_persist::{PendingChunk, SourceInfo, VectorError, VectorIndex};

use crate::chunker::ChunkerConfig;
use crate::fetch::{FetchError, FetchedPage, PageFetcher};
use crate::sources::{self, OfficialSource};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),
    #[error("Index error: {0}")]
    Index(#[from] VectorError),
    #[error("Embedder dimension {embedder} does not match index dimension {index}")]
    DimensionMismatch { embedder: usize, index: usize },
}

/// What one ingested page did to the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub source_url: String,
    /// Chunks produced from the page
    pub chunks: usize,
    /// Rows inserted or changed
    pub upserted: usize,
    /// Stale rows removed
    pub pruned: usize,
}

/// Outcome of updating many sources; one bad page does not stop the rest
#[derive(Debug, Default)]
pub struct UpdateSummary {
    pub reports: Vec<IngestReport>,
    pub failures: Vec<(String, IngestError)>,
}

impl UpdateSummary {
    pub fn upserted(&self) -> usize {
        self.reports.iter().map(|r| r.upserted).sum()
    }
}

/// Chunks, embeds and upserts official pages
#[derive(Debug, Clone)]
pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chunker: ChunkerConfig,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Result<Self, IngestError> {
        if embedder.dimension() != index.dimension() {
            return Err(IngestError::DimensionMismatch {
                embedder: embedder.dimension(),
                index: index.dimension(),
            });
        }
        Ok(Self {
            embedder,
            index,
            chunker: ChunkerConfig::default(),
        })
    }

    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    /// Ingest one page under `category`
    ///
    /// Every chunk is embedded before anything is written, so an embedding
    /// failure leaves the index untouched. A page that yields no chunks is
    /// skipped without pruning.
    pub async fn ingest_page(
        &self,
        category: &str,
        page: &FetchedPage,
    ) -> Result<IngestReport, IngestError> {
        let texts = self.chunker.chunk(&page.text);
        if texts.is_empty() {
            tracing::warn!(url = %page.url, "Page produced no chunks, skipping");
            return Ok(IngestReport {
                source_url: page.url.clone(),
                chunks: 0,
                upserted: 0,
                pruned: 0,
            });
        }

        let embeddings = self.embedder.embed(&texts).await?;

        let prefix = sources::chunk_prefix(category, &page.url);
        let chunks: Vec<PendingChunk> = texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| PendingChunk {
                chunk_id: sources::chunk_id(&prefix, i),
                text,
            })
            .collect();

        let source = SourceInfo {
            category: category.to_string(),
            url: page.url.clone(),
            title: page.title.clone(),
            last_updated: page.last_updated.clone(),
            raw_hash: page.raw_hash.clone(),
        };
        let (upserted, pruned) = self
            .index
            .replace_source(&source, &chunks, &embeddings)
            .await?;

        metrics::counter!("amicus_rag_chunks_upserted_total").increment(upserted as u64);
        tracing::info!(
            url = %page.url,
            category,
            chunks = chunks.len(),
            upserted,
            pruned,
            "Ingested page"
        );

        Ok(IngestReport {
            source_url: page.url.clone(),
            chunks: chunks.len(),
            upserted,
            pruned,
        })
    }

    /// Fetch and ingest one registry source
    pub async fn ingest_source(
        &self,
        fetcher: &PageFetcher,
        source: &OfficialSource,
    ) -> Result<IngestReport, IngestError> {
        let page = fetcher.fetch(source.url, source.title).await?;
        self.ingest_page(source.category, &page).await
    }

    /// Fetch and ingest every source in `categories` (all when empty)
    pub async fn update_sources(
        &self,
        fetcher: &PageFetcher,
        categories: &[String],
    ) -> UpdateSummary {
        let mut summary = UpdateSummary::default();
        for source in sources::sources_in(categories) {
            match self.ingest_source(fetcher, source).await {
                Ok(report) => summary.reports.push(report),
                Err(e) => {
                    tracing::warn!(url = source.url, error = %e, "Source update failed");
                    summary.failures.push((source.url.to_string(), e));
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amicus_llm::HashingEmbedder;
    use amicus_persist::MemoryVectorIndex;

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let result = Ingestor::new(
            Arc::new(HashingEmbedder::new(8)),
            Arc::new(MemoryVectorIndex::new(16)),
        );
        assert!(matches!(
            result,
            Err(IngestError::DimensionMismatch {
                embedder: 8,
                index: 16
            })
        ));
    }

    #[tokio::test]
    async fn test_empty_page_is_skipped() {
        let index = Arc::new(MemoryVectorIndex::new(8));
        let ingestor = Ingestor::new(Arc::new(HashingEmbedder::new(8)), index.clone()).unwrap();
        let page = FetchedPage::from_text("https://www.uscis.gov/i-140", "I-140", "  \n\n ");

        let report = ingestor.ingest_page("form_i140", &page).await.unwrap();
        assert_eq!(report.chunks, 0);
        assert_eq!(index.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_shrinking_page_prunes_stale_chunks() {
        let index = Arc::new(MemoryVectorIndex::new(8));
        let ingestor = Ingestor::new(Arc::new(HashingEmbedder::new(8)), index.clone())
            .unwrap()
            .with_chunker(ChunkerConfig::new(40, 0));

        let long = "First paragraph about fees.\n\nSecond paragraph about forms.\n\nThird one.";
        let page = FetchedPage::from_text("https://www.uscis.gov/fees", "Fees", long);
        let report = ingestor.ingest_page("fees", &page).await.unwrap();
        assert_eq!(report.chunks, 3);

        let short = FetchedPage::from_text("https://www.uscis.gov/fees", "Fees", "First paragraph about fees.");
        let report = ingestor.ingest_page("fees", &short).await.unwrap();
        assert_eq!(report.chunks, 1);
        assert_eq!(report.upserted, 0);
        assert_eq!(report.pruned, 2);
        assert_eq!(index.count().await.unwrap(), 1);
    }
}
