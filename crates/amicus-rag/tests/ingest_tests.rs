use async_trait::async_trait;
use std::sync::Arc;

use amicus_llm::{Embedder, EmbeddingError, HashingEmbedder};
use amicus_persist::{MemoryVectorIndex, VectorIndex};
use amicus_rag::{ChunkerConfig, FetchedPage, IngestError, Ingestor, Retriever};

const DIM: usize = 64;

#[derive(Debug)]
struct BrokenEmbedder;

#[async_trait]
impl Embedder for BrokenEmbedder {
    fn model(&self) -> &str {
        "broken"
    }

    fn dimension(&self) -> usize {
        DIM
    }

    async fn embed(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Err(EmbeddingError::RequestFailed("quota exceeded".into()))
    }
}

fn setup() -> (Ingestor, Retriever, Arc<MemoryVectorIndex>) {
    let embedder: Arc<dyn Embedder> = Arc::new(HashingEmbedder::new(DIM));
    let index = Arc::new(MemoryVectorIndex::new(DIM));
    let ingestor = Ingestor::new(embedder.clone(), index.clone())
        .unwrap()
        .with_chunker(ChunkerConfig::new(120, 0));
    let retriever = Retriever::new(embedder, index.clone());
    (ingestor, retriever, index)
}

fn page(url: &str, title: &str, paragraphs: &[&str]) -> FetchedPage {
    FetchedPage::from_text(url, title, &paragraphs.join("\n\n"))
}

const FEES: &[&str] = &[
    "The filing fee for Form I-140 is listed on the fee schedule and must be paid per petition.",
    "Premium processing under Form I-907 carries its own fee, separate from the I-140 fee.",
];

const FILING: &[&str] = &[
    "Mail Form I-140 to the lockbox listed for your classification.",
    "Online filing is available for some petitions through a USCIS online account.",
    "Direct filing addresses depend on where the beneficiary works.",
    "Courier deliveries use a different street address than postal mail.",
    "Include the signed form and any required supporting evidence.",
];

#[tokio::test]
async fn reingesting_unchanged_page_is_a_noop() {
    let (ingestor, _, index) = setup();
    let fees = page("https://www.uscis.gov/forms/filing-fees", "USCIS Filing Fees", FEES);

    let first = ingestor.ingest_page("fees", &fees).await.unwrap();
    assert_eq!(first.chunks, 2);
    assert_eq!(first.upserted, 2);

    let again = ingestor.ingest_page("fees", &fees).await.unwrap();
    assert_eq!(again.upserted, 0);
    assert_eq!(again.pruned, 0);
    assert_eq!(index.count().await.unwrap(), 2);
}

#[tokio::test]
async fn one_changed_chunk_updates_one_row() {
    let (ingestor, _, index) = setup();
    let url = "https://www.uscis.gov/forms/filing-fees";
    ingestor
        .ingest_page("fees", &page(url, "USCIS Filing Fees", FEES))
        .await
        .unwrap();

    let changed = [FEES[0], "Premium processing fees were adjusted; check the fee calculator."];
    let report = ingestor
        .ingest_page("fees", &page(url, "USCIS Filing Fees", &changed))
        .await
        .unwrap();
    assert_eq!(report.upserted, 1);

    let rows = index.rows().await;
    assert_eq!(rows.len(), 2);
    assert!(rows[1].text.contains("adjusted"));
    // The untouched row still carries the hash of the page it came from
    assert_ne!(rows[0].metadata["raw_hash"], rows[1].metadata["raw_hash"]);
}

#[tokio::test]
async fn concurrent_ingests_of_one_page_leave_one_version() {
    let (ingestor, _, index) = setup();
    let url = "https://www.uscis.gov/forms/all-forms";
    let long = page(url, "Forms", FILING);
    let short = page(url, "Forms", &FILING[..1]);

    let (a, b) = tokio::join!(
        ingestor.ingest_page("filing", &long),
        ingestor.ingest_page("filing", &short),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let rows = index.rows().await;
    assert!(
        rows.len() == a.chunks || rows.len() == b.chunks,
        "{} rows from {} and {} chunks",
        rows.len(),
        a.chunks,
        b.chunks
    );
    let ids: Vec<&str> = rows.iter().map(|r| r.chunk_id.as_str()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    sorted.dedup();
    assert_eq!(sorted.len(), ids.len());
}

#[tokio::test]
async fn embedding_failure_commits_nothing() {
    let index = Arc::new(MemoryVectorIndex::new(DIM));
    let ingestor = Ingestor::new(Arc::new(BrokenEmbedder), index.clone()).unwrap();
    let fees = page("https://www.uscis.gov/forms/filing-fees", "USCIS Filing Fees", FEES);

    let err = ingestor.ingest_page("fees", &fees).await.unwrap_err();
    assert!(matches!(err, IngestError::Embedding(_)));
    assert_eq!(index.count().await.unwrap(), 0);
}

#[tokio::test]
async fn category_filter_limits_hits() {
    let (ingestor, retriever, _) = setup();
    ingestor
        .ingest_page(
            "fees",
            &page("https://www.uscis.gov/forms/filing-fees", "USCIS Filing Fees", FEES),
        )
        .await
        .unwrap();
    ingestor
        .ingest_page(
            "filing",
            &page(
                "https://www.uscis.gov/forms/direct-filing-addresses",
                "USCIS Direct Filing Addresses (Forms)",
                FILING,
            ),
        )
        .await
        .unwrap();

    let fees = vec!["fees".to_string()];
    let hits = retriever
        .retrieve_hits("I-140 fee", Some(&fees), 10)
        .await
        .unwrap();
    assert!(!hits.is_empty());
    assert!(hits.len() <= 2);
    assert!(hits.iter().all(|h| h.chunk.category == "fees"));

    let everything = retriever.retrieve_hits("I-140 fee", None, 10).await.unwrap();
    assert_eq!(everything.len(), 7);
    assert!(everything.windows(2).all(|w| w[0].distance <= w[1].distance));

    let rendered = retriever.retrieve("I-140 fee", Some(&fees), 10).await.unwrap();
    assert!(rendered.starts_with("[fees] USCIS Filing Fees\nURL: https://www.uscis.gov/forms/filing-fees\nCHUNK: fe-"));
    assert!(rendered.contains("\n---\n"));
}

#[tokio::test]
async fn empty_index_renders_empty_string() {
    let (_, retriever, _) = setup();
    assert_eq!(retriever.retrieve("anything", None, 8).await.unwrap(), "");
    assert!(retriever.retrieve_hits("anything", None, 0).await.unwrap().is_empty());
}
