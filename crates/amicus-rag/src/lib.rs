//! # Amicus RAG
//!
//! Grounding for debates from official sources.
//!
//! - [`chunker`]: paragraph-aware, overlapping text chunks
//! - [`fetch`]: official page fetching and HTML-to-text
//! - [`sources`]: the source registry and chunk id scheme
//! - [`ingest`]: page -> chunks -> embeddings -> index rows
//! - [`retriever`]: query -> top-K rendered snippet block

pub mod chunker;
pub mod fetch;
pub mod ingest;
pub mod retriever;
pub mod sources;

pub use chunker::{chunk_text, ChunkerConfig, DEFAULT_MAX_CHARS, DEFAULT_OVERLAP_CHARS};
pub use fetch::{FetchError, FetchedPage, PageFetcher};
pub use ingest::{IngestError, IngestReport, Ingestor, UpdateSummary};
pub use retriever::{render, RetrievalError, Retriever, DEFAULT_TOP_K};
pub use sources::{chunk_prefix, OfficialSource, OFFICIAL_SOURCES};
