//! # Amicus Persistence
//!
//! Storage for case bookkeeping, conversation sessions, the debate audit log
//! and the retrieval chunk index.
//!
//! Supports:
//! - In-memory (for testing)
//! - SQLite (single node, default)

pub mod backend;
pub mod case_store;
pub mod run_store;
pub mod session_store;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod vector_store;

pub use backend::{MemoryBackend, StorageBackend, StorageError, StorageExt};
pub use case_store::{CaseRepository, CaseStore, NewEvidence, NewVersion};
pub use run_store::{DebateRecord, NewDebateRecord, RunId, RunStore};
pub use session_store::SessionStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteBackend, SqliteConfig};
#[cfg(feature = "sqlite")]
pub use vector_store::SqliteVectorIndex;
pub use vector_store::{
    cosine_distance, ChunkHit, ChunkRecord, MemoryVectorIndex, PendingChunk, SourceInfo,
    VectorError, VectorIndex,
};
