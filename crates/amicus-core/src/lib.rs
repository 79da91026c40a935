//! # Amicus Core
//!
//! Core types shared by every Amicus crate:
//! - [`Case`], [`EvidenceItem`], [`Document`], [`DocumentVersion`]: case bookkeeping entities
//! - [`ContextPack`]: the immutable, per-invocation view of a case handed to the debate
//! - [`PromptPack`]: canonical run inputs and their [`Hash`] fingerprint
//! - [`ChatSession`]: per-conversation active case

pub mod case;
pub mod context;
pub mod fingerprint;
pub mod hash;
pub mod session;

pub use case::{
    Case, CaseId, Document, DocumentId, DocumentStatus, DocumentVersion, EvidenceId,
    EvidenceItem, EvidenceStatus, RunMode, VersionId,
};
pub use context::{ContextPack, Memo};
pub use fingerprint::{FingerprintError, PromptPack, ProviderNames};
pub use hash::Hash;
pub use session::{ChatSession, SessionError};
