//! Canonical run inputs and their fingerprint
//!
//! The fingerprint is a SHA-256 over the RFC 8785 (JCS) serialization of a
//! [`PromptPack`], so it is stable across platforms and field order. It is
//! recorded for audit traceability only; runs are never skipped because a
//! fingerprint was seen before.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::case::{CaseId, RunMode};
use crate::context::ContextPack;
use crate::hash::Hash;

#[derive(Debug, Error)]
pub enum FingerprintError {
    #[error("Canonical serialization failed: {0}")]
    Serialization(String),
}

/// Names of the providers that took part in a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderNames {
    pub a: String,
    pub b: String,
    pub judge: String,
}

/// Snapshot of a run's canonical inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPack {
    pub case_id: CaseId,
    pub case_name: String,
    pub mode: RunMode,
    pub lock_mode: bool,
    pub has_document_text: bool,
    pub user_task: String,
    pub rag_included: bool,
    pub providers: ProviderNames,
}

impl PromptPack {
    pub fn new(
        ctx: &ContextPack,
        mode: RunMode,
        user_task: &str,
        rag_included: bool,
        providers: ProviderNames,
    ) -> Self {
        Self {
            case_id: ctx.case_id,
            case_name: ctx.case_name.clone(),
            mode,
            lock_mode: ctx.lock_mode,
            has_document_text: ctx.has_document_text(),
            user_task: user_task.to_string(),
            rag_included,
            providers,
        }
    }

    /// Canonical (JCS) bytes of this pack
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, FingerprintError> {
        serde_jcs::to_vec(self).map_err(|e| FingerprintError::Serialization(e.to_string()))
    }

    /// SHA-256 over the canonical bytes
    pub fn fingerprint(&self) -> Result<Hash, FingerprintError> {
        Ok(Hash::digest(&self.canonical_bytes()?))
    }

    /// JSON snapshot stored alongside the debate record
    pub fn snapshot(&self) -> Result<serde_json::Value, FingerprintError> {
        serde_json::to_value(self).map_err(|e| FingerprintError::Serialization(e.to_string()))
    }
}
