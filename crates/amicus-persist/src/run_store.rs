//! Append-only debate record storage with hash chaining
//!
//! Every record carries `record_hash`, the SHA-256 of its canonical (JCS)
//! content chained with the previous record's hash. Records are written
//! once and never updated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use amicus_core::{CaseId, Hash, RunMode};

use crate::backend::{StorageBackend, StorageError, StorageExt};

pub type RunId = u64;

/// Content of a finished debate, before it is assigned an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDebateRecord {
    pub case_id: CaseId,
    pub mode: RunMode,
    /// Fingerprint of the run's canonical inputs
    pub inputs_hash: Hash,
    /// Snapshot of the canonical inputs
    pub prompt_pack: serde_json::Value,
    pub model_a_output: String,
    pub model_b_output: String,
    /// A's critique of B
    pub critique_a: String,
    /// B's critique of A
    pub critique_b: String,
    pub judge_output: String,
}

/// A stored debate run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateRecord {
    pub id: RunId,
    #[serde(flatten)]
    pub content: NewDebateRecord,
    pub created_at: DateTime<Utc>,
    pub previous_hash: Option<Hash>,
    pub record_hash: Hash,
}

#[derive(Serialize)]
struct HashedContent<'a> {
    id: RunId,
    #[serde(flatten)]
    content: &'a NewDebateRecord,
    created_at: &'a DateTime<Utc>,
}

impl DebateRecord {
    fn compute_hash(
        id: RunId,
        content: &NewDebateRecord,
        created_at: &DateTime<Utc>,
        previous: Option<&Hash>,
    ) -> Result<Hash, StorageError> {
        let bytes = serde_jcs::to_vec(&HashedContent {
            id,
            content,
            created_at,
        })
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let own = Hash::digest(&bytes);
        Ok(match previous {
            Some(prev) => Hash::chain(prev, &own),
            None => own,
        })
    }

    /// Recompute the hash from stored content
    pub fn expected_hash(&self) -> Result<Hash, StorageError> {
        Self::compute_hash(
            self.id,
            &self.content,
            &self.created_at,
            self.previous_hash.as_ref(),
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct ChainHead {
    next_id: RunId,
    last_hash: Option<Hash>,
}

/// Debate record store
#[derive(Debug)]
pub struct RunStore<B: StorageBackend + ?Sized> {
    backend: Arc<B>,
    prefix: String,
    /// Lazily loaded from the backend on first append
    head: Mutex<Option<ChainHead>>,
}

impl<B: StorageBackend + ?Sized> RunStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            prefix: "run:".to_string(),
            head: Mutex::new(None),
        }
    }

    fn key(&self, id: RunId) -> String {
        format!("{}{:012}", self.prefix, id)
    }

    async fn load_head(&self) -> Result<ChainHead, StorageError> {
        let keys = self.backend.list_keys(&self.prefix).await?;
        match keys.last() {
            Some(key) => {
                let last: DebateRecord = self
                    .backend
                    .get(key)
                    .await?
                    .ok_or_else(|| StorageError::NotFound(key.clone()))?;
                Ok(ChainHead {
                    next_id: last.id + 1,
                    last_hash: Some(last.record_hash),
                })
            }
            None => Ok(ChainHead {
                next_id: 1,
                last_hash: None,
            }),
        }
    }

    /// Append a record; the id is assigned here
    ///
    /// The chain head only advances after the write succeeds, so a failed
    /// append leaves no gap and no dangling hash.
    pub async fn append(&self, content: NewDebateRecord) -> Result<DebateRecord, StorageError> {
        let mut guard = self.head.lock().await;
        let head = match *guard {
            Some(head) => head,
            None => self.load_head().await?,
        };

        let created_at = Utc::now();
        let record_hash = DebateRecord::compute_hash(
            head.next_id,
            &content,
            &created_at,
            head.last_hash.as_ref(),
        )?;
        let record = DebateRecord {
            id: head.next_id,
            content,
            created_at,
            previous_hash: head.last_hash,
            record_hash,
        };

        self.backend.set(&self.key(record.id), &record).await?;

        *guard = Some(ChainHead {
            next_id: record.id + 1,
            last_hash: Some(record.record_hash),
        });
        tracing::info!(
            run_id = record.id,
            case_id = record.content.case_id,
            mode = %record.content.mode,
            hash = %record.record_hash.short(12),
            "Recorded debate run"
        );
        Ok(record)
    }

    pub async fn get(&self, id: RunId) -> Result<Option<DebateRecord>, StorageError> {
        self.backend.get(&self.key(id)).await
    }

    /// All records in id order
    pub async fn list(&self) -> Result<Vec<DebateRecord>, StorageError> {
        let mut records = Vec::new();
        for key in self.backend.list_keys(&self.prefix).await? {
            if let Some(record) = self.backend.get::<DebateRecord>(&key).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub async fn list_by_case(&self, case_id: CaseId) -> Result<Vec<DebateRecord>, StorageError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.content.case_id == case_id)
            .collect())
    }

    /// Records created at or after `since`
    pub async fn list_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<DebateRecord>, StorageError> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| r.created_at >= since)
            .collect())
    }

    /// Verify hashes and links of the whole chain
    pub async fn verify_chain(&self) -> Result<bool, StorageError> {
        let records = self.list().await?;

        for (i, record) in records.iter().enumerate() {
            let expected_prev = if i == 0 {
                None
            } else {
                Some(records[i - 1].record_hash)
            };
            if record.previous_hash != expected_prev {
                tracing::warn!(run_id = record.id, "Chain integrity failed: broken link");
                return Ok(false);
            }
            if record.expected_hash()? != record.record_hash {
                tracing::warn!(run_id = record.id, "Chain integrity failed: content hash mismatch");
                return Ok(false);
            }
        }

        tracing::info!(records = records.len(), "Chain integrity verified");
        Ok(true)
    }
}
