//! Case, evidence and document storage
//!
//! Context assembly only reads through [`CaseRepository`]; the CLI and the
//! seeding path write through [`CaseStore`].

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use amicus_core::{
    Case, CaseId, Document, DocumentId, DocumentStatus, DocumentVersion, EvidenceItem,
    EvidenceStatus, VersionId,
};

use crate::backend::{StorageBackend, StorageError, StorageExt};

/// Read interface used to build context packs
#[async_trait]
pub trait CaseRepository: Send + Sync {
    async fn case(&self, id: CaseId) -> Result<Option<Case>, StorageError>;

    async fn case_by_name(&self, name: &str) -> Result<Option<Case>, StorageError>;

    /// Evidence for a case, ordered by exhibit code
    async fn evidence(&self, case_id: CaseId) -> Result<Vec<EvidenceItem>, StorageError>;

    async fn document(&self, id: DocumentId) -> Result<Option<Document>, StorageError>;

    async fn document_by_title(
        &self,
        case_id: CaseId,
        title: &str,
    ) -> Result<Option<Document>, StorageError>;

    async fn version(&self, id: VersionId) -> Result<Option<DocumentVersion>, StorageError>;
}

/// Fields for a new exhibit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvidence {
    pub exhibit_code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub criterion_tags: Vec<String>,
    pub strength: u8,
    #[serde(default)]
    pub status: EvidenceStatus,
}

/// Fields for a new document revision
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub storage_url: String,
    pub text_extract: String,
    pub notes: String,
    pub created_by: String,
}

/// Key/value backed case store
#[derive(Debug)]
pub struct CaseStore<B: StorageBackend + ?Sized> {
    backend: Arc<B>,
    /// Serializes writers so id counters and name indexes stay consistent
    write_lock: Mutex<()>,
}

impl<B: StorageBackend + ?Sized> CaseStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            write_lock: Mutex::new(()),
        }
    }

    fn case_key(id: CaseId) -> String {
        format!("case:{:08}", id)
    }

    fn case_name_key(name: &str) -> String {
        format!("case_name:{}", name)
    }

    fn evidence_prefix(case_id: CaseId) -> String {
        format!("evidence:{:08}:", case_id)
    }

    fn document_key(id: DocumentId) -> String {
        format!("document:{:08}", id)
    }

    fn document_title_key(case_id: CaseId, title: &str) -> String {
        format!("doc_title:{:08}:{}", case_id, title)
    }

    fn version_key(id: VersionId) -> String {
        format!("version:{:08}", id)
    }

    async fn next_id(&self, kind: &str) -> Result<u64, StorageError> {
        let key = format!("seq:{}", kind);
        let next = self.backend.get::<u64>(&key).await?.unwrap_or(0) + 1;
        self.backend.set(&key, &next).await?;
        Ok(next)
    }

    async fn require_case(&self, id: CaseId) -> Result<Case, StorageError> {
        self.backend
            .get(&Self::case_key(id))
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("case {}", id)))
    }

    /// Create a case, or update memo and lock mode when the name exists
    pub async fn upsert_case(
        &self,
        name: &str,
        memo: serde_json::Value,
        lock_mode: bool,
    ) -> Result<Case, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::Invalid("case name must not be empty".into()));
        }

        let _guard = self.write_lock.lock().await;
        let now = Utc::now();

        let case = match self.case_by_name(name).await? {
            Some(mut existing) => {
                existing.memo = memo;
                existing.lock_mode = lock_mode;
                existing.updated_at = now;
                tracing::info!(case_id = existing.id, name, "Updated case");
                existing
            }
            None => {
                let id = self.next_id("case").await?;
                self.backend.set(&Self::case_name_key(name), &id).await?;
                tracing::info!(case_id = id, name, "Created case");
                Case {
                    id,
                    name: name.to_string(),
                    memo,
                    lock_mode,
                    created_at: now,
                    updated_at: now,
                }
            }
        };

        self.backend.set(&Self::case_key(case.id), &case).await?;
        Ok(case)
    }

    /// All cases, ordered by name
    pub async fn list_cases(&self) -> Result<Vec<Case>, StorageError> {
        let mut cases = Vec::new();
        for key in self.backend.list_keys("case:").await? {
            if let Some(case) = self.backend.get::<Case>(&key).await? {
                cases.push(case);
            }
        }
        cases.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(cases)
    }

    /// Add or replace an exhibit; the exhibit code is unique per case
    pub async fn add_evidence(
        &self,
        case_id: CaseId,
        new: NewEvidence,
    ) -> Result<EvidenceItem, StorageError> {
        if !(1..=5).contains(&new.strength) {
            return Err(StorageError::Invalid(format!(
                "strength must be 1..=5, got {}",
                new.strength
            )));
        }
        let code = new.exhibit_code.trim().to_string();
        if code.is_empty() {
            return Err(StorageError::Invalid("exhibit code must not be empty".into()));
        }

        let _guard = self.write_lock.lock().await;
        self.require_case(case_id).await?;

        let key = format!("{}{}", Self::evidence_prefix(case_id), code);
        let existing: Option<EvidenceItem> = self.backend.get(&key).await?;
        let (id, created_at) = match existing {
            Some(item) => (item.id, item.created_at),
            None => (self.next_id("evidence").await?, Utc::now()),
        };

        let item = EvidenceItem {
            id,
            case_id,
            exhibit_code: code,
            title: new.title,
            description: new.description,
            criterion_tags: new.criterion_tags,
            strength: new.strength,
            status: new.status,
            created_at,
        };
        self.backend.set(&key, &item).await?;
        Ok(item)
    }

    /// Register a document, returning the existing one when the title is taken
    pub async fn add_document(
        &self,
        case_id: CaseId,
        doc_type: &str,
        title: &str,
    ) -> Result<Document, StorageError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(StorageError::Invalid("document title must not be empty".into()));
        }

        let _guard = self.write_lock.lock().await;
        self.require_case(case_id).await?;

        if let Some(existing) = self.document_by_title(case_id, title).await? {
            return Ok(existing);
        }

        let id = self.next_id("document").await?;
        let document = Document {
            id,
            case_id,
            doc_type: doc_type.to_string(),
            title: title.to_string(),
            status: DocumentStatus::Draft,
            current_version_id: None,
            created_at: Utc::now(),
        };
        self.backend
            .set(&Self::document_title_key(case_id, title), &id)
            .await?;
        self.backend.set(&Self::document_key(id), &document).await?;
        Ok(document)
    }

    /// Append a revision and make it the document's current version
    pub async fn add_version(
        &self,
        document_id: DocumentId,
        new: NewVersion,
    ) -> Result<DocumentVersion, StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut document: Document = self
            .backend
            .get(&Self::document_key(document_id))
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("document {}", document_id)))?;

        let id = self.next_id("version").await?;
        let version = DocumentVersion {
            id,
            document_id,
            storage_url: new.storage_url,
            text_extract: new.text_extract,
            notes: new.notes,
            created_by: new.created_by,
            created_at: Utc::now(),
        };
        self.backend.set(&Self::version_key(id), &version).await?;

        document.current_version_id = Some(id);
        self.backend
            .set(&Self::document_key(document_id), &document)
            .await?;
        Ok(version)
    }

    /// Documents of a case, ordered by title
    pub async fn list_documents(&self, case_id: CaseId) -> Result<Vec<Document>, StorageError> {
        let prefix = format!("doc_title:{:08}:", case_id);
        let mut documents = Vec::new();
        for key in self.backend.list_keys(&prefix).await? {
            if let Some(id) = self.backend.get::<DocumentId>(&key).await? {
                if let Some(document) = self.document(id).await? {
                    documents.push(document);
                }
            }
        }
        Ok(documents)
    }
}

#[async_trait]
impl<B: StorageBackend + ?Sized> CaseRepository for CaseStore<B> {
    async fn case(&self, id: CaseId) -> Result<Option<Case>, StorageError> {
        self.backend.get(&Self::case_key(id)).await
    }

    async fn case_by_name(&self, name: &str) -> Result<Option<Case>, StorageError> {
        match self
            .backend
            .get::<CaseId>(&Self::case_name_key(name.trim()))
            .await?
        {
            Some(id) => self.case(id).await,
            None => Ok(None),
        }
    }

    async fn evidence(&self, case_id: CaseId) -> Result<Vec<EvidenceItem>, StorageError> {
        let mut items = Vec::new();
        for key in self.backend.list_keys(&Self::evidence_prefix(case_id)).await? {
            if let Some(item) = self.backend.get::<EvidenceItem>(&key).await? {
                items.push(item);
            }
        }
        items.sort_by(|a, b| a.exhibit_code.cmp(&b.exhibit_code));
        Ok(items)
    }

    async fn document(&self, id: DocumentId) -> Result<Option<Document>, StorageError> {
        self.backend.get(&Self::document_key(id)).await
    }

    async fn document_by_title(
        &self,
        case_id: CaseId,
        title: &str,
    ) -> Result<Option<Document>, StorageError> {
        match self
            .backend
            .get::<DocumentId>(&Self::document_title_key(case_id, title.trim()))
            .await?
        {
            Some(id) => self.document(id).await,
            None => Ok(None),
        }
    }

    async fn version(&self, id: VersionId) -> Result<Option<DocumentVersion>, StorageError> {
        self.backend.get(&Self::version_key(id)).await
    }
}
