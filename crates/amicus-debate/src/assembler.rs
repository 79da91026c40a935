//! Context assembly: case + evidence + optional document text -> ContextPack

use std::sync::Arc;
use thiserror::Error;

use amicus_core::{CaseId, ContextPack, DocumentId, DocumentVersion, EvidenceItem, Memo, VersionId};
use amicus_persist::{CaseRepository, StorageError};

/// Evidence lines shown before the omitted-count line
pub const MAX_EVIDENCE_LINES: usize = 40;

#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("Case {0} not found")]
    CaseNotFound(CaseId),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Which document text to include
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentSelector {
    /// The document's current version
    Document(DocumentId),
    /// A specific version
    Version(VersionId),
}

/// One line per exhibit, capped, with a trailing count of what was left out
pub fn summarize_evidence(items: &[EvidenceItem], max_items: usize) -> String {
    let mut lines: Vec<String> = items
        .iter()
        .take(max_items)
        .map(|e| {
            format!(
                "- {}: {} | tags=[{}] | status={} | strength={}",
                e.exhibit_code,
                e.title,
                e.criterion_tags.join(", "),
                e.status.as_str(),
                e.strength
            )
        })
        .collect();

    if items.len() > max_items {
        lines.push(format!(
            "... ({} more exhibits not shown)",
            items.len() - max_items
        ));
    }
    lines.join("\n").trim().to_string()
}

/// Builds context packs from the case repository
#[derive(Clone)]
pub struct ContextAssembler {
    repo: Arc<dyn CaseRepository>,
}

impl std::fmt::Debug for ContextAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextAssembler").finish_non_exhaustive()
    }
}

impl ContextAssembler {
    pub fn new(repo: Arc<dyn CaseRepository>) -> Self {
        Self { repo }
    }

    /// Assemble the context for one invocation
    ///
    /// A missing case is an error. A document or version that can not be
    /// resolved, or that belongs to another case, just yields no text.
    pub async fn build(
        &self,
        case_id: CaseId,
        selector: Option<DocumentSelector>,
        include_document_text: bool,
    ) -> Result<ContextPack, AssembleError> {
        let case = self
            .repo
            .case(case_id)
            .await?
            .ok_or(AssembleError::CaseNotFound(case_id))?;

        let evidence = self.repo.evidence(case_id).await?;
        let evidence_summary = summarize_evidence(&evidence, MAX_EVIDENCE_LINES);

        let document_text = match selector {
            Some(selector) if include_document_text => {
                self.resolve_version(case_id, selector)
                    .await?
                    .map(|v| v.text_extract)
                    .filter(|text| !text.is_empty())
            }
            _ => None,
        };

        tracing::debug!(
            case_id,
            exhibits = evidence.len(),
            has_document_text = document_text.is_some(),
            "Assembled context"
        );

        Ok(ContextPack {
            case_id: case.id,
            case_name: case.name,
            lock_mode: case.lock_mode,
            memo: Memo::normalize(&case.memo),
            evidence_summary,
            document_text,
            retrieved_snippets: None,
        })
    }

    async fn resolve_version(
        &self,
        case_id: CaseId,
        selector: DocumentSelector,
    ) -> Result<Option<DocumentVersion>, AssembleError> {
        let version = match selector {
            DocumentSelector::Version(id) => self.repo.version(id).await?,
            DocumentSelector::Document(id) => match self.repo.document(id).await? {
                Some(doc) if doc.case_id == case_id => match doc.current_version_id {
                    Some(version_id) => self.repo.version(version_id).await?,
                    None => None,
                },
                _ => None,
            },
        };

        let Some(version) = version else {
            tracing::debug!(case_id, ?selector, "Document text not resolvable");
            return Ok(None);
        };

        // A version id from another case must not leak its text
        match self.repo.document(version.document_id).await? {
            Some(doc) if doc.case_id == case_id => Ok(Some(version)),
            _ => {
                tracing::warn!(case_id, version_id = version.id, "Version belongs to another case");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amicus_core::EvidenceStatus;
    use amicus_persist::{CaseStore, MemoryBackend, NewEvidence, NewVersion};
    use serde_json::json;

    fn evidence(code: &str, tags: &[&str]) -> NewEvidence {
        NewEvidence {
            exhibit_code: code.into(),
            title: format!("Exhibit {code}"),
            description: String::new(),
            criterion_tags: tags.iter().map(|t| t.to_string()).collect(),
            strength: 4,
            status: EvidenceStatus::Verified,
        }
    }

    async fn store() -> Arc<CaseStore<MemoryBackend>> {
        Arc::new(CaseStore::new(Arc::new(MemoryBackend::new())))
    }

    #[tokio::test]
    async fn test_missing_case_is_not_found() {
        let assembler = ContextAssembler::new(store().await);
        let err = assembler.build(42, None, false).await.unwrap_err();
        assert!(matches!(err, AssembleError::CaseNotFound(42)));
    }

    #[tokio::test]
    async fn test_evidence_lines_and_memo() {
        let store = store().await;
        let case = store
            .upsert_case("Acme Researcher", json!({"memo_en": "Field: Data Science"}), true)
            .await
            .unwrap();
        store
            .add_evidence(case.id, evidence("B-2", &["judging"]))
            .await
            .unwrap();
        store
            .add_evidence(case.id, evidence("A-1", &["awards", "press"]))
            .await
            .unwrap();

        let ctx = ContextAssembler::new(store)
            .build(case.id, None, true)
            .await
            .unwrap();
        assert_eq!(ctx.memo.en.as_deref(), Some("Field: Data Science"));
        assert_eq!(
            ctx.evidence_summary,
            "- A-1: Exhibit A-1 | tags=[awards, press] | status=verified | strength=4\n\
             - B-2: Exhibit B-2 | tags=[judging] | status=verified | strength=4"
        );
        assert!(ctx.document_text.is_none());
    }

    #[tokio::test]
    async fn test_evidence_summary_is_capped() {
        let store = store().await;
        let case = store.upsert_case("Big", json!({}), false).await.unwrap();
        for i in 0..45 {
            store
                .add_evidence(case.id, evidence(&format!("E-{i:02}"), &[]))
                .await
                .unwrap();
        }

        let ctx = ContextAssembler::new(store)
            .build(case.id, None, false)
            .await
            .unwrap();
        let lines: Vec<&str> = ctx.evidence_summary.lines().collect();
        assert_eq!(lines.len(), 41);
        assert_eq!(lines[40], "... (5 more exhibits not shown)");
    }

    #[tokio::test]
    async fn test_document_text_only_when_requested_and_resolvable() {
        let store = store().await;
        let case = store.upsert_case("Acme", json!({}), true).await.unwrap();
        let other = store.upsert_case("Other", json!({}), true).await.unwrap();
        let doc = store.add_document(case.id, "petition", "Petition Letter").await.unwrap();
        let version = store
            .add_version(
                doc.id,
                NewVersion {
                    storage_url: "file://petition-v1.txt".into(),
                    text_extract: "I am extraordinary.".into(),
                    notes: String::new(),
                    created_by: "tests".into(),
                },
            )
            .await
            .unwrap();

        let assembler = ContextAssembler::new(store);

        let with = assembler
            .build(case.id, Some(DocumentSelector::Document(doc.id)), true)
            .await
            .unwrap();
        assert_eq!(with.document_text.as_deref(), Some("I am extraordinary."));

        let by_version = assembler
            .build(case.id, Some(DocumentSelector::Version(version.id)), true)
            .await
            .unwrap();
        assert_eq!(by_version.document_text, with.document_text);

        let not_requested = assembler
            .build(case.id, Some(DocumentSelector::Document(doc.id)), false)
            .await
            .unwrap();
        assert!(not_requested.document_text.is_none());

        let missing = assembler
            .build(case.id, Some(DocumentSelector::Version(999)), true)
            .await
            .unwrap();
        assert!(missing.document_text.is_none());

        let foreign = assembler
            .build(other.id, Some(DocumentSelector::Version(version.id)), true)
            .await
            .unwrap();
        assert!(foreign.document_text.is_none());
    }

    #[test]
    fn test_summarize_empty() {
        assert_eq!(summarize_evidence(&[], MAX_EVIDENCE_LINES), "");
    }
}
