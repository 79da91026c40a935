//! Case desk: the command-level composition of sessions, context assembly,
//! retrieval and debate

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use amicus_core::{Case, CaseId, RunMode, SessionError};
use amicus_persist::{CaseRepository, CaseStore, SessionStore, StorageBackend, StorageError};
use amicus_rag::{RetrievalError, Retriever};

use crate::assembler::{AssembleError, ContextAssembler, DocumentSelector};
use crate::orchestrator::{DebateError, DebateOrchestrator, DebateOutcome, DebateParticipants};
use crate::presets::{self, PRESET_TOP_K, REVIEW_TASK};

#[derive(Debug, Error)]
pub enum DeskError {
    #[error(transparent)]
    NoActiveCase(#[from] SessionError),
    #[error("Case '{0}' not found.")]
    CaseNotFound(String),
    #[error("Document '{0}' not found in active case.")]
    DocumentNotFound(String),
    #[error("Unknown preset '{0}'. Available: {names}", names = presets::preset_names().join(", "))]
    UnknownPreset(String),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
    #[error("Retrieval failed: {0}")]
    Retrieval(#[from] RetrievalError),
    #[error(transparent)]
    Debate(#[from] DebateError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A finished, recorded run as shown to the user
#[derive(Debug, Clone)]
pub struct DeskReply {
    pub outcome: DebateOutcome,
}

impl fmt::Display for DeskReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Run #{}\n\n{}",
            self.outcome.run_id, self.outcome.transcript.judge_output
        )
    }
}

/// Serves one store to any number of conversations
///
/// The only per-conversation state is the active case, kept in the
/// session store and loaded on every call.
pub struct CaseDesk<B: StorageBackend + ?Sized> {
    cases: Arc<CaseStore<B>>,
    sessions: SessionStore<B>,
    assembler: ContextAssembler,
    retriever: Retriever,
    orchestrator: DebateOrchestrator<B>,
    participants: DebateParticipants,
}

impl<B: StorageBackend + ?Sized + 'static> CaseDesk<B> {
    pub fn new(
        backend: Arc<B>,
        retriever: Retriever,
        orchestrator: DebateOrchestrator<B>,
        participants: DebateParticipants,
    ) -> Self {
        let cases = Arc::new(CaseStore::new(backend.clone()));
        Self {
            assembler: ContextAssembler::new(cases.clone()),
            sessions: SessionStore::new(backend),
            cases,
            retriever,
            orchestrator,
            participants,
        }
    }

    pub fn cases(&self) -> &Arc<CaseStore<B>> {
        &self.cases
    }

    /// Make `name` the active case of a conversation
    pub async fn use_case(&self, conversation_id: &str, name: &str) -> Result<Case, DeskError> {
        let case = self
            .cases
            .case_by_name(name.trim())
            .await?
            .ok_or_else(|| DeskError::CaseNotFound(name.trim().to_string()))?;
        self.sessions.activate(conversation_id, case.id).await?;
        Ok(case)
    }

    pub async fn active_case(&self, conversation_id: &str) -> Result<CaseId, DeskError> {
        Ok(self.sessions.load(conversation_id).await?.active_case()?)
    }

    /// Run a retrieval-grounded preset against the active case
    pub async fn run_preset(
        &self,
        conversation_id: &str,
        preset_name: &str,
    ) -> Result<DeskReply, DeskError> {
        let preset = presets::preset(preset_name)
            .ok_or_else(|| DeskError::UnknownPreset(preset_name.to_string()))?;
        let case_id = self.active_case(conversation_id).await?;

        let ctx = self.assembler.build(case_id, None, false).await?;
        let categories = preset.categories();
        let snippets = self
            .retriever
            .retrieve(preset.query, Some(&categories), PRESET_TOP_K)
            .await?;
        if snippets.is_empty() {
            tracing::warn!(preset = preset.name, "No snippets retrieved; run is ungrounded");
        }

        let outcome = self
            .orchestrator
            .run_debate(&ctx, preset.mode, preset.task, &self.participants, Some(&snippets))
            .await?;
        Ok(DeskReply { outcome })
    }

    /// Debate a review of one of the active case's documents
    pub async fn review_document(
        &self,
        conversation_id: &str,
        title: &str,
    ) -> Result<DeskReply, DeskError> {
        let case_id = self.active_case(conversation_id).await?;
        let document = self
            .cases
            .document_by_title(case_id, title.trim())
            .await?
            .ok_or_else(|| DeskError::DocumentNotFound(title.trim().to_string()))?;

        let ctx = self
            .assembler
            .build(case_id, Some(DocumentSelector::Document(document.id)), true)
            .await?;

        let outcome = self
            .orchestrator
            .run_debate(&ctx, RunMode::Review, REVIEW_TASK, &self.participants, None)
            .await?;
        Ok(DeskReply { outcome })
    }

    /// Debate a free-form task, optionally grounded by a retrieval query
    pub async fn ask(
        &self,
        conversation_id: &str,
        mode: RunMode,
        task: &str,
        grounding: Option<(&str, &[String])>,
    ) -> Result<DeskReply, DeskError> {
        let case_id = self.active_case(conversation_id).await?;
        let ctx = self.assembler.build(case_id, None, false).await?;

        let snippets = match grounding {
            Some((query, categories)) => Some(
                self.retriever
                    .retrieve(query, Some(categories), PRESET_TOP_K)
                    .await?,
            ),
            None => None,
        };

        let outcome = self
            .orchestrator
            .run_debate(&ctx, mode, task, &self.participants, snippets.as_deref())
            .await?;
        Ok(DeskReply { outcome })
    }
}
