//! Per-conversation session storage

use std::sync::Arc;

use amicus_core::{CaseId, ChatSession};

use crate::backend::{StorageBackend, StorageError, StorageExt};

/// Stores which case each conversation is working on
#[derive(Debug)]
pub struct SessionStore<B: StorageBackend + ?Sized> {
    backend: Arc<B>,
}

impl<B: StorageBackend + ?Sized> SessionStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    fn key(conversation_id: &str) -> String {
        format!("session:{}", conversation_id)
    }

    /// Load a session, starting a fresh one if none is stored
    pub async fn load(&self, conversation_id: &str) -> Result<ChatSession, StorageError> {
        Ok(self
            .backend
            .get(&Self::key(conversation_id))
            .await?
            .unwrap_or_else(|| ChatSession::new(conversation_id)))
    }

    pub async fn save(&self, session: &ChatSession) -> Result<(), StorageError> {
        self.backend
            .set(&Self::key(&session.conversation_id), session)
            .await
    }

    /// Point a conversation at a case
    pub async fn activate(
        &self,
        conversation_id: &str,
        case_id: CaseId,
    ) -> Result<ChatSession, StorageError> {
        let mut session = self.load(conversation_id).await?;
        session.activate(case_id);
        self.save(&session).await?;
        tracing::debug!(conversation_id, case_id, "Activated case");
        Ok(session)
    }
}
