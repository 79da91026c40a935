//! Per-conversation session state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::case::CaseId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No active case for conversation {0}. Use `case use <name>` first.")]
    NoActiveCase(String),
}

/// Which case a conversation is working on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatSession {
    pub conversation_id: String,
    pub active_case_id: Option<CaseId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(conversation_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            conversation_id: conversation_id.into(),
            active_case_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn activate(&mut self, case_id: CaseId) {
        self.active_case_id = Some(case_id);
        self.updated_at = Utc::now();
    }

    pub fn active_case(&self) -> Result<CaseId, SessionError> {
        self.active_case_id
            .ok_or_else(|| SessionError::NoActiveCase(self.conversation_id.clone()))
    }
}
