//! Context packs handed to the debate orchestrator
//!
//! A [`ContextPack`] is built once per invocation and never mutated by the
//! debate. Its memo has already been normalized into a fixed [`Memo`].

use serde::{Deserialize, Serialize};

use crate::case::CaseId;

/// Bilingual case memo with one slot per language
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub en: Option<String>,
    pub ru: Option<String>,
}

impl Memo {
    /// Normalize a free-form memo object.
    ///
    /// Each language accepts either its short key (`en`) or the long form
    /// (`memo_en`); the short key wins when both are present. Blank values
    /// count as missing.
    pub fn normalize(raw: &serde_json::Value) -> Self {
        Self {
            en: Self::lookup(raw, &["en", "memo_en"]),
            ru: Self::lookup(raw, &["ru", "memo_ru"]),
        }
    }

    fn lookup(raw: &serde_json::Value, keys: &[&str]) -> Option<String> {
        keys.iter()
            .filter_map(|key| raw.get(*key).and_then(|v| v.as_str()))
            .map(str::trim)
            .find(|text| !text.is_empty())
            .map(str::to_string)
    }
}

/// Everything the prompt renderer needs to know about a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextPack {
    pub case_id: CaseId,
    pub case_name: String,
    pub lock_mode: bool,
    pub memo: Memo,
    /// Rendered evidence lines, not raw rows
    pub evidence_summary: String,
    /// Extracted document text, when requested and resolvable
    pub document_text: Option<String>,
    /// Retrieved grounding snippets, when retrieval ran before assembly
    pub retrieved_snippets: Option<String>,
}

impl ContextPack {
    /// Attach retrieved snippets; empty text means no grounding
    pub fn with_snippets(mut self, snippets: impl Into<String>) -> Self {
        let snippets = snippets.into();
        self.retrieved_snippets = if snippets.trim().is_empty() {
            None
        } else {
            Some(snippets)
        };
        self
    }

    pub fn has_document_text(&self) -> bool {
        self.document_text
            .as_deref()
            .is_some_and(|text| !text.is_empty())
    }
}
