//! Case bookkeeping entities
//!
//! These are read by context assembly and written by the case store. Only
//! the fields the debate pipeline needs are modelled.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type CaseId = u64;
pub type EvidenceId = u64;
pub type DocumentId = u64;
pub type VersionId = u64;

/// A petition case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    /// Unique display name
    pub name: String,
    /// Canonical memo as free-form JSON (language keys, pillars, criteria, ...)
    pub memo: serde_json::Value,
    /// When set, the field of endeavor and case goal must not drift
    pub lock_mode: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStatus {
    #[default]
    Draft,
    Verified,
    Archived,
}

impl EvidenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Verified => "verified",
            Self::Archived => "archived",
        }
    }
}

impl FromStr for EvidenceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "verified" => Ok(Self::Verified),
            "archived" => Ok(Self::Archived),
            other => Err(format!("unknown evidence status: {other}")),
        }
    }
}

/// One exhibit in the evidence registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceItem {
    pub id: EvidenceId,
    pub case_id: CaseId,
    /// Exhibit code, e.g. "B-5"; unique within a case
    pub exhibit_code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Criterion tags such as "awards", "judging", "critical_role"
    #[serde(default)]
    pub criterion_tags: Vec<String>,
    /// 1..=5
    pub strength: u8,
    #[serde(default)]
    pub status: EvidenceStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Reviewed,
    Approved,
    Filed,
    RfeResponse,
    Final,
}

/// A case document (petition, support letter, resume, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub case_id: CaseId,
    pub doc_type: String,
    /// Unique within a case
    pub title: String,
    #[serde(default)]
    pub status: DocumentStatus,
    pub current_version_id: Option<VersionId>,
    pub created_at: DateTime<Utc>,
}

/// An immutable revision of a document with its extracted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub id: VersionId,
    pub document_id: DocumentId,
    /// Where the raw file lives
    pub storage_url: String,
    /// Plain text extracted for model work
    pub text_extract: String,
    #[serde(default)]
    pub notes: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// What a debate run is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Review,
    Requirements,
    Fees,
    Filing,
    Premium,
    CriteriaMap,
    Strengthen,
    Wording,
    RfeDrill,
    #[default]
    General,
}

impl RunMode {
    pub const ALL: [RunMode; 10] = [
        Self::Review,
        Self::Requirements,
        Self::Fees,
        Self::Filing,
        Self::Premium,
        Self::CriteriaMap,
        Self::Strengthen,
        Self::Wording,
        Self::RfeDrill,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Review => "review",
            Self::Requirements => "requirements",
            Self::Fees => "fees",
            Self::Filing => "filing",
            Self::Premium => "premium",
            Self::CriteriaMap => "criteria_map",
            Self::Strengthen => "strengthen",
            Self::Wording => "wording",
            Self::RfeDrill => "rfe_drill",
            Self::General => "general",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| format!("unknown run mode: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_mode_round_trips_through_str() {
        for mode in RunMode::ALL {
            assert_eq!(mode.as_str().parse::<RunMode>().unwrap(), mode);
        }
        assert!("appeal".parse::<RunMode>().is_err());
    }

    #[test]
    fn test_run_mode_serde_matches_as_str() {
        let json = serde_json::to_string(&RunMode::RfeDrill).unwrap();
        assert_eq!(json, "\"rfe_drill\"");
    }

    #[test]
    fn test_evidence_status_defaults_to_draft() {
        let json = r#"{
            "id": 1, "case_id": 1, "exhibit_code": "A-1", "title": "Award",
            "strength": 4, "created_at": "2026-01-01T00:00:00Z"
        }"#;
        let item: EvidenceItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.status, EvidenceStatus::Draft);
        assert!(item.criterion_tags.is_empty());
    }
}
