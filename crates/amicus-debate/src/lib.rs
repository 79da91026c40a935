//! # Amicus Debate
//!
//! Two providers answer the same task, critique each other, and a judge
//! synthesizes a verdict. Every run is appended to a hash-chained audit log.
//!
//! ## Key Types
//!
//! - [`ContextAssembler`]: case, evidence and document text into a [`ContextPack`]
//! - [`render_prompt`]: deterministic base prompt
//! - [`DebateOrchestrator`]: the three-stage protocol
//! - [`CaseDesk`]: sessions, presets and document review on top
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use amicus_core::{ContextPack, Memo, RunMode};
//! use amicus_debate::{DebateOrchestrator, DebateParticipants};
//! use amicus_llm::MockProvider;
//! use amicus_persist::{MemoryBackend, RunStore};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let runs = Arc::new(RunStore::new(Arc::new(MemoryBackend::new())));
//! let orchestrator = DebateOrchestrator::new(runs);
//! let participants = DebateParticipants::new(
//!     Arc::new(MockProvider::echo("A-said:")),
//!     Arc::new(MockProvider::echo("B-said:")),
//! );
//! let ctx = ContextPack {
//!     case_id: 1,
//!     case_name: "Acme Researcher".into(),
//!     lock_mode: true,
//!     memo: Memo { en: Some("Field: Data Science".into()), ru: None },
//!     evidence_summary: String::new(),
//!     document_text: None,
//!     retrieved_snippets: None,
//! };
//! let outcome = orchestrator
//!     .run_debate(&ctx, RunMode::Requirements, "List the criteria", &participants, None)
//!     .await?;
//! println!("Run #{}\n\n{}", outcome.run_id, outcome.transcript.judge_output);
//! # Ok(())
//! # }
//! ```
//!
//! [`ContextPack`]: amicus_core::ContextPack

pub mod assembler;
pub mod config;
pub mod desk;
pub mod orchestrator;
pub mod presets;
pub mod prompt;
pub mod roles;

pub use assembler::{summarize_evidence, AssembleError, ContextAssembler, DocumentSelector};
pub use config::DebateSettings;
pub use desk::{CaseDesk, DeskError, DeskReply};
pub use orchestrator::{
    DebateConfig, DebateError, DebateOrchestrator, DebateOutcome, DebateParticipants,
    DebateStage, DebateTranscript, JudgeFallback,
};
pub use presets::{preset, Preset, PRESETS, REVIEW_TASK};
pub use prompt::{critique_prompt, judge_prompt, render_prompt, Debater, JudgeInputs};
pub use roles::{Role, StageParams};
