//! Deterministic prompt rendering
//!
//! Sections always appear in the same order so that identical inputs give
//! byte-identical prompts:
//!
//! ```text
//! CASE: <name> (id=<id>)
//! LOCK_MODE=ON (Do not change field/goal).
//!
//! === CASE MEMO (EN) ===
//! === CASE MEMO (RU) ===
//! === EVIDENCE REGISTRY (summary) ===
//! === OFFICIAL SOURCES (RAG SNIPPETS) ===   (only with snippets)
//! === DOCUMENT TEXT ===                     (only with document text)
//! === TASK ===
//!
//! MODE=<mode>
//! ```

use amicus_core::{ContextPack, RunMode};

const NO_MEMO_EN: &str = "[no memo_en set]";
const NO_MEMO_RU: &str = "[no memo_ru set]";
const NO_EXHIBITS: &str = "[no exhibits yet]";

/// Render the base user prompt shared by every stage
///
/// `snippets` that are empty or whitespace-only are treated as absent.
pub fn render_prompt(
    ctx: &ContextPack,
    task: &str,
    mode: RunMode,
    snippets: Option<&str>,
) -> String {
    let lock_line = if ctx.lock_mode {
        "LOCK_MODE=ON (Do not change field/goal)."
    } else {
        "LOCK_MODE=OFF."
    };

    let header = format!("CASE: {} (id={})", ctx.case_name, ctx.case_id);
    let evidence = if ctx.evidence_summary.trim().is_empty() {
        NO_EXHIBITS
    } else {
        ctx.evidence_summary.as_str()
    };

    let mut parts: Vec<&str> = vec![
        header.as_str(),
        lock_line,
        "",
        "=== CASE MEMO (EN) ===",
        ctx.memo.en.as_deref().unwrap_or(NO_MEMO_EN),
        "",
        "=== CASE MEMO (RU) ===",
        ctx.memo.ru.as_deref().unwrap_or(NO_MEMO_RU),
        "",
        "=== EVIDENCE REGISTRY (summary) ===",
        evidence,
    ];

    if let Some(snippets) = snippets.filter(|s| !s.trim().is_empty()) {
        parts.extend(["", "=== OFFICIAL SOURCES (RAG SNIPPETS) ===", snippets]);
    }

    if let Some(doc) = ctx.document_text.as_deref().filter(|d| !d.is_empty()) {
        parts.extend(["", "=== DOCUMENT TEXT ===", doc]);
    }

    let mode_line = format!("MODE={mode}");
    parts.extend(["", "=== TASK ===", task.trim(), "", mode_line.as_str()]);
    parts.join("\n")
}

/// Which debater's answer is being shown to the other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Debater {
    A,
    B,
}

impl Debater {
    fn label(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
        }
    }
}

/// Base prompt plus the other debater's stage-1 answer
pub fn critique_prompt(base: &str, other: Debater, other_answer: &str) -> String {
    format!(
        "{base}\n\n=== OTHER MODEL ANSWER ({}) ===\n{other_answer}\n\nNow critique the OTHER MODEL answer strictly.",
        other.label()
    )
}

/// The four texts the judge reasons over
#[derive(Debug, Clone, Copy)]
pub struct JudgeInputs<'a> {
    pub answer_a: &'a str,
    pub answer_b: &'a str,
    /// A's critique of B
    pub critique_a: &'a str,
    /// B's critique of A
    pub critique_b: &'a str,
}

/// Base prompt plus both answers and both critiques
pub fn judge_prompt(base: &str, inputs: JudgeInputs<'_>) -> String {
    format!(
        "{base}\n\n=== MODEL A ANSWER ===\n{}\n\n=== MODEL B ANSWER ===\n{}\n\n\
         === MODEL A CRITIQUE OF B ===\n{}\n\n=== MODEL B CRITIQUE OF A ===\n{}\n\n\
         Synthesize a final answer per your instructions.",
        inputs.answer_a, inputs.answer_b, inputs.critique_a, inputs.critique_b
    )
}
