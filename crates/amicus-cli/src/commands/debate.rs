//! Ask and review commands - run debates against the active case
//!
//! Usage:
//! ```bash
//! amicus ask fees
//! amicus ask --mode strengthen --task "Tighten the judging section" \
//!     --query "judging the work of others" --category policy_manual
//! amicus review "Petition Letter"
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;

use amicus_core::RunMode;
use amicus_debate::{
    presets, CaseDesk, DebateError, DebateOrchestrator, DebateSettings, DeskError, DeskReply,
};
use amicus_llm::LlmConfig;
use amicus_persist::{RunStore, SqliteBackend};
use amicus_rag::Retriever;

use super::{rag_stack, Globals};
use crate::{print_error, print_warning};

/// Arguments for the ask command
#[derive(Args)]
pub struct AskArgs {
    /// Preset name (requirements, fees, filing, premium)
    #[arg(required_unless_present = "task")]
    preset: Option<String>,

    /// Free-form task instead of a preset
    #[arg(long, conflicts_with = "preset")]
    task: Option<String>,

    /// Run mode for a free-form task
    #[arg(long, default_value = "general", requires = "task")]
    mode: RunMode,

    /// Retrieval query grounding a free-form task
    #[arg(long, requires = "task")]
    query: Option<String>,

    /// Categories for the retrieval query (repeatable)
    #[arg(long = "category", requires = "query")]
    categories: Vec<String>,
}

/// Arguments for the review command
#[derive(Args)]
pub struct ReviewArgs {
    /// Document title in the active case
    title: String,
}

async fn desk(globals: &Globals) -> Result<CaseDesk<SqliteBackend>> {
    let llm = LlmConfig::from_env()?;
    let settings = DebateSettings::from_env()?;
    let participants = settings.participants(&llm)?;

    let backend = globals.backend().await?;
    let (embedder, index) = rag_stack(&backend, &llm)?;
    let orchestrator = DebateOrchestrator::new(Arc::new(RunStore::new(backend.clone())))
        .with_config(settings.debate.clone());

    Ok(CaseDesk::new(
        backend,
        Retriever::new(embedder, index),
        orchestrator,
        participants,
    ))
}

/// Run the ask command
pub async fn ask(globals: &Globals, args: AskArgs) -> Result<()> {
    let desk = desk(globals).await?;

    let result = match (&args.preset, &args.task) {
        (Some(name), _) => {
            if let Some(preset) = presets::preset(name) {
                println!("{} {} ({})", "Running preset".dimmed(), preset.name.green(), preset.mode);
            }
            desk.run_preset(&globals.chat, name).await
        }
        (None, Some(task)) => {
            let grounding = args
                .query
                .as_deref()
                .map(|query| (query, args.categories.as_slice()));
            desk.ask(&globals.chat, args.mode, task, grounding).await
        }
        (None, None) => anyhow::bail!("Give a preset name or --task"),
    };
    report(result)
}

/// Run the review command
pub async fn review(globals: &Globals, args: ReviewArgs) -> Result<()> {
    let desk = desk(globals).await?;
    report(desk.review_document(&globals.chat, &args.title).await)
}

/// Print the reply; an unrecorded run still shows its verdict
fn report(result: Result<DeskReply, DeskError>) -> Result<()> {
    match result {
        Ok(reply) => {
            let degraded = reply.outcome.transcript.degraded_calls();
            tracing::info!(
                run_id = reply.outcome.run_id,
                inputs_hash = %reply.outcome.inputs_hash,
                degraded,
                "Debate recorded"
            );
            if degraded > 0 {
                print_warning(&format!("{degraded} provider call(s) failed; see the run record"));
            }
            println!("{reply}");
            Ok(())
        }
        Err(DeskError::Debate(DebateError::Store { transcript, source })) => {
            tracing::error!(error = %source, "Debate finished but was not recorded");
            print_error(&format!("Run was not recorded: {source}"));
            println!();
            println!("{}", transcript.judge_output);
            Err(source.into())
        }
        Err(e) => Err(e.into()),
    }
}
