//! Runs command - inspect and verify the debate audit log
//!
//! Usage:
//! ```bash
//! amicus runs list --case "Acme Researcher" --since 2026-01-01
//! amicus runs show 12 --full
//! amicus runs verify
//! ```

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::{Cell, Color};

use amicus_persist::{DebateRecord, RunId, RunStore};

use super::{preview, resolve_case, table, Globals};
use crate::{print_error, print_success, print_warning};

/// Arguments for the runs command
#[derive(Args)]
pub struct RunsArgs {
    #[command(subcommand)]
    command: RunsCommand,
}

#[derive(Subcommand)]
pub enum RunsCommand {
    /// List recorded runs
    #[command(name = "list")]
    List {
        /// Only runs of this case
        #[arg(long)]
        case: Option<String>,
        /// Only runs of the active case
        #[arg(long, conflicts_with = "case")]
        active: bool,
        /// Only runs created on or after this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        since: Option<DateTime<Utc>>,
    },

    /// Show one run
    #[command(name = "show")]
    Show {
        id: RunId,
        /// Print all five texts and the prompt pack
        #[arg(long)]
        full: bool,
    },

    /// Verify the hash chain of the whole log
    #[command(name = "verify")]
    Verify,
}

fn parse_date(value: &str) -> Result<DateTime<Utc>, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD: {e}"))
        .and_then(|date| {
            date.and_hms_opt(0, 0, 0)
                .map(|t| t.and_utc())
                .ok_or_else(|| "invalid date".to_string())
        })
}

/// Run the runs command
pub async fn run(globals: &Globals, args: RunsArgs) -> Result<()> {
    match args.command {
        RunsCommand::List {
            case,
            active,
            since,
        } => list(globals, case.as_deref(), active, since).await,
        RunsCommand::Show { id, full } => show(globals, id, full).await,
        RunsCommand::Verify => verify(globals).await,
    }
}

async fn list(
    globals: &Globals,
    case: Option<&str>,
    active: bool,
    since: Option<DateTime<Utc>>,
) -> Result<()> {
    let backend = globals.backend().await?;
    let case_filter = if case.is_some() || active {
        Some(resolve_case(&backend, &globals.chat, case).await?.id)
    } else {
        None
    };

    let runs = RunStore::new(backend);
    let mut records = match since {
        Some(since) => runs.list_since(since).await?,
        None => runs.list().await?,
    };
    if let Some(case_id) = case_filter {
        records.retain(|r| r.content.case_id == case_id);
    }

    if records.is_empty() {
        print_warning("No runs recorded.");
        return Ok(());
    }

    let mut rows = table(&["Run", "Case", "Mode", "Created", "Inputs", "Judge"]);
    for record in &records {
        rows.add_row(vec![
            Cell::new(format!("#{}", record.id)).fg(Color::Green),
            Cell::new(record.content.case_id),
            Cell::new(record.content.mode).fg(Color::Yellow),
            Cell::new(record.created_at.format("%Y-%m-%d %H:%M")),
            Cell::new(record.content.inputs_hash.short(12)),
            Cell::new(preview(&record.content.judge_output, 60)),
        ]);
    }
    println!("{rows}");
    Ok(())
}

fn section(title: &str, body: &str) {
    println!();
    println!("{}", format!("── {title} ──").bold().cyan());
    println!("{body}");
}

fn print_record(record: &DebateRecord, full: bool) -> Result<()> {
    println!("{}", format!("Run #{}", record.id).bold().cyan());
    println!("{}", "═".repeat(50).cyan());
    println!("  {} {}", "Case:".dimmed(), record.content.case_id);
    println!("  {} {}", "Mode:".dimmed(), record.content.mode);
    println!("  {} {}", "Created:".dimmed(), record.created_at.to_rfc3339());
    println!("  {} {}", "Inputs hash:".dimmed(), record.content.inputs_hash.to_hex());
    println!("  {} {}", "Record hash:".dimmed(), record.record_hash.to_hex());
    println!(
        "  {} {}",
        "Previous:".dimmed(),
        record
            .previous_hash
            .map(|h| h.to_hex())
            .unwrap_or_else(|| "-".into())
    );

    if full {
        section(
            "Prompt pack",
            &serde_json::to_string_pretty(&record.content.prompt_pack)?,
        );
        section("Model A", &record.content.model_a_output);
        section("Model B", &record.content.model_b_output);
        section("A critiques B", &record.content.critique_a);
        section("B critiques A", &record.content.critique_b);
    }
    section("Judge", &record.content.judge_output);
    Ok(())
}

async fn show(globals: &Globals, id: RunId, full: bool) -> Result<()> {
    let runs = RunStore::new(globals.backend().await?);
    let record = runs
        .get(id)
        .await?
        .with_context(|| format!("Run #{id} not found"))?;
    print_record(&record, full)
}

async fn verify(globals: &Globals) -> Result<()> {
    let runs = RunStore::new(globals.backend().await?);
    let count = runs.list().await?.len();

    println!("{}", "Audit Log Verification".bold().cyan());
    println!("{}", "═".repeat(40).cyan());
    println!("  {} {}", "Database:".dimmed(), globals.db);
    println!("  {} {}", "Runs:".dimmed(), count);
    println!();

    let intact = runs.verify_chain().await?;
    tracing::info!(runs = count, intact, "Verified audit chain");
    if intact {
        print_success("Chain integrity verified");
        Ok(())
    } else {
        print_error("Chain integrity FAILED");
        println!("{}", "The audit log may have been tampered with.".red());
        anyhow::bail!("audit chain verification failed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date() {
        let since = parse_date("2026-03-01").unwrap();
        assert_eq!(since.to_rfc3339(), "2026-03-01T00:00:00+00:00");
        assert!(parse_date("03/01/2026").is_err());
    }
}
