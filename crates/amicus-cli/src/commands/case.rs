//! Case command - seed, select and inspect cases
//!
//! Usage:
//! ```bash
//! amicus case seed --file cases.json
//! amicus case use "Acme Researcher"
//! amicus case show
//! amicus case exhibit B-5 "Judging invitation" --tag judging --strength 4
//! amicus case list
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::{Cell, Color};
use serde::Deserialize;
use std::path::PathBuf;

use amicus_core::EvidenceStatus;
use amicus_persist::{CaseRepository, CaseStore, NewEvidence, SessionStore};

use super::{preview, resolve_case, table, Globals};
use crate::{print_success, print_warning};

/// Arguments for the case command
#[derive(Args)]
pub struct CaseArgs {
    #[command(subcommand)]
    command: CaseCommand,
}

#[derive(Subcommand)]
pub enum CaseCommand {
    /// Create or update cases from a JSON file
    #[command(name = "seed")]
    Seed {
        /// JSON array of `{"name": ..., "memo": {...}}`
        #[arg(long, short = 'f', default_value = "cases.json", value_name = "FILE")]
        file: PathBuf,
    },

    /// Make a case the active case of this conversation
    #[command(name = "use")]
    Use {
        /// Case name
        name: String,
    },

    /// Show a case's memo, exhibits and documents
    #[command(name = "show")]
    Show {
        /// Case name (defaults to the active case)
        name: Option<String>,
    },

    /// Add or replace an exhibit in the active case
    #[command(name = "exhibit")]
    Exhibit {
        /// Exhibit code, unique within the case
        code: String,
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Criterion tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// 1 (weak) to 5 (strong)
        #[arg(long, default_value_t = 3)]
        strength: u8,
        #[arg(long, default_value = "draft")]
        status: EvidenceStatus,
    },

    /// List all cases
    #[command(name = "list")]
    List,
}

/// One entry of the seed file
#[derive(Debug, Deserialize)]
struct SeedCase {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    memo: serde_json::Value,
    #[serde(default)]
    evidence: Vec<NewEvidence>,
}

/// Run the case command
pub async fn run(globals: &Globals, args: CaseArgs) -> Result<()> {
    match args.command {
        CaseCommand::Seed { file } => seed(globals, &file).await,
        CaseCommand::Use { name } => use_case(globals, &name).await,
        CaseCommand::Show { name } => show(globals, name.as_deref()).await,
        CaseCommand::Exhibit {
            code,
            title,
            description,
            tags,
            strength,
            status,
        } => {
            let exhibit = NewEvidence {
                exhibit_code: code,
                title,
                description,
                criterion_tags: tags,
                strength,
                status,
            };
            add_exhibit(globals, exhibit).await
        }
        CaseCommand::List => list(globals).await,
    }
}

fn parse_seed_file(content: &str) -> Result<Vec<SeedCase>> {
    serde_json::from_str(content).context("Seed file must be a JSON array of cases")
}

async fn seed(globals: &Globals, file: &PathBuf) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read seed file: {}", file.display()))?;
    let entries = parse_seed_file(&content)?;

    let cases = CaseStore::new(globals.backend().await?);
    let mut seeded = 0;
    for entry in entries {
        let Some(name) = entry.name.filter(|n| !n.trim().is_empty()) else {
            print_warning("Skipping entry without a name");
            tracing::warn!(file = %file.display(), "Seed entry without a name");
            continue;
        };
        let memo = if entry.memo.is_null() {
            serde_json::json!({})
        } else {
            entry.memo
        };

        // Existing cases keep their lock mode; new ones start locked
        let case = match cases.case_by_name(name.trim()).await? {
            Some(existing) => {
                println!("  {} '{}'", "Updating".yellow(), existing.name);
                cases.upsert_case(&existing.name, memo, existing.lock_mode).await?
            }
            None => {
                println!("  {} '{}'", "Creating".green(), name.trim());
                cases.upsert_case(&name, memo, true).await?
            }
        };

        for exhibit in entry.evidence {
            cases.add_evidence(case.id, exhibit).await?;
        }
        seeded += 1;
    }

    tracing::info!(seeded, file = %file.display(), "Seeded cases");
    print_success(&format!("Seeded {seeded} case(s) from {}", file.display()));
    Ok(())
}

async fn use_case(globals: &Globals, name: &str) -> Result<()> {
    let backend = globals.backend().await?;
    let case = resolve_case(&backend, &globals.chat, Some(name)).await?;
    SessionStore::new(backend).activate(&globals.chat, case.id).await?;
    tracing::info!(chat = %globals.chat, case_id = case.id, "Activated case");
    print_success(&format!("Active case set: {} (id={})", case.name, case.id));
    Ok(())
}

async fn show(globals: &Globals, name: Option<&str>) -> Result<()> {
    let backend = globals.backend().await?;
    let case = resolve_case(&backend, &globals.chat, name).await?;
    let cases = CaseStore::new(backend);

    println!("{}", case.name.bold().cyan());
    println!("{}", "═".repeat(50).cyan());
    println!("  {} {}", "Id:".dimmed(), case.id);
    println!(
        "  {} {}",
        "Lock mode:".dimmed(),
        if case.lock_mode { "on".green() } else { "off".yellow() }
    );
    println!("  {} {}", "Updated:".dimmed(), case.updated_at.format("%Y-%m-%d %H:%M UTC"));
    println!();

    println!("{}", "Memo:".bold());
    println!("{}", serde_json::to_string_pretty(&case.memo)?);
    println!();

    let evidence = cases.evidence(case.id).await?;
    println!("{} ({})", "Exhibits:".bold(), evidence.len());
    if !evidence.is_empty() {
        let mut exhibits = table(&["Code", "Title", "Tags", "Status", "Strength"]);
        for item in &evidence {
            exhibits.add_row(vec![
                Cell::new(&item.exhibit_code).fg(Color::Green),
                Cell::new(preview(&item.title, 48)),
                Cell::new(item.criterion_tags.join(", ")).fg(Color::Yellow),
                Cell::new(item.status.as_str()),
                Cell::new(item.strength),
            ]);
        }
        println!("{exhibits}");
    }
    println!();

    let documents = cases.list_documents(case.id).await?;
    println!("{} ({})", "Documents:".bold(), documents.len());
    if !documents.is_empty() {
        let mut docs = table(&["Id", "Title", "Type", "Current version"]);
        for document in &documents {
            docs.add_row(vec![
                Cell::new(document.id),
                Cell::new(&document.title).fg(Color::Green),
                Cell::new(&document.doc_type),
                Cell::new(
                    document
                        .current_version_id
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "-".into()),
                ),
            ]);
        }
        println!("{docs}");
    }
    Ok(())
}

async fn add_exhibit(globals: &Globals, exhibit: NewEvidence) -> Result<()> {
    let backend = globals.backend().await?;
    let case = resolve_case(&backend, &globals.chat, None).await?;
    let item = CaseStore::new(backend).add_evidence(case.id, exhibit).await?;
    print_success(&format!(
        "Exhibit {} saved to '{}' (strength={})",
        item.exhibit_code, case.name, item.strength
    ));
    Ok(())
}

async fn list(globals: &Globals) -> Result<()> {
    let backend = globals.backend().await?;
    let active = SessionStore::new(backend.clone())
        .load(&globals.chat)
        .await?
        .active_case_id;
    let cases = CaseStore::new(backend).list_cases().await?;

    if cases.is_empty() {
        print_warning("No cases yet. Seed some with `amicus case seed`.");
        return Ok(());
    }

    let mut rows = table(&["Id", "Name", "Lock", "Updated"]);
    for case in &cases {
        let name = if Some(case.id) == active {
            Cell::new(format!("{} (active)", case.name)).fg(Color::Green)
        } else {
            Cell::new(&case.name)
        };
        rows.add_row(vec![
            Cell::new(case.id),
            name,
            Cell::new(if case.lock_mode { "on" } else { "off" }),
            Cell::new(case.updated_at.format("%Y-%m-%d %H:%M")),
        ]);
    }
    println!("{rows}");
    Ok(())
}
