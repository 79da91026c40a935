//! Doc command - register case documents and their text
//!
//! Usage:
//! ```bash
//! amicus doc add "Petition Letter" --file petition.txt --type petition
//! amicus doc show "Petition Letter"
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use amicus_persist::{CaseRepository, CaseStore, NewVersion};

use super::{resolve_case, Globals};
use crate::print_success;

/// Arguments for the doc command
#[derive(Args)]
pub struct DocArgs {
    #[command(subcommand)]
    command: DocCommand,
}

#[derive(Subcommand)]
pub enum DocCommand {
    /// Add a document (or a new version of it) to the active case
    #[command(name = "add")]
    Add {
        /// Document title, unique within the case
        title: String,
        /// Plain-text extract of the document
        #[arg(long, short = 'f', value_name = "FILE")]
        file: PathBuf,
        /// Document type (petition, support_letter, resume, ...)
        #[arg(long = "type", default_value = "petition")]
        doc_type: String,
        #[arg(long, default_value = "")]
        notes: String,
    },

    /// Print the current text of a document
    #[command(name = "show")]
    Show {
        title: String,
    },
}

/// Run the doc command
pub async fn run(globals: &Globals, args: DocArgs) -> Result<()> {
    match args.command {
        DocCommand::Add {
            title,
            file,
            doc_type,
            notes,
        } => add(globals, &title, &file, &doc_type, notes).await,
        DocCommand::Show { title } => show(globals, &title).await,
    }
}

async fn add(
    globals: &Globals,
    title: &str,
    file: &PathBuf,
    doc_type: &str,
    notes: String,
) -> Result<()> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read document: {}", file.display()))?;

    let backend = globals.backend().await?;
    let case = resolve_case(&backend, &globals.chat, None).await?;
    let cases = CaseStore::new(backend);

    let document = cases.add_document(case.id, doc_type, title).await?;
    let version = cases
        .add_version(
            document.id,
            NewVersion {
                storage_url: format!("file://{}", file.display()),
                text_extract: text.trim().to_string(),
                notes,
                created_by: "cli".to_string(),
            },
        )
        .await?;

    tracing::info!(
        case_id = case.id,
        document_id = document.id,
        version_id = version.id,
        "Stored document version"
    );
    print_success(&format!(
        "'{}' saved to '{}' as version {} ({} chars)",
        document.title,
        case.name,
        version.id,
        version.text_extract.chars().count()
    ));
    Ok(())
}

async fn show(globals: &Globals, title: &str) -> Result<()> {
    let backend = globals.backend().await?;
    let case = resolve_case(&backend, &globals.chat, None).await?;
    let cases = CaseStore::new(backend);

    let document = cases
        .document_by_title(case.id, title.trim())
        .await?
        .with_context(|| format!("Document '{}' not found in active case.", title.trim()))?;
    let version = match document.current_version_id {
        Some(id) => cases.version(id).await?,
        None => None,
    };

    println!("{}", document.title.bold().cyan());
    println!("  {} {}", "Type:".dimmed(), document.doc_type);
    match version {
        Some(version) => {
            println!("  {} {}", "Version:".dimmed(), version.id);
            println!("  {} {}", "Source:".dimmed(), version.storage_url);
            println!();
            println!("{}", version.text_extract);
        }
        None => println!("  {}", "No versions yet".yellow()),
    }
    Ok(())
}
