//! Info command - Show configuration and store status
//!
//! Usage:
//! ```bash
//! amicus info
//! ```

use anyhow::Result;
use clap::Args;
use colored::Colorize;

use amicus_debate::{DebateSettings, PRESETS};
use amicus_llm::{LlmConfig, ProviderKind};
use amicus_persist::{CaseStore, RunStore, SessionStore, VectorIndex};

use super::{rag_stack, Globals};

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs;

fn status(configured: bool) -> colored::ColoredString {
    if configured {
        "✓".green()
    } else {
        "✗".red()
    }
}

/// Run the info command
pub async fn run(globals: &Globals, _args: InfoArgs) -> Result<()> {
    let version = env!("CARGO_PKG_VERSION");
    let llm = LlmConfig::from_env()?;
    let settings = DebateSettings::from_env()?;

    println!("{}", "Amicus - grounded two-model debate".bold().cyan());
    println!("{}", "═".repeat(50).cyan());
    println!();

    println!("{}", "Version Information:".bold());
    println!("  {} {}", "CLI Version:".dimmed(), version.green());
    println!();

    println!("{}", "Providers:".bold());
    for kind in [ProviderKind::OpenAI, ProviderKind::Gemini] {
        println!("  {} {}", status(llm.is_configured(kind)), kind);
    }
    println!(
        "  {} A={} B={} judge={}",
        "Debate:".dimmed(),
        settings.provider_a.to_string().green(),
        settings.provider_b.to_string().green(),
        settings
            .judge
            .map(|k| k.to_string())
            .unwrap_or_else(|| format!("{} (debater A)", settings.provider_a))
            .green()
    );
    println!(
        "  {} temperature={} max_output_tokens={} timeout={}s",
        "Stage 1:".dimmed(),
        settings.debate.temperature,
        settings.debate.max_output_tokens,
        settings.debate.timeout.as_secs()
    );
    println!(
        "  {} {:?} ({} dims)",
        "Embedder:".dimmed(),
        llm.embedder,
        llm.embedding_dimension
    );
    println!();

    println!("{}", "Presets:".bold());
    for preset in PRESETS {
        println!(
            "  {} {} [{}]",
            "•".cyan(),
            preset.name.green(),
            preset.categories.join(", ").dimmed()
        );
    }
    println!();

    println!("{}", "Store:".bold());
    println!("  {} {}", "Database:".dimmed(), globals.db);
    let backend = globals.backend().await?;
    let cases = CaseStore::new(backend.clone()).list_cases().await?;
    let runs = RunStore::new(backend.clone()).list().await?;
    let session = SessionStore::new(backend.clone()).load(&globals.chat).await?;
    let (_, index) = rag_stack(&backend, &llm)?;

    let active = session
        .active_case_id
        .and_then(|id| cases.iter().find(|c| c.id == id))
        .map(|c| c.name.clone())
        .unwrap_or_else(|| "none".into());
    println!("  {} {}", "Cases:".dimmed(), cases.len());
    println!("  {} {} ({})", "Active case:".dimmed(), active, globals.chat);
    println!("  {} {}", "Recorded runs:".dimmed(), runs.len());
    println!("  {} {}", "Indexed chunks:".dimmed(), index.count().await?);
    println!();

    Ok(())
}
