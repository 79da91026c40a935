//! Sources commands - maintain and query the official source index
//!
//! Usage:
//! ```bash
//! amicus sources list
//! amicus sources update --category fees --category form_i907
//! amicus ingest notes.html --category fees --url https://example.org/fees
//! amicus retrieve "premium processing fee" --category fees --top-k 5
//! ```

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use colored::Colorize;
use comfy_table::{Cell, Color};
use std::path::PathBuf;

use amicus_llm::LlmConfig;
use amicus_persist::VectorIndex;
use amicus_rag::{
    sources, FetchedPage, Ingestor, PageFetcher, Retriever, DEFAULT_TOP_K, OFFICIAL_SOURCES,
};

use super::{preview, rag_stack, table, Globals};
use crate::{print_error, print_success, print_warning};

/// Arguments for the sources command
#[derive(Args)]
pub struct SourcesArgs {
    #[command(subcommand)]
    command: SourcesCommand,
}

#[derive(Subcommand)]
pub enum SourcesCommand {
    /// List the official source registry
    #[command(name = "list")]
    List,

    /// Fetch and re-index official sources
    #[command(name = "update")]
    Update {
        /// Only these categories (repeatable; all when omitted)
        #[arg(long = "category")]
        categories: Vec<String>,
    },
}

/// Arguments for the ingest command
#[derive(Args)]
pub struct IngestArgs {
    /// Text or HTML file
    file: PathBuf,
    /// Category tag for the chunks
    #[arg(long)]
    category: String,
    /// Source URL recorded with the chunks (defaults to a file:// URL)
    #[arg(long)]
    url: Option<String>,
    /// Title (defaults to the HTML title or the file name)
    #[arg(long)]
    title: Option<String>,
}

/// Arguments for the retrieve command
#[derive(Args)]
pub struct RetrieveArgs {
    query: String,
    /// Restrict to these categories (repeatable)
    #[arg(long = "category")]
    categories: Vec<String>,
    #[arg(long, default_value_t = DEFAULT_TOP_K)]
    top_k: usize,
    /// Print the snippet block exactly as debaters see it
    #[arg(long)]
    raw: bool,
}

/// Run the sources command
pub async fn run(globals: &Globals, args: SourcesArgs) -> Result<()> {
    match args.command {
        SourcesCommand::List => list(globals).await,
        SourcesCommand::Update { categories } => update(globals, &categories).await,
    }
}

async fn list(globals: &Globals) -> Result<()> {
    let backend = globals.backend().await?;
    let (_, index) = rag_stack(&backend, &LlmConfig::from_env()?)?;

    let mut rows = table(&["Category", "Title", "Chunk prefix", "URL"]);
    for source in OFFICIAL_SOURCES {
        rows.add_row(vec![
            Cell::new(source.category).fg(Color::Yellow),
            Cell::new(source.title),
            Cell::new(source.chunk_prefix()).fg(Color::Green),
            Cell::new(source.url),
        ]);
    }
    println!("{rows}");
    println!("  {} {}", "Indexed chunks:".dimmed(), index.count().await?);
    Ok(())
}

async fn update(globals: &Globals, categories: &[String]) -> Result<()> {
    let known = sources::categories();
    let unknown = categories
        .iter()
        .find(|c| !known.iter().any(|k| *k == c.as_str()));
    if let Some(unknown) = unknown {
        anyhow::bail!(
            "Unknown category '{unknown}'. Available: {}",
            known.join(", ")
        );
    }

    let backend = globals.backend().await?;
    let (embedder, index) = rag_stack(&backend, &LlmConfig::from_env()?)?;
    let ingestor = Ingestor::new(embedder, index)?;
    let fetcher = PageFetcher::new()?;

    println!("{}", "Updating official sources".bold().cyan());
    tracing::info!(?categories, "Updating official sources");
    let summary = ingestor.update_sources(&fetcher, categories).await;
    tracing::info!(
        sources = summary.reports.len(),
        failed = summary.failures.len(),
        upserted = summary.upserted(),
        "Source update finished"
    );

    let mut rows = table(&["Source", "Chunks", "Upserted", "Pruned"]);
    for report in &summary.reports {
        rows.add_row(vec![
            Cell::new(&report.source_url),
            Cell::new(report.chunks),
            Cell::new(report.upserted).fg(Color::Green),
            Cell::new(report.pruned).fg(Color::Yellow),
        ]);
    }
    println!("{rows}");

    for (url, error) in &summary.failures {
        print_error(&format!("{url}: {error}"));
    }
    if summary.failures.is_empty() {
        print_success(&format!("Upserted {} chunk(s)", summary.upserted()));
    } else {
        print_warning(&format!(
            "Upserted {} chunk(s); {} source(s) failed",
            summary.upserted(),
            summary.failures.len()
        ));
    }
    Ok(())
}

/// Run the ingest command
pub async fn ingest(globals: &Globals, args: IngestArgs) -> Result<()> {
    let content = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let url = args
        .url
        .unwrap_or_else(|| format!("file://{}", args.file.display()));
    let fallback_title = args
        .file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| url.clone());

    let is_html = args
        .file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("html") || ext.eq_ignore_ascii_case("htm"));
    let mut page = if is_html {
        FetchedPage::from_html(&url, &content, &fallback_title)
    } else {
        FetchedPage::from_text(&url, &fallback_title, &content)
    };
    if let Some(title) = args.title {
        page.title = title;
    }
    tracing::debug!(url = %page.url, chars = page.text.len(), html = is_html, "Read local page");

    let backend = globals.backend().await?;
    let (embedder, index) = rag_stack(&backend, &LlmConfig::from_env()?)?;
    let report = Ingestor::new(embedder, index)?
        .ingest_page(&args.category, &page)
        .await?;

    print_success(&format!(
        "{}: {} chunk(s), {} upserted, {} pruned",
        page.title, report.chunks, report.upserted, report.pruned
    ));
    Ok(())
}

/// Run the retrieve command
pub async fn retrieve(globals: &Globals, args: RetrieveArgs) -> Result<()> {
    let backend = globals.backend().await?;
    let (embedder, index) = rag_stack(&backend, &LlmConfig::from_env()?)?;
    let retriever = Retriever::new(embedder, index);

    let hits = retriever
        .retrieve_hits(&args.query, Some(&args.categories), args.top_k)
        .await?;

    if args.raw {
        println!("{}", amicus_rag::render(&hits));
        return Ok(());
    }
    if hits.is_empty() {
        print_warning("No snippets matched. Run `amicus sources update` first?");
        return Ok(());
    }

    let mut rows = table(&["Distance", "Category", "Chunk", "Text"]);
    for hit in &hits {
        rows.add_row(vec![
            Cell::new(format!("{:.4}", hit.distance)),
            Cell::new(&hit.chunk.category).fg(Color::Yellow),
            Cell::new(&hit.chunk.chunk_id).fg(Color::Green),
            Cell::new(preview(&hit.chunk.text, 80)),
        ]);
    }
    println!("{rows}");
    Ok(())
}
