//! Amicus CLI - grounded two-model debate over petition cases
//!
//! # Usage
//!
//! ```bash
//! # Load cases and pick one for this conversation
//! amicus case seed --file cases.json
//! amicus case use "Acme Researcher"
//!
//! # Refresh the official source index
//! amicus sources update --category fees
//!
//! # Run a grounded preset and a document review
//! amicus ask fees
//! amicus review "Petition Letter"
//!
//! # Check the audit log
//! amicus runs verify
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

mod commands;

use commands::{case, debate, doc, info, runs, sources, Globals};

/// Amicus - grounded debate for petition cases
///
/// Two models answer, critique each other, and a judge synthesizes the
/// result. Every run is recorded in a hash-chained audit log.
#[derive(Parser)]
#[command(
    name = "amicus",
    version,
    about = "Amicus CLI - grounded two-model debate",
    long_about = "Amicus runs two language models against each other on a case.\n\n\
                  Both answer, each critiques the other, a judge synthesizes,\n\
                  and every run is appended to a hash-chained audit log."
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Database URL
    #[arg(
        long,
        env = "AMICUS_DATABASE_URL",
        default_value = amicus_persist::sqlite::DEFAULT_DATABASE_URL,
        global = true
    )]
    db: String,

    /// Conversation id that owns the active case
    #[arg(long, env = "AMICUS_CHAT", default_value = "cli", global = true)]
    chat: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Case bookkeeping
    #[command(name = "case")]
    Case(case::CaseArgs),

    /// Case documents
    #[command(name = "doc")]
    Doc(doc::DocArgs),

    /// Official source index
    #[command(name = "sources")]
    Sources(sources::SourcesArgs),

    /// Index a local text or HTML file
    #[command(name = "ingest")]
    Ingest(sources::IngestArgs),

    /// Show the snippets a query retrieves
    #[command(name = "retrieve")]
    Retrieve(sources::RetrieveArgs),

    /// Run a grounded preset against the active case
    #[command(name = "ask")]
    Ask(debate::AskArgs),

    /// Review a document of the active case
    #[command(name = "review")]
    Review(debate::ReviewArgs),

    /// Recorded debate runs
    #[command(name = "runs")]
    Runs(runs::RunsArgs),

    /// Show configuration and store status
    #[command(name = "info")]
    Info(info::InfoArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    let globals = Globals {
        db: cli.db,
        chat: cli.chat,
    };

    match cli.command {
        Commands::Case(args) => case::run(&globals, args).await,
        Commands::Doc(args) => doc::run(&globals, args).await,
        Commands::Sources(args) => sources::run(&globals, args).await,
        Commands::Ingest(args) => sources::ingest(&globals, args).await,
        Commands::Retrieve(args) => sources::retrieve(&globals, args).await,
        Commands::Ask(args) => debate::ask(&globals, args).await,
        Commands::Review(args) => debate::review(&globals, args).await,
        Commands::Runs(args) => runs::run(&globals, args).await,
        Commands::Info(args) => info::run(&globals, args).await,
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

/// Print a success message with a checkmark
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print an error message with an X
pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red().bold(), msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}
