//! Subcommands and the store wiring they share

pub mod case;
pub mod debate;
pub mod doc;
pub mod info;
pub mod runs;
pub mod sources;

use anyhow::{Context, Result};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use std::sync::Arc;

use amicus_core::Case;
use amicus_llm::{Embedder, LlmConfig};
use amicus_persist::{CaseRepository, CaseStore, SessionStore, SqliteBackend, SqliteVectorIndex};

/// Options shared by every subcommand
pub struct Globals {
    pub db: String,
    pub chat: String,
}

impl Globals {
    pub async fn backend(&self) -> Result<Arc<SqliteBackend>> {
        let backend = SqliteBackend::new(&self.db)
            .await
            .with_context(|| format!("Failed to open database {}", self.db))?;
        tracing::debug!(db = %self.db, "Opened database");
        Ok(Arc::new(backend))
    }
}

/// Embedder from the environment plus the chunk index sized for it
pub fn rag_stack(
    backend: &SqliteBackend,
    llm: &LlmConfig,
) -> Result<(Arc<dyn Embedder>, Arc<SqliteVectorIndex>)> {
    let embedder = llm.build_embedder()?;
    tracing::debug!(
        model = embedder.model(),
        dimension = embedder.dimension(),
        "Using embedder"
    );
    let index = Arc::new(SqliteVectorIndex::new(
        embedder.dimension(),
        backend.pool().clone(),
    ));
    Ok((embedder, index))
}

/// The conversation's active case, or the named one
pub async fn resolve_case(
    backend: &Arc<SqliteBackend>,
    chat: &str,
    name: Option<&str>,
) -> Result<Case> {
    let cases = CaseStore::new(backend.clone());
    match name {
        Some(name) => cases
            .case_by_name(name.trim())
            .await?
            .with_context(|| format!("Case '{}' not found.", name.trim())),
        None => {
            let case_id = SessionStore::new(backend.clone())
                .load(chat)
                .await?
                .active_case()?;
            cases
                .case(case_id)
                .await?
                .with_context(|| format!("Active case {case_id} no longer exists"))
        }
    }
}

/// Table with the house style and a cyan header row
pub fn table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(Color::Cyan)));
    table
}

/// First `max` characters on one line, with an ellipsis when cut
pub fn preview(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
