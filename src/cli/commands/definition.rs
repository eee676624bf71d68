//! `definition` command.

use anyhow::Context;
use std::path::{Path, PathBuf};

use luasense::Settings;
use luasense::indexing::DocumentManager;
use luasense::providers::definitions;
use luasense::types::{DocumentId, Position};

pub fn run(
    settings: &Settings,
    file: &Path,
    line: u32,
    column: u32,
    root: Option<PathBuf>,
) -> anyhow::Result<()> {
    let root = super::workspace_root(root);
    let modules = super::scanned_modules(settings, &root);
    let documents = DocumentManager::with_modules(settings.parser_options(), modules);

    let path = file
        .canonicalize()
        .with_context(|| format!("cannot open {}", file.display()))?;
    documents.open_file(&path)?;

    let position = Position::new(line.saturating_sub(1), column.saturating_sub(1));
    let locations = definitions(&documents, &DocumentId::from_path(&path), position);
    if locations.is_empty() {
        eprintln!("No definition found");
    }
    println!("{}", serde_json::to_string_pretty(&locations)?);
    Ok(())
}
