//! Command implementations for the CLI.

pub mod check;
pub mod config;
pub mod definition;
pub mod modules;
pub mod symbols;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use luasense::Settings;
use luasense::indexing::ModuleIndex;

/// `--root`, else the directory holding `.luasense`, else the cwd.
pub fn workspace_root(root: Option<PathBuf>) -> PathBuf {
    root.or_else(Settings::workspace_root)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// A scanned module index over the configured search roots.
pub fn scanned_modules(settings: &Settings, root: &Path) -> Arc<ModuleIndex> {
    let modules = Arc::new(ModuleIndex::new());
    modules.configure(
        settings.search_roots(Some(root)),
        settings.search.filters.clone(),
        settings.search.follow_links,
    );
    modules.rescan();
    modules
}
