//! File system walker for discovering Lua modules
//!
//! This module provides directory traversal with support for:
//! - .gitignore rules
//! - `search.filters` glob overrides (plain patterns exclude, `!pattern`
//!   whitelists)
//! - Optional symlink following
//! - Hidden file handling

use ignore::WalkBuilder;
use ignore::overrides::{Override, OverrideBuilder};
use std::path::{Path, PathBuf};

/// Walks search roots to find `.lua` files
#[derive(Debug, Clone, Default)]
pub struct FileWalker {
    filters: Vec<String>,
    follow_links: bool,
}

impl FileWalker {
    pub fn new(filters: Vec<String>, follow_links: bool) -> Self {
        Self {
            filters,
            follow_links,
        }
    }

    /// Walk a directory and return an iterator of Lua files
    pub fn walk(&self, root: &Path) -> impl Iterator<Item = PathBuf> + use<> {
        let mut builder = WalkBuilder::new(root);

        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .follow_links(self.follow_links)
            .max_depth(None)
            .require_git(false);

        if let Some(overrides) = self.overrides(root) {
            builder.overrides(overrides);
        }

        builder
            .build()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            .filter(|path| is_lua_file(path))
    }

    /// Whether a single file under `root` passes the same filters a walk
    /// would apply. Used for files reported by watch events.
    pub fn accepts(&self, root: &Path, path: &Path) -> bool {
        if !is_lua_file(path) || !path.starts_with(root) {
            return false;
        }
        let hidden = path
            .strip_prefix(root)
            .map(|relative| {
                relative
                    .components()
                    .any(|c| c.as_os_str().to_string_lossy().starts_with('.'))
            })
            .unwrap_or(false);
        if hidden {
            return false;
        }
        match self.overrides(root) {
            Some(overrides) => !overrides.matched(path, false).is_ignore(),
            None => true,
        }
    }

    fn overrides(&self, root: &Path) -> Option<Override> {
        if self.filters.is_empty() {
            return None;
        }
        let mut override_builder = OverrideBuilder::new(root);
        for filter in &self.filters {
            // Override globs whitelist by default and ignore with `!`, the
            // opposite of how filters are written
            let glob = match filter.strip_prefix('!') {
                Some(whitelisted) => whitelisted.to_string(),
                None => format!("!{filter}"),
            };
            if let Err(e) = override_builder.add(&glob) {
                tracing::warn!("[walker] invalid search filter '{filter}': {e}");
            }
        }
        match override_builder.build() {
            Ok(overrides) => Some(overrides),
            Err(e) => {
                tracing::warn!("[walker] search filters ignored: {e}");
                None
            }
        }
    }
}

pub fn is_lua_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "lua")
}
