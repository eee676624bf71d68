//! Workspace Module Index
//!
//! Maps bare module names (`util` for `lib/util.lua`, `net` for
//! `net/init.lua`) to the files that provide them. A rescan builds a fresh
//! map off to the side and swaps it in; watch events patch the live map.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::walker::{FileWalker, is_lua_file};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEntry {
    pub name: String,
    pub path: PathBuf,
    /// Search root the file was discovered under.
    pub root: PathBuf,
}

#[derive(Debug, Default)]
struct ModuleMap {
    by_name: HashMap<String, Vec<ModuleEntry>>,
    scanned: bool,
}

#[derive(Debug, Clone, Default)]
struct SearchScope {
    roots: Vec<PathBuf>,
    walker: FileWalker,
}

#[derive(Debug, Default)]
pub struct ModuleIndex {
    map: RwLock<ModuleMap>,
    scope: RwLock<SearchScope>,
}

/// Name a file is required by: its stem, or its directory for `init.lua`.
pub fn module_key(path: &Path) -> Option<String> {
    if !is_lua_file(path) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    if stem == "init" {
        let dir = path.parent()?.file_name()?.to_str()?;
        return Some(dir.to_string());
    }
    Some(stem.to_string())
}

impl ModuleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set roots and filters for subsequent scans and watch events.
    pub fn configure(&self, roots: Vec<PathBuf>, filters: Vec<String>, follow_links: bool) {
        let mut roots: Vec<PathBuf> = roots
            .into_iter()
            .map(|root| root.canonicalize().unwrap_or(root))
            .collect();
        roots.dedup();
        *self.scope.write() = SearchScope {
            roots,
            walker: FileWalker::new(filters, follow_links),
        };
    }

    pub fn roots(&self) -> Vec<PathBuf> {
        self.scope.read().roots.clone()
    }

    /// Walk every root and replace the map. Returns the number of files.
    pub fn rescan(&self) -> usize {
        let scope = self.scope.read().clone();
        let mut by_name: HashMap<String, Vec<ModuleEntry>> = HashMap::new();
        let mut count = 0;

        for root in &scope.roots {
            if !root.is_dir() {
                tracing::debug!("[modules] skipping missing root {}", root.display());
                continue;
            }
            for path in scope.walker.walk(root) {
                let Some(name) = module_key(&path) else {
                    continue;
                };
                by_name.entry(name.clone()).or_default().push(ModuleEntry {
                    name,
                    path,
                    root: root.clone(),
                });
                count += 1;
            }
        }

        for entries in by_name.values_mut() {
            entries.sort_by(|a, b| a.path.cmp(&b.path));
        }

        *self.map.write() = ModuleMap {
            by_name,
            scanned: true,
        };
        crate::log_event!("modules", "rescan", "{count} files under {} roots", scope.roots.len());
        count
    }

    pub fn is_scanned(&self) -> bool {
        self.map.read().scanned
    }

    /// Add a created file. False when it is outside every root or filtered.
    pub fn add_file(&self, path: &Path) -> bool {
        let path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        let Some(name) = module_key(&path) else {
            return false;
        };
        let root = {
            let scope = self.scope.read();
            let Some(root) = scope
                .roots
                .iter()
                .filter(|root| path.starts_with(root))
                .max_by_key(|root| root.components().count())
            else {
                return false;
            };
            if !scope.walker.accepts(root, &path) {
                return false;
            }
            root.clone()
        };

        let mut map = self.map.write();
        let entries = map.by_name.entry(name.clone()).or_default();
        if entries.iter().any(|entry| entry.path == path) {
            return false;
        }
        crate::debug_event!("modules", "added", "{name} -> {}", path.display());
        entries.push(ModuleEntry { name, path, root });
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        true
    }

    /// Remove a deleted file. False when it was not indexed.
    pub fn remove_file(&self, path: &Path) -> bool {
        let Some(name) = module_key(path) else {
            return false;
        };
        let mut map = self.map.write();
        let Some(entries) = map.by_name.get_mut(&name) else {
            return false;
        };
        let before = entries.len();
        // The file is gone, so compare against both spellings of the path
        entries.retain(|entry| entry.path != path && !same_file(&entry.path, path));
        let removed = entries.len() != before;
        if entries.is_empty() {
            map.by_name.remove(&name);
        }
        if removed {
            crate::debug_event!("modules", "removed", "{name} -> {}", path.display());
        }
        removed
    }

    /// File providing `require(name)`. For dotted names the candidate whose
    /// path ends with the dotted path wins; otherwise the first candidate.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        let segments: Vec<&str> = name.split(['.', '/']).filter(|s| !s.is_empty()).collect();
        let key = *segments.last()?;
        let map = self.map.read();
        let candidates = map.by_name.get(key)?;

        let as_file: PathBuf = segments.iter().collect::<PathBuf>().with_extension("lua");
        let as_dir: PathBuf = segments.iter().collect::<PathBuf>().join("init.lua");
        candidates
            .iter()
            .find(|entry| entry.path.ends_with(&as_file) || entry.path.ends_with(&as_dir))
            .or_else(|| candidates.first())
            .map(|entry| entry.path.clone())
    }

    pub fn entries(&self, name: &str) -> Vec<ModuleEntry> {
        self.map
            .read()
            .by_name
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    /// Every module name, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.map.read().by_name.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.map.read().by_name.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn same_file(indexed: &Path, deleted: &Path) -> bool {
    match (deleted.parent().and_then(|p| p.canonicalize().ok()), deleted.file_name()) {
        (Some(parent), Some(file)) => indexed == parent.join(file),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_module_key() {
        assert_eq!(module_key(Path::new("/w/lib/util.lua")).as_deref(), Some("util"));
        assert_eq!(module_key(Path::new("/w/net/init.lua")).as_deref(), Some("net"));
        assert_eq!(module_key(Path::new("/w/readme.md")), None);
    }

    #[test]
    fn test_lookup_before_scan_is_none() {
        let index = ModuleIndex::new();
        assert!(!index.is_scanned());
        assert_eq!(index.resolve("util"), None);
    }

    #[test]
    fn test_rescan_and_dotted_preference() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::create_dir_all(root.join("other")).unwrap();
        fs::write(root.join("a/b/c.lua"), "return {}").unwrap();
        fs::write(root.join("other/c.lua"), "return {}").unwrap();
        fs::create_dir_all(root.join("net")).unwrap();
        fs::write(root.join("net/init.lua"), "return {}").unwrap();

        let index = ModuleIndex::new();
        index.configure(vec![root.to_path_buf()], vec![], false);
        assert_eq!(index.rescan(), 3);

        let resolved = index.resolve("a.b.c").unwrap();
        assert!(resolved.ends_with("a/b/c.lua"));
        let resolved = index.resolve("other.c").unwrap();
        assert!(resolved.ends_with("other/c.lua"));
        assert!(index.resolve("net").unwrap().ends_with("net/init.lua"));
        assert_eq!(index.entries("c").len(), 2);
    }

    #[test]
    fn test_incremental_add_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let index = ModuleIndex::new();
        index.configure(vec![root.to_path_buf()], vec![], false);
        index.rescan();

        let file = root.join("foo.lua");
        fs::write(&file, "return {}").unwrap();
        assert!(index.add_file(&file));
        assert!(!index.add_file(&file));
        assert!(index.resolve("foo").is_some());

        fs::remove_file(&file).unwrap();
        assert!(index.remove_file(&file));
        assert_eq!(index.resolve("foo"), None);
    }

    #[test]
    fn test_add_outside_roots_rejected() {
        let root = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let index = ModuleIndex::new();
        index.configure(vec![root.path().to_path_buf()], vec![], false);

        let file = outside.path().join("stray.lua");
        fs::write(&file, "").unwrap();
        assert!(!index.add_file(&file));
    }
}
