//! Document lifecycle: revisions, stale builds and malformed edits

use luasense::indexing::{CommitOutcome, DocumentManager, IndexError, ModuleIndex};
use luasense::{DocumentId, ParserOptions, Revision};
use std::fs;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn doc() -> DocumentId {
    DocumentId::new("file:///workspace/main.lua")
}

#[test]
fn test_malformed_edit_replaces_index() {
    let documents = DocumentManager::default();
    documents.update(&doc(), "local ok = 1\n");
    assert_eq!(documents.get(&doc()).unwrap().definitions().len(), 1);

    let revision = documents.update(&doc(), "local function (\n");
    let index = documents.get(&doc()).unwrap();
    assert_eq!(index.revision, revision);
    assert!(index.malformed);
    assert!(index.definitions().is_empty());
    assert!(!index.diagnostics.is_empty());
}

#[test]
fn test_out_of_order_builds_keep_newest() {
    let documents = Arc::new(DocumentManager::default());
    let pending: Vec<_> = (0..8)
        .map(|i| documents.begin_edit(&doc(), format!("local v{i} = {i}\n")))
        .collect();
    let newest = pending.last().unwrap().revision;

    // Build everything concurrently, committing in reverse order
    let built: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = pending
            .iter()
            .rev()
            .map(|edit| {
                let documents = documents.clone();
                scope.spawn(move || documents.build(edit))
            })
            .collect();
        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    let mut applied = 0;
    for index in built {
        if let CommitOutcome::Applied(index) = documents.commit(index) {
            assert_eq!(index.revision, newest);
            applied += 1;
        }
    }
    assert_eq!(applied, 1);
    let current = documents.get(&doc()).unwrap();
    assert!(current.definitions().iter().any(|s| s.name == "v7"));
}

#[test]
fn test_revisions_start_fresh_per_document() {
    let documents = DocumentManager::default();
    let other = DocumentId::new("file:///workspace/other.lua");
    assert_eq!(documents.revision(&doc()), Revision::default());

    let first = documents.update(&doc(), "a = 1");
    let second = documents.update(&doc(), "a = 2");
    let other_first = documents.update(&other, "b = 1");
    assert!(second > first);
    assert_eq!(other_first, first);
}

#[test]
fn test_open_file_from_disk() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("lib.lua");
    fs::write(&path, "local M = {}\nfunction M.run() end\nreturn M\n").unwrap();

    let documents = DocumentManager::new(ParserOptions::default());
    let index = documents.open_file(&path).unwrap();
    assert!(index.exports_table());
    assert_eq!(documents.get(&DocumentId::from_path(&path)).unwrap().revision, index.revision);

    let missing = documents.open_file(&temp_dir.path().join("missing.lua"));
    assert!(matches!(missing, Err(IndexError::FileRead { .. })));
}

#[test]
fn test_require_during_pending_edit_keeps_edit() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    let util_path = root.join("util.lua");
    fs::write(&util_path, "local M = {}\nfunction M.disk() end\nreturn M\n").unwrap();
    let modules = Arc::new(ModuleIndex::new());
    modules.configure(vec![root.clone()], vec![], false);
    assert_eq!(modules.rescan(), 1);
    let documents = DocumentManager::with_modules(ParserOptions::default(), modules);

    let util = DocumentId::from_path(&util_path);
    let pending = documents.begin_edit(&util, "local M = {}\nfunction M.editor() end\nreturn M\n");
    let main = DocumentId::from_path(&root.join("main.lua"));
    documents.update(&main, "local u = require('util')\n");
    // the disk copy served the require without taking the slot
    assert!(documents.get(&util).is_none());

    let outcome = documents.commit(documents.build(&pending));
    assert!(matches!(outcome, CommitOutcome::Applied(_)));
    let current = documents.get(&util).unwrap();
    assert_eq!(current.revision, pending.revision);
    assert!(current.text.contains("M.editor"));
}
