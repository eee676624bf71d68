//! Rename of locally defined symbols

use luasense::indexing::{DocumentManager, ModuleIndex};
use luasense::providers::{RenameError, rename};
use luasense::{DocumentId, ParserOptions, Position};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const COUNTER: &str = "local count = 0\nlocal function bump()\n  count = count + 1\nend\nprint(count)\n\nlocal n = 5\nprint(n.x)\n";

fn counter() -> (DocumentManager, DocumentId) {
    let documents = DocumentManager::default();
    let doc = DocumentId::new("file:///counter.lua");
    documents.update(&doc, COUNTER);
    (documents, doc)
}

#[test]
fn test_rename_local_and_references() {
    let (documents, doc) = counter();
    let edit = rename(&documents, &doc, Position::new(4, 7), "total").unwrap().unwrap();
    let edits = edit.edits(&doc);

    let lines: Vec<u32> = edits.iter().map(|e| e.range.start.line).collect();
    assert!(lines.contains(&0));
    assert!(lines.contains(&2));
    assert!(lines.contains(&4));
    assert!(edits.iter().all(|e| e.new_text == "total"));
    assert!(edits.windows(2).all(|pair| pair[0].range.start < pair[1].range.start));
    assert_eq!(edit.changes.len(), 1);
}

#[test]
fn test_rename_rejections() {
    let (documents, doc) = counter();

    let invalid = rename(&documents, &doc, Position::new(0, 7), "not valid");
    assert_eq!(invalid.unwrap_err().code(), -9);
    assert_eq!(
        rename(&documents, &doc, Position::new(0, 7), "while"),
        Err(RenameError::InvalidName("while".to_string()))
    );

    // the blank line holds no expression
    assert_eq!(
        rename(&documents, &doc, Position::new(5, 0), "x"),
        Err(RenameError::InvalidExpression)
    );

    // undefined global
    assert_eq!(
        rename(&documents, &doc, Position::new(4, 2), "echo"),
        Err(RenameError::NotLocallyDefined)
    );

    // member of a number
    assert_eq!(rename(&documents, &doc, Position::new(7, 8), "y"), Ok(None));
}

#[test]
fn test_malformed_document_is_not_renamed() {
    let documents = DocumentManager::default();
    let doc = DocumentId::new("file:///broken.lua");
    documents.update(&doc, "local a = \n");
    let result = rename(&documents, &doc, Position::new(0, 6), "b");
    assert_eq!(result.unwrap_err().code(), -7);
}

#[test]
fn test_symbols_of_other_documents_are_not_renamed() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    fs::write(root.join("util.lua"), "local M = {}\nfunction M.greet() end\nreturn M\n").unwrap();
    let modules = Arc::new(ModuleIndex::new());
    modules.configure(vec![root.clone()], vec![], false);
    modules.rescan();
    let documents = DocumentManager::with_modules(ParserOptions::default(), modules);

    let main = DocumentId::from_path(&root.join("main.lua"));
    documents.update(&main, "local util = require('util')\nutil.greet()\n");

    assert_eq!(
        rename(&documents, &main, Position::new(1, 7), "hello"),
        Err(RenameError::NotLocallyDefined)
    );
    // the local holding the module is still renameable
    let edit = rename(&documents, &main, Position::new(0, 7), "u").unwrap().unwrap();
    assert_eq!(edit.edits(&main).len(), 2);
}
