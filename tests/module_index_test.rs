//! Module index maintenance from file events, as seen through `require`

use luasense::indexing::{DocumentManager, ModuleIndex};
use luasense::watcher::FileEvent;
use luasense::{DocumentId, ParserOptions, Type};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn required_type(documents: &DocumentManager, root: &Path, code: &str) -> Type {
    let main = DocumentId::from_path(&root.join("main.lua"));
    documents.update(&main, code);
    let index = documents.get(&main).unwrap();
    index.definitions()[0].ty.clone()
}

#[test]
fn test_created_and_deleted_modules() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    let modules = Arc::new(ModuleIndex::new());
    modules.configure(vec![root.clone()], vec![], false);
    assert_eq!(modules.rescan(), 0);
    let documents = DocumentManager::with_modules(ParserOptions::default(), modules.clone());

    let code = "local json = require('json')\n";
    assert!(required_type(&documents, &root, code).is_unknown());

    let path = root.join("json.lua");
    fs::write(&path, "return { encode = function(v) end }\n").unwrap();
    let created = FileEvent::from_change_type(path.clone(), 1).unwrap();
    assert!(modules.add_file(&created.path));
    match required_type(&documents, &root, code) {
        Type::Module(module) => assert_eq!(module.origin.index().document, DocumentId::from_path(&path)),
        other => panic!("expected module, got {other:?}"),
    }

    fs::remove_file(&path).unwrap();
    let deleted = FileEvent::from_change_type(path.clone(), 3).unwrap();
    assert!(modules.remove_file(&deleted.path));
    documents.remove(&DocumentId::from_path(&path));
    assert!(required_type(&documents, &root, code).is_unknown());
}

#[test]
fn test_dotted_require_prefers_matching_directory() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    for dir in ["net", "storage"] {
        fs::create_dir_all(root.join(dir)).unwrap();
        fs::write(
            root.join(dir).join("client.lua"),
            format!("return {{ {dir} = true }}\n"),
        )
        .unwrap();
    }
    let modules = Arc::new(ModuleIndex::new());
    modules.configure(vec![root.clone()], vec![], false);
    assert_eq!(modules.rescan(), 2);

    assert_eq!(modules.resolve("storage.client"), Some(root.join("storage/client.lua")));
    assert_eq!(modules.resolve("net/client"), Some(root.join("net/client.lua")));
    // A bare name falls back to the first candidate by path
    assert_eq!(modules.resolve("client"), Some(root.join("net/client.lua")));
    assert_eq!(modules.entries("client").len(), 2);
}

#[test]
fn test_filters_exclude_directories() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    fs::create_dir_all(root.join("vendor")).unwrap();
    fs::write(root.join("vendor/dep.lua"), "return {}\n").unwrap();
    fs::write(root.join("app.lua"), "return {}\n").unwrap();

    let modules = ModuleIndex::new();
    modules.configure(vec![root.clone()], vec!["vendor/**".to_string()], false);
    modules.rescan();
    assert_eq!(modules.names(), vec!["app".to_string()]);
    assert!(!modules.add_file(&root.join("vendor/dep.lua")));
}
