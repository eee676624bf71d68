//! Session notifications and diagnostics publishing

use async_trait::async_trait;
use luasense::config::StaticCheckConfig;
use luasense::watcher::FileEvent;
use luasense::{Diagnostic, DiagnosticSink, DocumentId, Position, Revision, Session, Settings};
use parking_lot::Mutex;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

#[derive(Default)]
struct RecordingSink {
    published: Mutex<Vec<(DocumentId, Revision, Vec<Diagnostic>)>>,
    warnings: Mutex<Vec<String>>,
}

impl RecordingSink {
    fn last_for(&self, document: &DocumentId) -> Option<(Revision, Vec<Diagnostic>)> {
        self.published
            .lock()
            .iter()
            .rev()
            .find(|(doc, _, _)| doc == document)
            .map(|(_, revision, diagnostics)| (*revision, diagnostics.clone()))
    }
}

#[async_trait]
impl DiagnosticSink for RecordingSink {
    async fn publish(&self, document: &DocumentId, revision: Revision, diagnostics: Vec<Diagnostic>) {
        self.published.lock().push((document.clone(), revision, diagnostics));
    }

    async fn show_warning(&self, message: String) {
        self.warnings.lock().push(message);
    }
}

fn settings_without_checker() -> Settings {
    Settings {
        static_check: StaticCheckConfig {
            enable: false,
            ..StaticCheckConfig::default()
        },
        ..Settings::default()
    }
}

fn new_session(settings: Settings, root: Option<&TempDir>) -> (Session, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::default());
    let root = root.map(|dir| dir.path().canonicalize().unwrap());
    (Session::new(settings, root, sink.clone()), sink)
}

#[tokio::test]
async fn test_parse_errors_are_published() {
    let (session, sink) = new_session(settings_without_checker(), None);
    let doc = DocumentId::new("file:///main.lua");

    session.did_open(&doc, "local x = 1\n").await;
    let (first, diagnostics) = sink.last_for(&doc).unwrap();
    assert!(diagnostics.is_empty());
    assert!(session.is_open(&doc));

    session.did_change(&doc, "local x = = 1\n").await;
    let (second, diagnostics) = sink.last_for(&doc).unwrap();
    assert!(second > first);
    assert!(!diagnostics.is_empty());
    assert!(session.documents().get(&doc).unwrap().malformed);
}

#[tokio::test]
async fn test_missing_checker_warns_once() {
    let settings = Settings {
        static_check: StaticCheckConfig {
            exec_path: Some("/nonexistent/bin/luacheck".to_string()),
            ..StaticCheckConfig::default()
        },
        ..Settings::default()
    };
    let (session, sink) = new_session(settings, None);
    let doc = DocumentId::new("file:///main.lua");

    session.did_open(&doc, "local a = 1\n").await;
    session.did_change(&doc, "local a = 2\n").await;
    session.did_save(&doc).await;

    assert_eq!(sink.warnings.lock().len(), 1);
    // parser diagnostics still go out
    assert_eq!(sink.published.lock().len(), 3);
}

#[tokio::test]
async fn test_close_respects_keep_after_closed() {
    let doc = DocumentId::new("file:///main.lua");

    let (session, sink) = new_session(settings_without_checker(), None);
    session.did_open(&doc, "local = 1\n").await;
    session.did_close(&doc).await;
    assert!(!sink.last_for(&doc).unwrap().1.is_empty());
    assert!(!session.is_open(&doc));
    // the index survives for other documents' requires
    assert!(session.documents().get(&doc).is_some());

    let mut settings = settings_without_checker();
    settings.static_check.keep_after_closed = false;
    let (session, sink) = new_session(settings, None);
    session.did_open(&doc, "local = 1\n").await;
    session.did_close(&doc).await;
    assert!(sink.last_for(&doc).unwrap().1.is_empty());
}

#[tokio::test]
async fn test_watched_files_update_requires() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().canonicalize().unwrap();
    let (session, sink) = new_session(settings_without_checker(), Some(&temp_dir));
    assert_eq!(session.initialize().await, 0);

    let util = root.join("util.lua");
    fs::write(&util, "local M = {}\nfunction M.run() end\nreturn M\n").unwrap();
    session
        .did_change_watched_files(vec![FileEvent::created(util.clone())])
        .await;
    assert_eq!(session.modules().len(), 1);

    let main = DocumentId::from_path(&root.join("main.lua"));
    let code = "local util = require('util')\nutil.run()\n";
    session.did_open(&main, code).await;
    let found = session.definition(&main, Position::new(1, 6));
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].document, DocumentId::from_path(&util));

    let util_doc = DocumentId::from_path(&util);
    fs::remove_file(&util).unwrap();
    session
        .did_change_watched_files(vec![FileEvent::deleted(util.clone())])
        .await;
    assert!(session.modules().is_empty());
    assert!(session.documents().get(&util_doc).is_none());
    assert!(sink.last_for(&util_doc).unwrap().1.is_empty());

    session.did_change(&main, code).await;
    assert!(session.definition(&main, Position::new(1, 6)).is_empty());
}

#[tokio::test]
async fn test_configuration_payload() {
    let (session, _sink) = new_session(settings_without_checker(), None);
    let payload = serde_json::json!({
        "luasense": {
            "staticCheck": { "enable": false },
            "parserOptions": { "languageVersion": "5.3" },
            "symbolDisplay": { "showFunctionGlobalOnly": false }
        }
    });
    session.did_change_configuration(payload).await.unwrap();
    let settings = session.settings();
    assert_eq!(settings.parser_options.language_version, "5.3");
    assert!(!settings.symbol_display.show_function_global_only);

    assert!(session.did_change_configuration(serde_json::json!(42)).await.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_delete_event_through_symlinked_directory() {
    let temp_dir = TempDir::new().unwrap();
    let real = temp_dir.path().canonicalize().unwrap().join("real");
    fs::create_dir(&real).unwrap();
    let link = temp_dir.path().join("link");
    std::os::unix::fs::symlink(&real, &link).unwrap();

    let sink = Arc::new(RecordingSink::default());
    let session = Session::new(settings_without_checker(), Some(real.clone()), sink.clone());
    fs::write(real.join("util.lua"), "local M = {}\nfunction M.run() end\nreturn M\n").unwrap();
    assert_eq!(session.initialize().await, 1);

    let main = DocumentId::from_path(&real.join("main.lua"));
    session.did_open(&main, "local util = require('util')\nutil.run()\n").await;
    let util_doc = DocumentId::from_path(&real.join("util.lua"));
    assert_eq!(session.definition(&main, Position::new(1, 6))[0].document, util_doc);
    assert!(session.documents().get(&util_doc).is_some());

    fs::remove_file(real.join("util.lua")).unwrap();
    session
        .did_change_watched_files(vec![FileEvent::deleted(link.join("util.lua"))])
        .await;
    assert!(session.modules().is_empty());
    assert!(session.documents().get(&util_doc).is_none());
    assert!(sink.last_for(&util_doc).unwrap().1.is_empty());
}
