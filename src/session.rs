//! Editor session.
//!
//! Owns everything one workspace needs: settings, the lifecycle manager,
//! the module index and the checker. A transport layer calls the
//! notification handlers (`did_open`, `did_change`, ...) and the query
//! methods; diagnostics go out through a [`DiagnosticSink`].
//!
//! Rebuilds run on the blocking pool. Each one is tagged with the revision
//! its edit produced, and its results (index and diagnostics) are dropped if
//! the document moved on while it ran.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::checker::Checker;
use crate::config::{ConfigError, Settings};
use crate::indexing::{CommitOutcome, DocumentManager, ModuleIndex};
use crate::providers::{self, CompletionItem, DocScaffold, DocumentSymbol, Hover, Location};
use crate::providers::{RenameError, SignatureHelp, WorkspaceEdit};
use crate::semantic::DocumentIndex;
use crate::types::{Diagnostic, DocumentId, Position, Revision};
use crate::watcher::{FileChangeKind, FileEvent};

/// Where diagnostics and user-facing warnings are delivered.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    async fn publish(&self, document: &DocumentId, revision: Revision, diagnostics: Vec<Diagnostic>);

    async fn show_warning(&self, message: String);
}

/// Identities a deleted file may be indexed under: the path as reported and
/// the canonical one `require` resolution uses. The file is gone, so only
/// its directory can be canonicalized.
fn deleted_documents(path: &Path) -> Vec<DocumentId> {
    let reported = DocumentId::from_path(path);
    let canonical = match (path.parent().and_then(|p| p.canonicalize().ok()), path.file_name()) {
        (Some(parent), Some(file)) => DocumentId::from_path(&parent.join(file)),
        _ => return vec![reported],
    };
    if canonical == reported {
        vec![reported]
    } else {
        vec![reported, canonical]
    }
}

/// What caused a diagnostics run; the checker settings gate each one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trigger {
    Typing,
    Save,
}

pub struct Session {
    settings: RwLock<Settings>,
    workspace_root: Option<PathBuf>,
    documents: Arc<DocumentManager>,
    modules: Arc<ModuleIndex>,
    checker: RwLock<Checker>,
    sink: Arc<dyn DiagnosticSink>,
    checker_warned: AtomicBool,
    open: Mutex<HashSet<DocumentId>>,
    /// Last revision whose diagnostics went out, per document.
    published: Mutex<HashMap<DocumentId, Revision>>,
}

impl Session {
    pub fn new(
        settings: Settings,
        workspace_root: Option<PathBuf>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let modules = Arc::new(ModuleIndex::new());
        modules.configure(
            settings.search_roots(workspace_root.as_deref()),
            settings.search.filters.clone(),
            settings.search.follow_links,
        );
        let documents = Arc::new(DocumentManager::with_modules(
            settings.parser_options(),
            modules.clone(),
        ));
        let checker = Checker::new(settings.static_check.clone());

        Self {
            settings: RwLock::new(settings),
            workspace_root,
            documents,
            modules,
            checker: RwLock::new(checker),
            sink,
            checker_warned: AtomicBool::new(false),
            open: Mutex::new(HashSet::new()),
            published: Mutex::new(HashMap::new()),
        }
    }

    pub fn documents(&self) -> &Arc<DocumentManager> {
        &self.documents
    }

    pub fn modules(&self) -> &Arc<ModuleIndex> {
        &self.modules
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Initial workspace scan. Returns the number of module files found.
    pub async fn initialize(&self) -> usize {
        self.rescan_modules().await
    }

    async fn rescan_modules(&self) -> usize {
        let modules = self.modules.clone();
        match tokio::task::spawn_blocking(move || modules.rescan()).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!("[session] module scan failed: {e}");
                0
            }
        }
    }

    // Lifecycle notifications

    pub async fn did_open(&self, document: &DocumentId, text: &str) {
        self.open.lock().insert(document.clone());
        self.edit(document, text, Trigger::Typing).await;
    }

    pub async fn did_change(&self, document: &DocumentId, text: &str) {
        self.edit(document, text, Trigger::Typing).await;
    }

    pub async fn did_save(&self, document: &DocumentId) {
        let Some(index) = self.documents.get(document) else {
            return;
        };
        self.publish_diagnostics(index, Trigger::Save).await;
    }

    /// The index is kept (other documents may require this one); only the
    /// diagnostics are cleared, and only if configured to.
    pub async fn did_close(&self, document: &DocumentId) {
        self.open.lock().remove(document);
        if !self.settings.read().static_check.keep_after_closed {
            let revision = self.documents.revision(document);
            self.sink.publish(document, revision, Vec::new()).await;
        }
    }

    pub async fn did_change_watched_files(&self, events: Vec<FileEvent>) {
        for event in events {
            match event.kind {
                FileChangeKind::Created => {
                    if self.modules.add_file(&event.path) {
                        crate::log_event!("session", "module added", "{}", event.path.display());
                    }
                }
                FileChangeKind::Deleted => {
                    self.modules.remove_file(&event.path);
                    for document in deleted_documents(&event.path) {
                        self.open.lock().remove(&document);
                        if self.documents.remove(&document) {
                            let revision = self.documents.revision(&document);
                            self.sink.publish(&document, revision, Vec::new()).await;
                        }
                    }
                }
                FileChangeKind::Changed => {
                    // Exports of closed modules stay as indexed until a rescan
                    // or until the file is opened
                    crate::debug_event!("session", "changed (ignored)", "{}", event.path.display());
                }
            }
        }
    }

    /// Apply an editor configuration payload. Parser options affect later
    /// rebuilds only; the module map is rescanned.
    pub async fn did_change_configuration(&self, payload: serde_json::Value) -> Result<(), ConfigError> {
        let settings = Settings::from_editor_payload(payload)?;
        self.apply_settings(settings).await;
        Ok(())
    }

    pub async fn apply_settings(&self, settings: Settings) {
        self.documents.reconfigure(settings.parser_options());
        *self.checker.write() = Checker::new(settings.static_check.clone());
        self.modules.configure(
            settings.search_roots(self.workspace_root.as_deref()),
            settings.search.filters.clone(),
            settings.search.follow_links,
        );
        *self.settings.write() = settings;
        let count = self.rescan_modules().await;
        crate::log_event!("session", "configuration applied", "{count} module files");
    }

    /// Rebuild a document from new text. `None` when the result was stale.
    async fn edit(&self, document: &DocumentId, text: &str, trigger: Trigger) -> Option<Arc<DocumentIndex>> {
        let pending = self.documents.begin_edit(document, text);
        let revision = pending.revision;
        let documents = self.documents.clone();
        let built = tokio::task::spawn_blocking(move || documents.build(&pending)).await;

        let index = match built {
            Ok(index) => index,
            Err(e) => {
                tracing::error!("[session] rebuild of {document} {revision} failed: {e}");
                return None;
            }
        };

        match self.documents.commit(index) {
            CommitOutcome::Applied(index) => {
                self.publish_diagnostics(index.clone(), trigger).await;
                Some(index)
            }
            CommitOutcome::Stale { built, current } => {
                crate::debug_event!("session", "discarded", "{document} {built} (now {current})");
                None
            }
        }
    }

    async fn publish_diagnostics(&self, index: Arc<DocumentIndex>, trigger: Trigger) {
        let mut diagnostics = index.diagnostics.clone();

        let checker = self.checker.read().clone();
        let wanted = checker.is_enabled()
            && match trigger {
                Trigger::Typing => checker.config().on_typing,
                Trigger::Save => checker.config().on_save,
            };
        if wanted && !index.malformed {
            let filename = index
                .document
                .to_path()
                .map(|path| path.to_string_lossy().into_owned())
                .unwrap_or_else(|| index.document.to_string());
            match checker.check(&filename, &index.text).await {
                Ok(found) => diagnostics.extend(found),
                Err(e) => {
                    tracing::warn!("[session] static check failed: {e}");
                    if !self.checker_warned.swap(true, Ordering::SeqCst) {
                        self.sink.show_warning(format!("Static check failed: {e}")).await;
                    }
                }
            }
        }

        // The document may have been edited while the checker ran
        let current = self.documents.revision(&index.document);
        if current != index.revision {
            crate::debug_event!(
                "session",
                "diagnostics dropped",
                "{} {} (now {current})",
                index.document,
                index.revision
            );
            return;
        }
        {
            let mut published = self.published.lock();
            let last = published.entry(index.document.clone()).or_default();
            if *last > index.revision {
                return;
            }
            *last = index.revision;
        }
        self.sink.publish(&index.document, index.revision, diagnostics).await;
    }

    pub fn is_open(&self, document: &DocumentId) -> bool {
        self.open.lock().contains(document)
    }

    // Queries

    pub fn definition(&self, document: &DocumentId, position: Position) -> Vec<Location> {
        providers::definitions(&self.documents, document, position)
    }

    pub fn hover(&self, document: &DocumentId, position: Position) -> Option<Hover> {
        providers::hover(&self.documents, document, position)
    }

    pub fn completion(&self, document: &DocumentId, position: Position) -> Vec<CompletionItem> {
        providers::completions(&self.documents, document, position)
    }

    pub fn resolve_completion(&self, item: CompletionItem) -> CompletionItem {
        providers::resolve_completion(&self.documents, item)
    }

    pub fn signature_help(&self, document: &DocumentId, position: Position) -> Option<SignatureHelp> {
        providers::signature_help(&self.documents, document, position)
    }

    pub fn rename(
        &self,
        document: &DocumentId,
        position: Position,
        new_name: &str,
    ) -> Result<Option<WorkspaceEdit>, RenameError> {
        providers::rename(&self.documents, document, position, new_name)
    }

    pub fn document_symbols(&self, document: &DocumentId) -> Vec<DocumentSymbol> {
        let global_only = self.settings.read().symbol_display.show_function_global_only;
        self.documents
            .get(document)
            .map(|index| providers::document_symbols(&index, global_only))
            .unwrap_or_default()
    }

    pub fn doc_scaffold(&self, document: &DocumentId, position: Position) -> Option<DocScaffold> {
        let index = self.documents.get(document)?;
        let config = self.settings.read().doc_gen.clone();
        providers::doc_scaffold(&index, position.line, &config)
    }
}
