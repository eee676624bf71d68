//! Document Lifecycle Manager
//!
//! Holds the current [`DocumentIndex`] of every known document. An edit is
//! split into three steps so that the expensive part can run anywhere:
//!
//! 1. [`DocumentManager::begin_edit`] bumps the revision and captures the
//!    text and parser options (cheap, under the write lock)
//! 2. [`DocumentManager::build`] parses and binds (no lock held)
//! 3. [`DocumentManager::commit`] publishes the result, unless a newer edit
//!    arrived in the meantime, in which case the result is dropped
//!
//! Readers get `Arc` snapshots and never see a half-built index.
//!
//! Files indexed on behalf of `require` go through
//! [`DocumentManager::begin_load`] and [`DocumentManager::publish_loaded`]
//! instead, which never supersede an edit in flight.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::IndexError;
use super::loader::WorkspaceLoader;
use super::modules::ModuleIndex;
use crate::parsing::ParserOptions;
use crate::semantic::{DocumentIndex, ModuleLoader, build_index};
use crate::types::{DocumentId, Revision};

/// An edit whose index has not been built yet.
#[derive(Debug, Clone)]
pub struct PendingBuild {
    pub document: DocumentId,
    pub revision: Revision,
    pub text: Arc<str>,
    /// Options current when the edit began.
    pub options: ParserOptions,
}

#[derive(Debug, Clone)]
pub enum CommitOutcome {
    Applied(Arc<DocumentIndex>),
    /// A newer edit superseded this build; nothing was replaced.
    Stale { built: Revision, current: Revision },
}

impl CommitOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommitOutcome::Applied(_))
    }
}

/// Revision counter plus the index built for it. Removed documents keep
/// their slot so a later reopen continues from a higher revision.
#[derive(Debug, Default)]
struct Slot {
    revision: Revision,
    /// Last revision that was committed or removed. Behind `revision` while
    /// an edit is being built.
    settled: Revision,
    index: Option<Arc<DocumentIndex>>,
}

impl Slot {
    fn is_pending(&self) -> bool {
        self.settled != self.revision
    }
}

#[derive(Debug, Default)]
pub struct DocumentManager {
    slots: RwLock<HashMap<DocumentId, Slot>>,
    options: RwLock<ParserOptions>,
    modules: Option<Arc<ModuleIndex>>,
}

impl DocumentManager {
    /// A manager that cannot follow `require` (no module index).
    pub fn new(options: ParserOptions) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            options: RwLock::new(options),
            modules: None,
        }
    }

    pub fn with_modules(options: ParserOptions, modules: Arc<ModuleIndex>) -> Self {
        Self {
            modules: Some(modules),
            ..Self::new(options)
        }
    }

    pub fn modules(&self) -> Option<&Arc<ModuleIndex>> {
        self.modules.as_ref()
    }

    /// Start an edit: the revision is bumped now, so any build already in
    /// flight for this document is stale from here on.
    pub fn begin_edit(&self, document: &DocumentId, text: impl Into<Arc<str>>) -> PendingBuild {
        let options = self.options.read().clone();
        let mut slots = self.slots.write();
        let slot = slots.entry(document.clone()).or_default();
        slot.revision = slot.revision.next();
        PendingBuild {
            document: document.clone(),
            revision: slot.revision,
            text: text.into(),
            options,
        }
    }

    /// Build the index for a pending edit, following `require` through the
    /// module index.
    pub fn build(&self, pending: &PendingBuild) -> DocumentIndex {
        let mut loader = WorkspaceLoader::new(self, pending.document.clone());
        self.build_with(pending, &mut loader)
    }

    pub fn build_with(&self, pending: &PendingBuild, loader: &mut dyn ModuleLoader) -> DocumentIndex {
        build_index(
            pending.document.clone(),
            pending.revision,
            pending.text.clone(),
            &pending.options,
            loader,
        )
    }

    /// Publish a built index if its revision is still the current one.
    pub fn commit(&self, index: DocumentIndex) -> CommitOutcome {
        let mut slots = self.slots.write();
        let slot = slots.entry(index.document.clone()).or_default();
        if slot.revision != index.revision {
            crate::debug_event!(
                "documents",
                "stale",
                "{} built {} current {}",
                index.document,
                index.revision,
                slot.revision
            );
            return CommitOutcome::Stale {
                built: index.revision,
                current: slot.revision,
            };
        }
        let index = Arc::new(index);
        slot.settled = slot.revision;
        slot.index = Some(index.clone());
        CommitOutcome::Applied(index)
    }

    /// Start indexing a file for `require`. Unlike [`begin_edit`] nothing is
    /// bumped; the build carries the revision it would be published at.
    ///
    /// [`begin_edit`]: DocumentManager::begin_edit
    pub fn begin_load(&self, document: &DocumentId, text: impl Into<Arc<str>>) -> PendingBuild {
        PendingBuild {
            document: document.clone(),
            revision: self.revision(document).next(),
            text: text.into(),
            options: self.options.read().clone(),
        }
    }

    /// Publish an index built by [`begin_load`] if the document is idle and
    /// unchanged since. Otherwise the published index wins if there is one,
    /// and the loaded index is handed back without being stored.
    ///
    /// [`begin_load`]: DocumentManager::begin_load
    pub fn publish_loaded(&self, index: DocumentIndex) -> Arc<DocumentIndex> {
        let mut slots = self.slots.write();
        let slot = slots.entry(index.document.clone()).or_default();
        if let Some(current) = &slot.index {
            return current.clone();
        }
        let index = Arc::new(index);
        if slot.is_pending() || slot.revision.next() != index.revision {
            crate::debug_event!(
                "documents",
                "load kept private",
                "{} (edit {} in flight)",
                index.document,
                slot.revision
            );
            return index;
        }
        slot.revision = index.revision;
        slot.settled = index.revision;
        slot.index = Some(index.clone());
        index
    }

    /// Replace a document's content and rebuild it synchronously.
    pub fn update(&self, document: &DocumentId, text: impl Into<Arc<str>>) -> Revision {
        let pending = self.begin_edit(document, text);
        let index = self.build(&pending);
        self.commit(index);
        pending.revision
    }

    /// Index a file from disk under its `file://` identity.
    pub fn open_file(&self, path: &Path) -> Result<Arc<DocumentIndex>, IndexError> {
        let text = read_source(path)?;
        let document = DocumentId::from_path(path);
        let pending = self.begin_edit(&document, text);
        let index = self.build(&pending);
        match self.commit(index) {
            CommitOutcome::Applied(index) => Ok(index),
            CommitOutcome::Stale { .. } => self.get(&document).ok_or(IndexError::Superseded {
                document: document.to_string(),
            }),
        }
    }

    pub fn get(&self, document: &DocumentId) -> Option<Arc<DocumentIndex>> {
        self.slots.read().get(document)?.index.clone()
    }

    /// Current revision, zero for unknown documents.
    pub fn revision(&self, document: &DocumentId) -> Revision {
        self.slots
            .read()
            .get(document)
            .map(|slot| slot.revision)
            .unwrap_or_default()
    }

    /// Drop a document's index. Builds in flight for it become stale.
    pub fn remove(&self, document: &DocumentId) -> bool {
        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(document) else {
            return false;
        };
        slot.revision = slot.revision.next();
        slot.settled = slot.revision;
        let removed = slot.index.take().is_some();
        if removed {
            crate::log_event!("documents", "removed", "{document}");
        }
        removed
    }

    /// Options for builds that begin after this call.
    pub fn reconfigure(&self, options: ParserOptions) {
        let mut current = self.options.write();
        if *current != options {
            crate::log_event!(
                "documents",
                "reconfigured",
                "version {} allowDefined {}",
                options.version,
                options.allow_defined
            );
            *current = options;
        }
    }

    pub fn options(&self) -> ParserOptions {
        self.options.read().clone()
    }

    /// Documents that currently have an index, sorted.
    pub fn documents(&self) -> Vec<DocumentId> {
        let mut documents: Vec<DocumentId> = self
            .slots
            .read()
            .iter()
            .filter(|(_, slot)| slot.index.is_some())
            .map(|(document, _)| document.clone())
            .collect();
        documents.sort();
        documents
    }
}

pub(super) fn read_source(path: &Path) -> Result<String, IndexError> {
    std::fs::read_to_string(path).map_err(|e| IndexError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })
}
