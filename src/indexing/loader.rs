//! On-demand module loading for `require`.
//!
//! Looks the name up in the workspace module index, reuses the document's
//! current index when there is one, and otherwise reads and indexes the file
//! (recursively, through the same loader). A stack of documents being built
//! stops `require` cycles; depth is capped as well.

use std::sync::Arc;

use super::documents::{DocumentManager, read_source};
use crate::semantic::{DocumentIndex, ModuleLoader};
use crate::types::DocumentId;

/// Deepest chain of not-yet-indexed modules indexed for one build.
pub const MAX_REQUIRE_DEPTH: usize = 16;

pub struct WorkspaceLoader<'a> {
    documents: &'a DocumentManager,
    /// Documents currently being built, outermost first.
    stack: Vec<DocumentId>,
}

impl<'a> WorkspaceLoader<'a> {
    pub fn new(documents: &'a DocumentManager, building: DocumentId) -> Self {
        Self {
            documents,
            stack: vec![building],
        }
    }
}

impl ModuleLoader for WorkspaceLoader<'_> {
    fn load(&mut self, name: &str) -> Option<Arc<DocumentIndex>> {
        let modules = self.documents.modules()?;
        let path = modules.resolve(name)?;
        let document = DocumentId::from_path(&path);

        if self.stack.contains(&document) {
            crate::debug_event!("loader", "cycle", "require('{name}') from {document}");
            return None;
        }
        if let Some(index) = self.documents.get(&document) {
            return Some(index);
        }
        if self.stack.len() > MAX_REQUIRE_DEPTH {
            tracing::debug!("[loader] require('{name}') exceeds depth {MAX_REQUIRE_DEPTH}");
            return None;
        }

        let text = match read_source(&path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("[loader] {e}");
                return None;
            }
        };

        let documents = self.documents;
        let pending = documents.begin_load(&document, text);
        self.stack.push(document);
        let index = documents.build_with(&pending, self);
        self.stack.pop();

        crate::debug_event!("loader", "indexed", "require('{name}') -> {}", path.display());
        Some(documents.publish_loaded(index))
    }
}
