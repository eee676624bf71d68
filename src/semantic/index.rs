use std::sync::Arc;

use crate::types::{Diagnostic, DocumentId, LineIndex, Position, Revision, ScopeId, SymbolId};

use super::scope::SymbolTable;
use super::symbol::{Reference, Symbol};
use super::types::Type;

/// Everything known about one document at one revision.
///
/// Built in one go by [`super::build_index`] and published behind an `Arc`;
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentIndex {
    pub document: DocumentId,
    pub revision: Revision,
    pub text: Arc<str>,
    pub lines: LineIndex,
    pub table: SymbolTable,
    pub references: Vec<Reference>,
    /// Type of the chunk's top-level `return`.
    pub exports: Type,
    pub diagnostics: Vec<Diagnostic>,
    /// The parse failed; the table holds only the root scope.
    pub malformed: bool,
}

impl DocumentIndex {
    /// The index of a document that failed to parse.
    pub fn empty(
        document: DocumentId,
        revision: Revision,
        text: Arc<str>,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        Self {
            document,
            revision,
            lines: LineIndex::new(&text),
            table: SymbolTable::new(text.len()),
            text,
            references: Vec::new(),
            exports: Type::Unknown,
            diagnostics,
            malformed: true,
        }
    }

    /// Flat list of all definitions, members included.
    pub fn definitions(&self) -> &[Symbol] {
        self.table.symbols()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.table.symbol(id)
    }

    pub fn offset(&self, position: Position) -> usize {
        self.lines.offset(position)
    }

    pub fn scope_at(&self, offset: usize) -> ScopeId {
        self.table.innermost_scope(offset)
    }

    pub fn reference_at(&self, offset: usize) -> Option<&Reference> {
        self.references
            .iter()
            .find(|reference| reference.span.contains(offset))
    }

    /// References resolved to `id` in this document.
    pub fn references_to(&self, id: SymbolId) -> impl Iterator<Item = &Reference> + '_ {
        self.references
            .iter()
            .filter(move |reference| reference.targets_local(id))
    }

    /// True when the exported value has members a `require` can reach.
    pub fn exports_table(&self) -> bool {
        match &self.exports {
            Type::Table(_) => true,
            Type::Module(module) => module.exports().is_some(),
            _ => false,
        }
    }
}

/// Read-only view of a symbol in some index, handed out by the resolver.
#[derive(Debug, Clone)]
pub struct SymbolHandle {
    pub index: Arc<DocumentIndex>,
    pub id: SymbolId,
}

impl SymbolHandle {
    pub fn new(index: Arc<DocumentIndex>, id: SymbolId) -> Self {
        Self { index, id }
    }

    pub fn symbol(&self) -> &Symbol {
        self.index.symbol(self.id)
    }

    pub fn document(&self) -> &DocumentId {
        &self.index.document
    }
}

impl PartialEq for SymbolHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.index.document == other.index.document
            && self.index.revision == other.index.revision
    }
}
