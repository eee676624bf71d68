use crate::types::{DocumentId, Range, ScopeId, Span, SymbolId, SymbolKind};

use super::types::{SymbolLink, Type};

/// A named, positioned definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub document: DocumentId,
    /// Range of the name itself.
    pub range: Range,
    /// Byte span of the name, used for position-sensitive lookup.
    pub span: Span,
    /// Range of the whole declaring statement.
    pub full_range: Range,
    /// Scope the symbol was declared in. Members record the scope of the
    /// statement that added them.
    pub scope: ScopeId,
    /// Table symbol this is a member of, if any.
    pub container: Option<SymbolId>,
    /// `local` declarations and parameters.
    pub is_local: bool,
    pub ty: Type,
    /// Set when the initializer was a plain name or dotted path: member
    /// lookups through this symbol follow the target instead of `ty`.
    pub alias: Option<SymbolLink>,
    pub doc_comment: Option<String>,
}

impl Symbol {
    pub fn is_member(&self) -> bool {
        self.container.is_some()
    }

    pub fn is_function(&self) -> bool {
        matches!(self.ty, Type::Function(_))
    }
}

/// An occurrence of a name, possibly dotted.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    /// The full expression up to and including this segment (`a.b` for the
    /// `b` in `a.b.c`).
    pub text: String,
    /// Range of the last segment.
    pub range: Range,
    pub span: Span,
    /// Scope the occurrence sits in.
    pub scope: ScopeId,
    /// Byte offset of the first segment, where scope lookup starts.
    pub anchor: usize,
    pub target: Option<SymbolLink>,
}

impl Reference {
    /// True when this reference resolves to `id` in its own document.
    pub fn targets_local(&self, id: SymbolId) -> bool {
        matches!(&self.target, Some(link) if link.is_local() && link.id == id)
    }
}
