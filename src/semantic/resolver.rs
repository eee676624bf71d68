//! Definition Resolver
//!
//! Maps a dotted expression at a position to the symbol it denotes. Two
//! outcomes are kept apart on purpose: a path whose root is not a container
//! is [`Resolution::NotNavigable`], while a path that simply leads nowhere
//! is an empty [`Resolution::Symbols`].

use std::sync::Arc;

use super::index::{DocumentIndex, SymbolHandle};
use super::members::Home;
use crate::indexing::DocumentManager;
use crate::types::{DocumentId, Range};

#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Zero or one symbols.
    Symbols(Vec<SymbolHandle>),
    /// The root of a multi-segment path is neither a table nor a module.
    NotNavigable,
}

impl Resolution {
    pub fn empty() -> Self {
        Resolution::Symbols(Vec::new())
    }

    pub fn is_not_navigable(&self) -> bool {
        matches!(self, Resolution::NotNavigable)
    }

    /// The symbols found, none for either non-result.
    pub fn symbols(&self) -> &[SymbolHandle] {
        match self {
            Resolution::Symbols(symbols) => symbols,
            Resolution::NotNavigable => &[],
        }
    }

    pub fn into_first(self) -> Option<SymbolHandle> {
        match self {
            Resolution::Symbols(symbols) => symbols.into_iter().next(),
            Resolution::NotNavigable => None,
        }
    }
}

/// Name segments of a dotted expression; `:` counts as `.`.
pub fn split_path(expression: &str) -> Vec<&str> {
    expression
        .split(['.', ':'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Resolve `expression` as seen from byte `offset` of `index`.
pub fn resolve_in(index: &Arc<DocumentIndex>, expression: &str, offset: usize) -> Resolution {
    let names = split_path(expression);
    let Some((root_name, rest)) = names.split_first() else {
        return Resolution::empty();
    };

    let table = &index.table;
    let scope = table.innermost_scope(offset);
    let Some(root) = table.lookup(scope, root_name, offset) else {
        return Resolution::empty();
    };
    let root = Home::local(table).locate(root);

    let Some((last, intermediate)) = rest.split_last() else {
        return Resolution::Symbols(vec![SymbolHandle::new(index.clone(), root.id)]);
    };

    let (_, root_type) = root.container();
    if !root_type.is_container() {
        return Resolution::NotNavigable;
    }

    let mut current = root;
    for name in intermediate {
        match current.own_member(name) {
            Some(next) if next.container().1.is_table() => current = next,
            _ => return Resolution::empty(),
        }
    }

    match current.extended_member(last) {
        Some(found) => Resolution::Symbols(vec![SymbolHandle::new(found.index(index), found.id)]),
        None => Resolution::empty(),
    }
}

/// Resolves against whatever index the lifecycle manager currently holds.
pub struct DefinitionResolver<'a> {
    documents: &'a DocumentManager,
}

impl<'a> DefinitionResolver<'a> {
    pub fn new(documents: &'a DocumentManager) -> Self {
        Self { documents }
    }

    pub fn resolve(&self, expression: &str, range: Range, document: &DocumentId) -> Resolution {
        let Some(index) = self.documents.get(document) else {
            tracing::debug!("[resolver] {document} is not indexed");
            return Resolution::empty();
        };
        let offset = index.offset(range.start);
        resolve_in(&index, expression, offset)
    }
}
