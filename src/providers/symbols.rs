//! Document outline.

use serde::Serialize;

use crate::semantic::{DocumentIndex, Symbol};
use crate::types::{Range, ScopeId, SymbolKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: SymbolKind,
    /// The whole declaring statement.
    pub range: Range,
    pub selection_range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

/// The table a member chain ultimately hangs off.
fn outermost<'a>(index: &'a DocumentIndex, symbol: &'a Symbol) -> &'a Symbol {
    let mut current = symbol;
    for _ in 0..32 {
        match current.container.and_then(|id| index.table.get(id)) {
            Some(parent) => current = parent,
            None => break,
        }
    }
    current
}

/// Definitions in source order. With `global_only`, only top-level
/// definitions and members of top-level tables are listed; otherwise every
/// named definition except parameters.
pub fn document_symbols(index: &DocumentIndex, global_only: bool) -> Vec<DocumentSymbol> {
    let mut symbols: Vec<&Symbol> = index
        .definitions()
        .iter()
        .filter(|symbol| !symbol.span.is_empty())
        .filter(|symbol| {
            if global_only {
                outermost(index, symbol).scope == ScopeId::ROOT
            } else {
                symbol.kind != SymbolKind::Parameter
            }
        })
        .collect();
    symbols.sort_by_key(|symbol| symbol.span.start);

    symbols
        .into_iter()
        .map(|symbol| DocumentSymbol {
            name: symbol.name.clone(),
            kind: symbol.kind,
            range: symbol.full_range,
            selection_range: symbol.range,
            container_name: symbol
                .container
                .and_then(|id| index.table.get(id))
                .map(|parent| parent.name.clone()),
        })
        .collect()
}
