//! Editor features built on the definition resolver.
//!
//! Each provider reads the current index snapshot from the
//! [`DocumentManager`](crate::indexing::DocumentManager) it is handed and
//! answers in protocol-shaped values that serialize with camelCase names.

pub mod completion;
pub mod definition;
pub mod hover;
pub mod ldoc;
pub mod rename;
pub mod signature;
pub mod symbols;
pub mod text;

pub use completion::{CompletionData, CompletionItem, completions, resolve_completion};
pub use definition::definitions;
pub use hover::{Hover, hover};
pub use ldoc::{DocScaffold, doc_scaffold};
pub use rename::{RenameError, TextEdit, WorkspaceEdit, rename};
pub use signature::{SignatureHelp, signature_help};
pub use symbols::{DocumentSymbol, document_symbols};

use serde::Serialize;

use crate::semantic::{DocumentIndex, Symbol};
use crate::types::{DocumentId, Range};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub document: DocumentId,
    pub range: Range,
}

/// `M.sub.name` / `M:name` for members, the bare name otherwise.
pub fn qualified_name(index: &DocumentIndex, symbol: &Symbol) -> String {
    let mut parts = vec![symbol.name.as_str()];
    let mut container = symbol.container;
    // containers are always earlier symbols, so this terminates; the bound
    // guards against malformed links anyway
    for _ in 0..32 {
        let Some(id) = container else { break };
        let Some(parent) = index.table.get(id) else {
            break;
        };
        parts.push(parent.name.as_str());
        container = parent.container;
    }
    parts.reverse();

    let separator_before_last = match symbol.ty.as_function() {
        Some(function) if function.is_method => ":",
        _ => ".",
    };
    match parts.split_last() {
        Some((last, path)) if !path.is_empty() => {
            format!("{}{separator_before_last}{last}", path.join("."))
        }
        _ => symbol.name.clone(),
    }
}

/// One-line Lua-looking declaration used by hover and completion detail.
pub fn declaration_line(index: &DocumentIndex, symbol: &Symbol) -> String {
    let name = qualified_name(index, symbol);
    let local = if symbol.is_local && !symbol.is_member() {
        "local "
    } else {
        ""
    };
    match symbol.ty.as_function() {
        Some(function) => {
            let mut line = format!("{local}function {name}({})", function.params.join(", "));
            if !function.returns.is_unknown() {
                line.push_str(" -> ");
                line.push_str(&function.returns.describe());
            }
            line
        }
        None => format!("{local}{name}: {}", symbol.ty.describe()),
    }
}
