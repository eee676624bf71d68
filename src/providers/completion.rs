//! Completion and completion-resolve.
//!
//! After `a.b.` (or `a:`) the members of the container are offered, own
//! members first, then inherited ones. Otherwise every name visible at the
//! cursor is offered. Documentation is left for [`resolve_completion`].

use serde::Serialize;

use super::declaration_line;
use super::text::completion_prefix;
use crate::indexing::DocumentManager;
use crate::semantic::{DocumentIndex, Home, resolve_in};
use crate::types::{DocumentId, Position, SymbolId, SymbolKind};

/// Locator carried by an item so resolve can find the symbol again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionData {
    pub document: DocumentId,
    pub symbol: SymbolId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionItem {
    pub label: String,
    pub kind: SymbolKind,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<String>,
    pub data: CompletionData,
}

fn item(index: &DocumentIndex, id: SymbolId) -> CompletionItem {
    let symbol = index.symbol(id);
    CompletionItem {
        label: symbol.name.clone(),
        kind: symbol.kind,
        detail: declaration_line(index, symbol),
        documentation: None,
        data: CompletionData {
            document: index.document.clone(),
            symbol: id,
        },
    }
}

pub fn completions(
    documents: &DocumentManager,
    document: &DocumentId,
    position: Position,
) -> Vec<CompletionItem> {
    let Some(index) = documents.get(document) else {
        return Vec::new();
    };
    let offset = index.offset(position);
    let prefix = completion_prefix(&index.text, offset);

    let mut items: Vec<CompletionItem> = match &prefix.container {
        Some(path) => {
            let anchor = offset.saturating_sub(prefix.partial.len() + path.len() + 1);
            let Some(container) = resolve_in(&index, path, anchor).into_first() else {
                return Vec::new();
            };
            let located = Home::local(&container.index.table).locate(container.id);
            located
                .members(true)
                .into_iter()
                .filter(|(name, _)| name.starts_with(prefix.partial.as_str()))
                .map(|(_, member)| item(&member.index(&container.index), member.id))
                .collect()
        }
        None => {
            let scope = index.scope_at(offset);
            index
                .table
                .visible(scope, offset)
                .into_iter()
                .filter(|id| {
                    let symbol = index.symbol(*id);
                    symbol.name.starts_with(prefix.partial.as_str()) && symbol.name != prefix.partial
                })
                .map(|id| item(&index, id))
                .collect()
        }
    };

    if prefix.container.is_none() {
        items.sort_by(|a, b| a.label.cmp(&b.label));
    }
    items
}

/// Attach the doc comment to an item produced by [`completions`].
pub fn resolve_completion(documents: &DocumentManager, mut item: CompletionItem) -> CompletionItem {
    let doc = documents.get(&item.data.document).and_then(|index| {
        let symbol = index.table.get(item.data.symbol)?;
        (symbol.name == item.label).then(|| symbol.doc_comment.clone()).flatten()
    });
    item.documentation = doc;
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(code: &str) -> (DocumentManager, DocumentId) {
        let documents = DocumentManager::default();
        let doc = DocumentId::new("file:///main.lua");
        documents.update(&doc, code);
        (documents, doc)
    }

    #[test]
    fn test_member_completion_includes_inherited() {
        let code = "local Base = {}\nfunction Base.hello() end\nlocal D = setmetatable({ here = 1 }, { __index = Base })\nlocal v = D.he\n";
        let (documents, doc) = setup(code);
        let labels: Vec<String> = completions(&documents, &doc, Position::new(3, 14))
            .into_iter()
            .map(|item| item.label)
            .collect();
        assert_eq!(labels, vec!["here", "hello"]);
    }

    #[test]
    fn test_scope_completion_and_resolve() {
        let code = "-- the answer\nlocal answer = 42\nlocal function f()\n  local another = 1\n  local z = an\nend\nlocal y = an\n";
        let (documents, doc) = setup(code);

        let inside: Vec<String> = completions(&documents, &doc, Position::new(4, 14))
            .into_iter()
            .map(|item| item.label)
            .collect();
        assert_eq!(inside, vec!["another", "answer"]);

        let outside = completions(&documents, &doc, Position::new(6, 12));
        assert_eq!(outside.len(), 1);
        let resolved = resolve_completion(&documents, outside[0].clone());
        assert_eq!(resolved.documentation.as_deref(), Some("the answer"));
    }
}
