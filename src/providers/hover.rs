//! Hover: declaration line plus the attached doc comment.

use serde::Serialize;

use super::declaration_line;
use super::text::expression_at;
use crate::indexing::DocumentManager;
use crate::semantic::resolve_in;
use crate::types::{DocumentId, Position, Range};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Hover {
    /// Markdown.
    pub contents: String,
    pub range: Range,
}

pub fn hover(documents: &DocumentManager, document: &DocumentId, position: Position) -> Option<Hover> {
    let index = documents.get(document)?;
    let offset = index.offset(position);
    let (expression, span) = expression_at(&index.text, offset)?;
    let handle = resolve_in(&index, &expression, span.start).into_first()?;
    let symbol = handle.symbol();

    let mut contents = format!("```lua\n{}\n```", declaration_line(&handle.index, symbol));
    if handle.document() != document {
        contents.push_str(&format!("\n\nDefined in `{}`", handle.document()));
    }
    if let Some(doc) = &symbol.doc_comment {
        contents.push_str("\n\n---\n\n");
        contents.push_str(doc);
    }

    Some(Hover {
        contents,
        range: index.lines.range(span),
    })
}
