//! Rename of locally defined symbols.
//!
//! Rejections carry the numeric codes editors already understand:
//!
//! | code | meaning |
//! |------|---------|
//! | -9   | new name is not a valid identifier |
//! | -8   | no expression under the cursor |
//! | -7   | document is not indexed (or failed to parse) |
//! | -6   | target is not defined in this document |

use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

use super::text::expression_at;
use crate::indexing::DocumentManager;
use crate::semantic::{Resolution, resolve_in};
use crate::types::{DocumentId, Position, Range};

const KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenameError {
    #[error("invalid newName \"{0}\"")]
    InvalidName(String),

    #[error("invalid expression")]
    InvalidExpression,

    #[error("document parse failed")]
    NotIndexed,

    #[error("rename can only apply to local defined variables")]
    NotLocallyDefined,
}

impl RenameError {
    pub fn code(&self) -> i32 {
        match self {
            RenameError::InvalidName(_) => -9,
            RenameError::InvalidExpression => -8,
            RenameError::NotIndexed => -7,
            RenameError::NotLocallyDefined => -6,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct WorkspaceEdit {
    pub changes: BTreeMap<DocumentId, Vec<TextEdit>>,
}

impl WorkspaceEdit {
    pub fn edits(&self, document: &DocumentId) -> &[TextEdit] {
        self.changes.get(document).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn identifier_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
}

pub fn is_valid_identifier(name: &str) -> bool {
    identifier_pattern().is_some_and(|pattern| pattern.is_match(name)) && !KEYWORDS.contains(&name)
}

/// Edits renaming the symbol under `position` to `new_name`.
///
/// `Ok(None)` when the expression's root is not a table or module, so the
/// member being renamed cannot exist anywhere.
pub fn rename(
    documents: &DocumentManager,
    document: &DocumentId,
    position: Position,
    new_name: &str,
) -> Result<Option<WorkspaceEdit>, RenameError> {
    if !is_valid_identifier(new_name) {
        return Err(RenameError::InvalidName(new_name.to_string()));
    }

    let index = documents
        .get(document)
        .filter(|index| !index.malformed)
        .ok_or(RenameError::NotIndexed)?;
    let offset = index.offset(position);
    let (expression, span) =
        expression_at(&index.text, offset).ok_or(RenameError::InvalidExpression)?;

    let handle = match resolve_in(&index, &expression, span.start) {
        Resolution::NotNavigable => return Ok(None),
        Resolution::Symbols(handles) => handles
            .into_iter()
            .next()
            .ok_or(RenameError::NotLocallyDefined)?,
    };
    if handle.document() != document || handle.index.revision != index.revision {
        return Err(RenameError::NotLocallyDefined);
    }
    let symbol = handle.symbol();
    // implicit `self` has no text to rewrite
    if symbol.span.is_empty() {
        return Err(RenameError::NotLocallyDefined);
    }

    let mut edits = vec![TextEdit {
        range: symbol.range,
        new_text: new_name.to_string(),
    }];
    edits.extend(index.references_to(symbol.id).map(|reference| TextEdit {
        range: reference.range,
        new_text: new_name.to_string(),
    }));
    edits.sort_by_key(|edit| edit.range.start);
    edits.dedup();

    crate::debug_event!(
        "rename",
        "planned",
        "{} -> {new_name}: {} edits",
        symbol.name,
        edits.len()
    );
    let mut changes = BTreeMap::new();
    changes.insert(document.clone(), edits);
    Ok(Some(WorkspaceEdit { changes }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_validation() {
        assert!(is_valid_identifier("new_name2"));
        assert!(is_valid_identifier("_"));
        assert!(!is_valid_identifier("a.b"));
        assert!(!is_valid_identifier("2x"));
        assert!(!is_valid_identifier("end"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(RenameError::InvalidName("a.b".into()).code(), -9);
        assert_eq!(RenameError::InvalidExpression.code(), -8);
        assert_eq!(RenameError::NotIndexed.code(), -7);
        assert_eq!(RenameError::NotLocallyDefined.code(), -6);
        assert_eq!(
            RenameError::InvalidName("a.b".into()).message(),
            "invalid newName \"a.b\""
        );
    }

    #[test]
    fn test_unindexed_document() {
        let documents = DocumentManager::default();
        let result = rename(&documents, &DocumentId::new("file:///x.lua"), Position::new(0, 0), "y");
        assert_eq!(result, Err(RenameError::NotIndexed));
    }
}
