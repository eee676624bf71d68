//! Go-to-definition.

use super::Location;
use super::text::expression_at;
use crate::indexing::DocumentManager;
use crate::semantic::{DefinitionResolver, Resolution};
use crate::types::{DocumentId, Position};

/// Definition of the expression under `position`. A path rooted at a
/// non-container has nowhere to go and yields nothing.
pub fn definitions(
    documents: &DocumentManager,
    document: &DocumentId,
    position: Position,
) -> Vec<Location> {
    let Some(index) = documents.get(document) else {
        return Vec::new();
    };
    let offset = index.offset(position);
    let Some((expression, span)) = expression_at(&index.text, offset) else {
        return Vec::new();
    };

    let range = index.lines.range(span);
    match DefinitionResolver::new(documents).resolve(&expression, range, document) {
        Resolution::Symbols(handles) => handles
            .iter()
            .map(|handle| Location {
                document: handle.document().clone(),
                range: handle.symbol().range,
            })
            .collect(),
        Resolution::NotNavigable => {
            tracing::debug!("[definition] '{expression}' is not navigable");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Range;

    #[test]
    fn test_definition_of_member() {
        let documents = DocumentManager::default();
        let doc = DocumentId::new("file:///main.lua");
        let code = "local t = { field = 1 }\nprint(t.field)\n";
        documents.update(&doc, code);

        let locations = definitions(&documents, &doc, Position::new(1, 9));
        assert_eq!(
            locations,
            vec![Location {
                document: doc.clone(),
                range: Range::new(0, 12, 0, 17),
            }]
        );
    }

    #[test]
    fn test_not_navigable_and_unknown_documents() {
        let documents = DocumentManager::default();
        let doc = DocumentId::new("file:///main.lua");
        documents.update(&doc, "local n = 1\nprint(n.x)\n");
        assert!(definitions(&documents, &doc, Position::new(1, 8)).is_empty());
        assert!(definitions(&documents, &DocumentId::new("file:///none.lua"), Position::new(0, 0)).is_empty());
    }
}
