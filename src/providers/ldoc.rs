//! LDoc comment scaffold for the function declared on a line.

use serde::Serialize;

use super::qualified_name;
use super::text::line_indent;
use crate::config::DocGenConfig;
use crate::semantic::DocumentIndex;
use crate::types::Position;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocScaffold {
    /// Where to insert `text` (start of the declaration's line).
    pub position: Position,
    pub text: String,
}

pub fn doc_scaffold(index: &DocumentIndex, line: u32, config: &DocGenConfig) -> Option<DocScaffold> {
    let symbol = index
        .definitions()
        .iter()
        .filter(|symbol| symbol.is_function() && !symbol.span.is_empty())
        .filter(|symbol| symbol.full_range.start.line == line)
        .min_by_key(|symbol| symbol.span.start)?;
    let function = symbol.ty.as_function()?;

    let line_start = index.offset(Position::new(line, 0));
    let indent = line_indent(&index.text, line_start);

    let mut lines = vec![format!("--- {}", qualified_name(index, symbol))];
    lines.extend(function.params.iter().map(|param| format!("-- @param {param}")));
    if !function.returns.is_unknown() {
        lines.push(format!("-- @return {}", function.returns.describe()));
    }
    if config.author_in_function_level && !config.author_name.is_empty() {
        lines.push(format!("-- @author {}", config.author_name));
    }

    let text = lines
        .into_iter()
        .map(|doc_line| format!("{indent}{doc_line}\n"))
        .collect();
    Some(DocScaffold {
        position: Position::new(line, 0),
        text,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ParserOptions;
    use crate::semantic::{NoModules, build_index};
    use crate::types::{DocumentId, Revision};
    use std::sync::Arc;

    #[test]
    fn test_scaffold_for_function() {
        let code = "local M = {}\n  function M.area(w, h)\n    return w * h\n  end\nreturn M\n";
        let index = build_index(
            DocumentId::new("file:///shapes.lua"),
            Revision::new(1),
            Arc::from(code),
            &ParserOptions::default(),
            &mut NoModules,
        );
        let config = DocGenConfig {
            author_in_function_level: true,
            author_name: "dev".to_string(),
        };

        let scaffold = doc_scaffold(&index, 1, &config).unwrap();
        assert_eq!(scaffold.position, Position::new(1, 0));
        assert_eq!(
            scaffold.text,
            "  --- M.area\n  -- @param w\n  -- @param h\n  -- @return number\n  -- @author dev\n"
        );
        assert_eq!(doc_scaffold(&index, 0, &config), None);
    }
}
