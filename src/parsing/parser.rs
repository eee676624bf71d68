//! Lua parser
//!
//! Wraps tree-sitter-lua and reports two kinds of problems: syntax errors
//! (the document is malformed and gets an empty index) and constructs the
//! configured Lua version does not support (reported, not fatal).

use tree_sitter::{Node, Parser, Tree};

use super::{LuaVersion, ParseError, ParserOptions};
use crate::types::{Diagnostic, Range, Severity};

/// Deepest AST nesting any walker descends into.
pub const MAX_AST_DEPTH: usize = 512;

const SOURCE: &str = "luasense";

/// Returns false once a walk is deeper than [`MAX_AST_DEPTH`].
pub fn check_recursion_depth(depth: usize, node: Node) -> bool {
    if depth > MAX_AST_DEPTH {
        tracing::debug!(
            "[parser] depth limit reached at {} (line {})",
            node.kind(),
            node.start_position().row + 1
        );
        return false;
    }
    true
}

pub fn range_from_node(node: &Node) -> Range {
    let start = node.start_position();
    let end = node.end_position();
    Range::new(
        start.row as u32,
        start.column as u32,
        end.row as u32,
        end.column as u32,
    )
}

/// Result of parsing one document.
pub struct ParseOutput {
    /// `None` when the document is malformed.
    pub tree: Option<Tree>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseOutput {
    pub fn is_malformed(&self) -> bool {
        self.tree.is_none()
    }
}

/// Lua language parser
pub struct LuaParser {
    parser: Parser,
    version: LuaVersion,
}

impl LuaParser {
    pub fn new(options: &ParserOptions) -> Result<Self, ParseError> {
        let mut parser = Parser::new();
        let lang = tree_sitter_lua::LANGUAGE;
        parser
            .set_language(&lang.into())
            .map_err(|e| ParseError::Language {
                reason: e.to_string(),
            })?;

        Ok(Self {
            parser,
            version: options.version,
        })
    }

    pub fn version(&self) -> LuaVersion {
        self.version
    }

    /// Parse Lua source code.
    pub fn parse(&mut self, code: &str) -> ParseOutput {
        let Some(tree) = self.parser.parse(code, None) else {
            return ParseOutput {
                tree: None,
                diagnostics: vec![Diagnostic::new(
                    Range::default(),
                    Severity::Error,
                    SOURCE,
                    "parser produced no syntax tree",
                )],
            };
        };

        let root = tree.root_node();
        let mut diagnostics = Vec::new();

        if root.has_error() {
            collect_syntax_errors(root, code, &mut diagnostics, 0);
            if diagnostics.is_empty() {
                diagnostics.push(Diagnostic::new(
                    range_from_node(&root),
                    Severity::Error,
                    SOURCE,
                    "syntax error",
                ));
            }
            return ParseOutput {
                tree: None,
                diagnostics,
            };
        }

        check_version_syntax(root, self.version, &mut diagnostics, 0);

        ParseOutput {
            tree: Some(tree),
            diagnostics,
        }
    }
}

fn collect_syntax_errors(node: Node, code: &str, out: &mut Vec<Diagnostic>, depth: usize) {
    if !check_recursion_depth(depth, node) {
        return;
    }

    if node.is_missing() {
        out.push(Diagnostic::new(
            range_from_node(&node),
            Severity::Error,
            SOURCE,
            format!("missing '{}'", node.kind()),
        ));
        return;
    }

    if node.is_error() {
        let snippet: String = code[node.byte_range()].chars().take(24).collect();
        let snippet = snippet.lines().next().unwrap_or_default().trim().to_string();
        let message = if snippet.is_empty() {
            "unexpected syntax".to_string()
        } else {
            format!("unexpected syntax near '{snippet}'")
        };
        out.push(Diagnostic::new(
            range_from_node(&node),
            Severity::Error,
            SOURCE,
            message,
        ));
        return;
    }

    if !node.has_error() {
        return;
    }

    for child in node.children(&mut node.walk()) {
        collect_syntax_errors(child, code, out, depth + 1);
    }
}

fn check_version_syntax(node: Node, version: LuaVersion, out: &mut Vec<Diagnostic>, depth: usize) {
    if !check_recursion_depth(depth, node) {
        return;
    }

    match node.kind() {
        "goto_statement" | "label_statement" if !version.supports_goto() => {
            out.push(unsupported(&node, "goto and labels", version));
        }
        "binary_expression" | "unary_expression" if !version.supports_integer_ops() => {
            for child in node.children(&mut node.walk()) {
                if child.is_named() {
                    continue;
                }
                let op = child.kind();
                if matches!(op, "//" | "&" | "|" | "~" | "<<" | ">>") {
                    out.push(unsupported(&child, &format!("operator '{op}'"), version));
                }
            }
        }
        "attribute" if !version.supports_attributes() => {
            out.push(unsupported(&node, "local attributes", version));
        }
        _ => {}
    }

    for child in node.children(&mut node.walk()) {
        check_version_syntax(child, version, out, depth + 1);
    }
}

fn unsupported(node: &Node, what: &str, version: LuaVersion) -> Diagnostic {
    Diagnostic::new(
        range_from_node(node),
        Severity::Warning,
        SOURCE,
        format!("{what} not supported in Lua {version}"),
    )
}

/// Doc comment immediately preceding a statement.
///
/// Collects a run of `--`/`---` line comments, or a single `--[[ ]]` block.
pub fn extract_doc_comment(node: &Node, code: &str) -> Option<String> {
    let mut doc_lines = Vec::new();
    let mut current = node.prev_sibling();
    let mut expected_row = node.start_position().row;

    while let Some(sibling) = current {
        if sibling.kind() != "comment" || sibling.end_position().row + 1 < expected_row {
            break;
        }
        let comment_text = &code[sibling.byte_range()];

        if comment_text.starts_with("--[[") || comment_text.starts_with("--[=") {
            let content = comment_text
                .trim_start_matches("--[")
                .trim_start_matches('=')
                .trim_start_matches('[')
                .trim_end_matches(']')
                .trim_end_matches('=')
                .trim_end_matches(']')
                .trim();
            doc_lines.insert(0, content.to_string());
            break;
        } else if comment_text.starts_with("--") {
            let content = comment_text.trim_start_matches('-').trim();
            doc_lines.insert(0, content.to_string());
            expected_row = sibling.start_position().row;
            current = sibling.prev_sibling();
        } else {
            break;
        }
    }

    let filtered: Vec<String> = doc_lines.into_iter().filter(|l| !l.is_empty()).collect();
    if filtered.is_empty() {
        None
    } else {
        Some(filtered.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser(version: LuaVersion) -> LuaParser {
        LuaParser::new(&ParserOptions {
            version,
            allow_defined: false,
        })
        .unwrap()
    }

    #[test]
    fn test_parse_well_formed() {
        let mut parser = parser(LuaVersion::Lua51);
        let output = parser.parse("local x = 1\nreturn x\n");
        assert!(!output.is_malformed());
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_parse_malformed_reports_errors() {
        let mut parser = parser(LuaVersion::Lua51);
        let output = parser.parse("local function f(\n  return 1\n");
        assert!(output.is_malformed());
        assert!(!output.diagnostics.is_empty());
        assert!(output
            .diagnostics
            .iter()
            .all(|d| d.severity == Severity::Error));
    }

    #[test]
    fn test_goto_requires_52() {
        let code = "for i = 1, 3 do\n  goto continue\n  ::continue::\nend\n";

        let output = parser(LuaVersion::Lua51).parse(code);
        assert!(!output.is_malformed());
        assert_eq!(output.diagnostics.len(), 2);
        assert!(output.diagnostics[0].message.contains("goto"));

        let output = parser(LuaVersion::Lua52).parse(code);
        assert!(output.diagnostics.is_empty());
    }

    #[test]
    fn test_integer_division_requires_53() {
        let code = "local x = 7 // 2\n";
        let output = parser(LuaVersion::Lua52).parse(code);
        assert_eq!(output.diagnostics.len(), 1);
        assert!(output.diagnostics[0].message.contains("'//'"));

        assert!(parser(LuaVersion::Lua53).parse(code).diagnostics.is_empty());
    }

    #[test]
    fn test_doc_comment_extraction() {
        let code = "-- unrelated\n\n--- Adds numbers\n-- @param a first\nlocal function add(a, b) return a + b end\n";
        let mut parser = parser(LuaVersion::Lua51);
        let output = parser.parse(code);
        let tree = output.tree.unwrap();
        let root = tree.root_node();
        let decl = root
            .children(&mut root.walk())
            .find(|n| n.kind() == "function_declaration")
            .unwrap();

        let doc = extract_doc_comment(&decl, code).unwrap();
        assert_eq!(doc, "Adds numbers\n@param a first");
    }
}
