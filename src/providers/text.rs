//! Text scanning around a cursor, independent of the syntax tree so it keeps
//! working while the document is mid-edit and does not parse.

use crate::types::Span;

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_path_byte(b: u8) -> bool {
    is_ident_byte(b) || b == b'.' || b == b':'
}

/// `offset` clamped into the text and moved back onto a char boundary.
fn clamp(text: &str, offset: usize) -> usize {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Start of the dotted path that ends at `end`.
fn path_start(bytes: &[u8], end: usize) -> usize {
    let mut start = end;
    while start > 0 && is_path_byte(bytes[start - 1]) {
        start -= 1;
    }
    start
}

/// Trim separators left dangling at either end of a path slice.
fn trim_separators(text: &str, span: Span) -> Option<(String, Span)> {
    let slice = &text[span.start..span.end];
    let leading = slice.len() - slice.trim_start_matches(['.', ':']).len();
    let inner = slice.trim_matches(['.', ':']);
    if inner.is_empty() || inner.as_bytes()[0].is_ascii_digit() {
        return None;
    }
    let start = span.start + leading;
    Some((inner.to_string(), Span::new(start, start + inner.len())))
}

/// Dotted expression under the cursor: everything before it on the path,
/// plus the rest of the identifier the cursor is in.
///
/// For `a.b.c` with the cursor inside `b` this is `a.b`.
pub fn expression_at(text: &str, offset: usize) -> Option<(String, Span)> {
    let bytes = text.as_bytes();
    let offset = clamp(text, offset);
    let mut end = offset;
    while end < bytes.len() && is_ident_byte(bytes[end]) {
        end += 1;
    }
    let start = path_start(bytes, offset);
    if start == end {
        return None;
    }
    trim_separators(text, Span::new(start, end))
}

/// What a completion request at `offset` is completing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPrefix {
    /// Path of the container for `a.b.` style prefixes.
    pub container: Option<String>,
    /// Partial name typed so far (may be empty).
    pub partial: String,
}

pub fn completion_prefix(text: &str, offset: usize) -> CompletionPrefix {
    let bytes = text.as_bytes();
    let offset = clamp(text, offset);
    let start = path_start(bytes, offset);
    let typed = &text[start..offset];

    match typed.rfind(['.', ':']) {
        Some(separator) => {
            let container = typed[..separator].trim_matches(['.', ':']);
            CompletionPrefix {
                container: (!container.is_empty()).then(|| container.to_string()),
                partial: typed[separator + 1..].to_string(),
            }
        }
        None => CompletionPrefix {
            container: None,
            partial: typed.to_string(),
        },
    }
}

/// The call enclosing a cursor inside an argument list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub callee: String,
    pub callee_span: Span,
    /// Zero-based argument index the cursor is in.
    pub active_parameter: usize,
}

impl CallContext {
    pub fn is_method_call(&self) -> bool {
        self.callee.contains(':')
    }
}

/// Walk back from `offset` to the unmatched `(` of the enclosing call,
/// counting top-level commas on the way.
pub fn call_context(text: &str, offset: usize) -> Option<CallContext> {
    let bytes = text.as_bytes();
    let mut position = clamp(text, offset);
    let mut depth = 0usize;
    let mut commas = 0usize;

    while position > 0 {
        position -= 1;
        match bytes[position] {
            b')' | b'}' | b']' => depth += 1,
            b'{' | b'[' if depth > 0 => depth -= 1,
            // A cursor inside a table constructor is not in an argument list
            b'{' | b'[' => return None,
            b'(' if depth > 0 => depth -= 1,
            b'(' => {
                let mut end = position;
                while end > 0 && bytes[end - 1].is_ascii_whitespace() {
                    end -= 1;
                }
                let start = path_start(bytes, end);
                let (callee, callee_span) = trim_separators(text, Span::new(start, end))?;
                return Some(CallContext {
                    callee,
                    callee_span,
                    active_parameter: commas,
                });
            }
            b',' if depth == 0 => commas += 1,
            // a blank line ends the search
            b'\n' if depth == 0 && bytes[..position].ends_with(b"\n") => return None,
            _ => {}
        }
    }
    None
}

/// Leading whitespace of the line containing `offset`.
pub fn line_indent(text: &str, offset: usize) -> &str {
    let offset = clamp(text, offset);
    let line_start = text[..offset].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let line = &text[line_start..];
    let indent = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..indent]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_at() {
        let text = "print(a.b.c)";
        let (expr, span) = expression_at(text, 8).unwrap();
        assert_eq!(expr, "a.b");
        assert_eq!(span, Span::new(6, 9));

        assert_eq!(expression_at(text, 11).unwrap().0, "a.b.c");
        assert_eq!(expression_at("obj:method()", 6).unwrap().0, "obj:method");
        assert_eq!(expression_at("x = 1", 4), None);
        assert_eq!(expression_at("  ", 1), None);
    }

    #[test]
    fn test_completion_prefix() {
        assert_eq!(
            completion_prefix("local x = mod.sub.na", 20),
            CompletionPrefix {
                container: Some("mod.sub".to_string()),
                partial: "na".to_string(),
            }
        );
        assert_eq!(
            completion_prefix("obj:", 4),
            CompletionPrefix {
                container: Some("obj".to_string()),
                partial: String::new(),
            }
        );
        assert_eq!(completion_prefix("loc", 3).container, None);
    }

    #[test]
    fn test_call_context() {
        let text = "M.greet(a, f(b, c), ";
        let context = call_context(text, text.len()).unwrap();
        assert_eq!(context.callee, "M.greet");
        assert_eq!(context.active_parameter, 2);
        assert_eq!(context.callee_span, Span::new(0, 7));

        let context = call_context("obj:run(", 8).unwrap();
        assert!(context.is_method_call());
        assert_eq!(context.active_parameter, 0);

        assert_eq!(call_context("local t = { a, ", 15), None);
        assert_eq!(call_context("x = 1", 5), None);
    }

    #[test]
    fn test_line_indent() {
        let text = "local t = {}\n    function t.f()\n";
        assert_eq!(line_indent(text, 20), "    ");
        assert_eq!(line_indent(text, 3), "");
    }
}
