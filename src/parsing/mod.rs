//! Lua parsing
//!
//! tree-sitter-lua produces the syntax tree; this module adds the
//! version-aware syntax checks and doc-comment extraction the semantic
//! layer relies on.

pub mod options;
pub mod parser;

pub use options::{LuaVersion, ParserOptions};
pub use parser::{
    LuaParser, MAX_AST_DEPTH, ParseOutput, check_recursion_depth, extract_doc_comment,
    range_from_node,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to set Lua language: {reason}")]
    Language { reason: String },
}
