//! Structural types inferred for Lua values.
//!
//! Member-bearing types (`Table`, `Module`) store symbol ids, which are only
//! meaningful inside the arena of the document that owns the table. A table
//! copied out of another document carries that document in `origin`, and a
//! `Module` always points at its origin index.

use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use super::DocumentIndex;
use crate::types::SymbolId;

/// Shared handle on another document's index.
#[derive(Clone)]
pub struct IndexRef(pub Arc<DocumentIndex>);

impl IndexRef {
    pub fn new(index: Arc<DocumentIndex>) -> Self {
        Self(index)
    }

    pub fn index(&self) -> &DocumentIndex {
        &self.0
    }

    pub fn arc(&self) -> &Arc<DocumentIndex> {
        &self.0
    }
}

impl PartialEq for IndexRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.document == other.0.document && self.0.revision == other.0.revision
    }
}

impl fmt::Debug for IndexRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.0.document, self.0.revision)
    }
}

/// A symbol in this document (`origin: None`) or in another one.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolLink {
    pub origin: Option<IndexRef>,
    pub id: SymbolId,
}

impl SymbolLink {
    pub fn local(id: SymbolId) -> Self {
        Self { origin: None, id }
    }

    pub fn is_local(&self) -> bool {
        self.origin.is_none()
    }
}

/// Where member lookup continues once a table's own members are exhausted.
#[derive(Debug, Clone, PartialEq)]
pub enum Prototype {
    /// `setmetatable(t, { __index = base })`: search `base` directly.
    Index(SymbolLink),
    /// `setmetatable(t, mt)`: search whatever `mt.__index` refers to.
    Metatable(SymbolLink),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableType {
    /// Set when the table was copied out of another document.
    pub origin: Option<IndexRef>,
    /// Named members in insertion order.
    pub members: IndexMap<String, SymbolId>,
    pub prototype: Option<Prototype>,
}

impl TableType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables borrowed from another document are never extended in place.
    pub fn is_foreign(&self) -> bool {
        self.origin.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    pub params: Vec<String>,
    pub returns: Box<Type>,
    /// Declared with `:`; `self` is implicit and not listed in `params`.
    pub is_method: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModuleType {
    pub name: String,
    pub origin: IndexRef,
}

impl ModuleType {
    /// The exported table, following re-exports.
    pub fn exports(&self) -> Option<(&TableType, &IndexRef)> {
        match &self.origin.index().exports {
            Type::Table(table) => Some((table, &self.origin)),
            Type::Module(inner) => inner.exports(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Type {
    #[default]
    Unknown,
    Nil,
    Boolean,
    Number,
    String,
    Function(FunctionType),
    Table(TableType),
    Module(ModuleType),
}

impl Type {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    /// Only tables and modules have members.
    pub fn is_container(&self) -> bool {
        matches!(self, Type::Table(_) | Type::Module(_))
    }

    pub fn is_table(&self) -> bool {
        matches!(self, Type::Table(_))
    }

    pub fn as_function(&self) -> Option<&FunctionType> {
        match self {
            Type::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn function(params: Vec<String>, is_method: bool) -> Self {
        Type::Function(FunctionType {
            params,
            returns: Box::new(Type::Unknown),
            is_method,
        })
    }

    /// Re-anchor a type read from `origin` so its ids stay meaningful when it
    /// is stored in another document.
    pub fn rebased(&self, origin: &IndexRef) -> Type {
        match self {
            Type::Table(table) if table.origin.is_none() => {
                let mut table = table.clone();
                table.origin = Some(origin.clone());
                Type::Table(table)
            }
            Type::Function(function) => Type::Function(FunctionType {
                params: function.params.clone(),
                returns: Box::new(function.returns.rebased(origin)),
                is_method: function.is_method,
            }),
            other => other.clone(),
        }
    }

    /// Short human readable rendering used by hover and completion.
    pub fn describe(&self) -> String {
        match self {
            Type::Unknown => "any".to_string(),
            Type::Nil => "nil".to_string(),
            Type::Boolean => "boolean".to_string(),
            Type::Number => "number".to_string(),
            Type::String => "string".to_string(),
            Type::Function(function) => {
                let mut out = format!("function({})", function.params.join(", "));
                if !function.returns.is_unknown() {
                    out.push_str(": ");
                    out.push_str(&function.returns.describe());
                }
                out
            }
            Type::Table(_) => "table".to_string(),
            Type::Module(module) => format!("module '{}'", module.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_variants() {
        assert!(Type::Table(TableType::new()).is_container());
        assert!(!Type::Number.is_container());
        assert!(!Type::function(vec![], false).is_container());
        assert!(!Type::Unknown.is_container());
    }

    #[test]
    fn test_describe_function() {
        let ty = Type::Function(FunctionType {
            params: vec!["a".into(), "b".into()],
            returns: Box::new(Type::Number),
            is_method: false,
        });
        assert_eq!(ty.describe(), "function(a, b): number");
        assert_eq!(Type::function(vec![], true).describe(), "function()");
    }
}
