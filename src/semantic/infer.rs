//! Type Inference Engine
//!
//! Expression typing for the Scope Builder. Every expression visited here
//! also has its name references recorded, so the builder never walks an
//! expression twice.

use tree_sitter::Node;

use super::builder::{Inferred, ScopeBuilder, kind_for, name_path};
use super::members::Home;
use super::types::{IndexRef, ModuleType, Prototype, SymbolLink, TableType, Type};
use crate::parsing::{check_recursion_depth, extract_doc_comment};
use crate::types::SymbolKind;

impl<'a> ScopeBuilder<'a> {
    pub(super) fn infer_expr(&mut self, node: Node, depth: usize) -> Inferred {
        if !check_recursion_depth(depth, node) {
            return Inferred::default();
        }

        match node.kind() {
            "nil" => Inferred::of(Type::Nil),
            "true" | "false" => Inferred::of(Type::Boolean),
            "number" => Inferred::of(Type::Number),
            "string" => Inferred::of(Type::String),
            "vararg_expression" => Inferred::default(),
            "identifier" | "dot_index_expression" | "method_index_expression" => {
                self.infer_path(node, depth)
            }
            "parenthesized_expression" => node
                .named_children(&mut node.walk())
                .find(|child| child.kind() != "comment")
                .map(|inner| self.infer_expr(inner, depth + 1))
                .unwrap_or_default(),
            "table_constructor" => self.infer_table(node, depth),
            "function_definition" => self.infer_function(node, depth),
            "function_call" => self.infer_call(node, depth),
            "binary_expression" => self.infer_binary(node, depth),
            "unary_expression" => {
                if let Some(operand) = node.child_by_field_name("operand") {
                    self.infer_expr(operand, depth + 1);
                }
                match operator(&node) {
                    Some("not") => Inferred::of(Type::Boolean),
                    Some("-" | "#" | "~") => Inferred::of(Type::Number),
                    _ => Inferred::default(),
                }
            }
            _ => {
                for child in node.named_children(&mut node.walk()) {
                    self.infer_expr(child, depth + 1);
                }
                Inferred::default()
            }
        }
    }

    /// A name or dotted path: record a reference per segment and take the
    /// value of the last one.
    fn infer_path(&mut self, node: Node, depth: usize) -> Inferred {
        let Some(segments) = name_path(node) else {
            for child in node.named_children(&mut node.walk()) {
                self.infer_expr(child, depth + 1);
            }
            return Inferred::default();
        };

        let links = self.walk_path(&segments);
        for (i, link) in links.iter().enumerate() {
            self.record(&segments, i, link.clone());
        }

        match links.last().cloned().flatten() {
            Some(link) => Inferred {
                ty: Home::local(&self.table).follow(&link).value_type(),
                alias: Some(link),
            },
            None => Inferred::default(),
        }
    }

    /// Keyed entries become members; positional and computed entries are
    /// only scanned for references.
    pub(super) fn infer_table(&mut self, node: Node, depth: usize) -> Inferred {
        let mut table = TableType::new();

        for field in node.named_children(&mut node.walk()) {
            if field.kind() != "field" {
                continue;
            }
            let computed = field.child(0).is_some_and(|first| first.kind() == "[");
            let name = field.child_by_field_name("name");
            let value = field.child_by_field_name("value");

            match (name, value) {
                (Some(name), Some(value)) if !computed && name.kind() == "identifier" => {
                    let value = self.infer_expr(value, depth + 1);
                    let kind = kind_for(&value.ty, SymbolKind::Field);
                    let mut symbol = self.new_symbol(&name, kind, &field, value, false);
                    symbol.doc_comment = extract_doc_comment(&field, self.code);
                    let member_name = symbol.name.clone();
                    let id = self.table.add_member(symbol);
                    self.adopt_members(id);
                    table.members.insert(member_name, id);
                }
                (name, value) => {
                    if let Some(key) = name.filter(|_| computed) {
                        self.infer_expr(key, depth + 1);
                    }
                    if let Some(value) = value {
                        self.infer_expr(value, depth + 1);
                    }
                }
            }
        }

        Inferred::of(Type::Table(table))
    }

    fn infer_function(&mut self, node: Node, depth: usize) -> Inferred {
        let Some(parameters) = node.child_by_field_name("parameters") else {
            return Inferred::default();
        };
        let params = self.parameter_names(parameters);
        let body = node.child_by_field_name("body");
        let returns = self.function_body(node, parameters, body, false, None, depth);
        Inferred::of(Type::Function(super::types::FunctionType {
            params,
            returns: Box::new(returns),
            is_method: false,
        }))
    }

    fn infer_call(&mut self, node: Node, depth: usize) -> Inferred {
        let callee = node.child_by_field_name("name");
        let arguments = node.child_by_field_name("arguments");

        if let (Some(callee), Some(arguments)) = (callee, arguments) {
            if callee.kind() == "identifier" {
                match self.text(&callee) {
                    "require" => {
                        if let Some(name) = self.string_argument(arguments) {
                            return self.require(name);
                        }
                    }
                    "setmetatable" => return self.infer_setmetatable(arguments, depth),
                    _ => {}
                }
            }
        }

        let callee = callee
            .map(|callee| self.infer_expr(callee, depth + 1))
            .unwrap_or_default();
        if let Some(arguments) = arguments {
            self.infer_arguments(arguments, depth);
        }

        match callee.ty {
            Type::Function(function) => Inferred::of(*function.returns),
            _ => Inferred::default(),
        }
    }

    fn infer_arguments(&mut self, arguments: Node, depth: usize) -> Vec<Inferred> {
        arguments
            .named_children(&mut arguments.walk())
            .filter(|child| child.kind() != "comment")
            .collect::<Vec<_>>()
            .into_iter()
            .map(|child| self.infer_expr(child, depth + 1))
            .collect()
    }

    /// Literal module name of `require("x")` / `require "x"`.
    fn string_argument(&self, arguments: Node) -> Option<&'a str> {
        let mut args = arguments
            .named_children(&mut arguments.walk())
            .filter(|child| child.kind() != "comment")
            .collect::<Vec<_>>()
            .into_iter();
        let first = args.next()?;
        if first.kind() != "string" || args.next().is_some() {
            return None;
        }
        let content = first
            .named_children(&mut first.walk())
            .find(|child| child.kind() == "string_content")?;
        let name = self.text(&content);
        (!name.is_empty()).then_some(name)
    }

    /// `require` resolves through the loader; anything it cannot produce, or
    /// a module that does not export a table, is Unknown.
    fn require(&mut self, name: &str) -> Inferred {
        let Some(index) = self.loader.load(name) else {
            tracing::debug!("[infer] require('{name}') unresolved in {}", self.document);
            return Inferred::default();
        };
        if !index.exports_table() {
            tracing::debug!("[infer] require('{name}') does not export a table");
            return Inferred::default();
        }
        Inferred::of(Type::Module(ModuleType {
            name: name.to_string(),
            origin: IndexRef::new(index),
        }))
    }

    /// `setmetatable(t, mt)` returns `t` with a prototype attached. A named
    /// `t` is extended in place so later lookups through it see the base.
    fn infer_setmetatable(&mut self, arguments: Node, depth: usize) -> Inferred {
        let args: Vec<Node> = arguments
            .named_children(&mut arguments.walk())
            .filter(|child| child.kind() != "comment")
            .collect();
        let Some(target) = args.first() else {
            return Inferred::default();
        };
        let target = self.infer_expr(*target, depth + 1);
        let prototype = args
            .get(1)
            .and_then(|metatable| self.metatable_prototype(*metatable, depth));
        for extra in args.iter().skip(2) {
            self.infer_expr(*extra, depth + 1);
        }

        let Some(prototype) = prototype else {
            return target;
        };

        if let Some(link) = target.alias.clone() {
            if self.set_prototype(&link, prototype.clone()) {
                let ty = Home::local(&self.table).follow(&link).value_type();
                return Inferred {
                    ty,
                    alias: Some(link),
                };
            }
        }

        match target.ty {
            Type::Table(mut table) if !table.is_foreign() => {
                table.prototype = Some(prototype);
                Inferred::of(Type::Table(table))
            }
            Type::Unknown | Type::Nil => Inferred::of(Type::Table(TableType {
                prototype: Some(prototype),
                ..TableType::new()
            })),
            other => Inferred::of(other),
        }
    }

    /// `{ __index = base }` links straight to its `__index` entry; any other
    /// named metatable is searched through its own `__index` at lookup time.
    fn metatable_prototype(&mut self, metatable: Node, depth: usize) -> Option<Prototype> {
        if metatable.kind() == "table_constructor" {
            let literal = self.infer_table(metatable, depth + 1);
            return match literal.ty {
                Type::Table(table) => table
                    .members
                    .get("__index")
                    .map(|id| Prototype::Index(SymbolLink::local(*id))),
                _ => None,
            };
        }
        let value = self.infer_expr(metatable, depth + 1);
        value.alias.map(Prototype::Metatable)
    }

    fn set_prototype(&mut self, link: &SymbolLink, prototype: Prototype) -> bool {
        let target = Home::local(&self.table).follow(link).resolve_alias();
        if !target.is_local() {
            return false;
        }
        let symbol = self.table.symbol_mut(target.id);
        if matches!(symbol.ty, Type::Unknown | Type::Nil) {
            symbol.ty = Type::Table(TableType::new());
        }
        match &mut symbol.ty {
            Type::Table(table) if !table.is_foreign() => {
                table.prototype = Some(prototype);
                true
            }
            _ => false,
        }
    }

    fn infer_binary(&mut self, node: Node, depth: usize) -> Inferred {
        let left = node
            .child_by_field_name("left")
            .map(|left| self.infer_expr(left, depth + 1))
            .unwrap_or_default();
        let right = node
            .child_by_field_name("right")
            .map(|right| self.infer_expr(right, depth + 1))
            .unwrap_or_default();

        match operator(&node) {
            Some("..") => Inferred::of(Type::String),
            Some("==" | "~=" | "<" | ">" | "<=" | ">=") => Inferred::of(Type::Boolean),
            Some("+" | "-" | "*" | "/" | "//" | "%" | "^" | "&" | "|" | "~" | "<<" | ">>") => {
                Inferred::of(Type::Number)
            }
            // `x or default`
            Some("or") if matches!(left.ty, Type::Unknown | Type::Nil) => right,
            Some("or") => left,
            Some("and") => right,
            _ => Inferred::default(),
        }
    }
}

/// The anonymous operator token of a binary or unary expression.
fn operator(node: &Node) -> Option<&'static str> {
    node.children(&mut node.walk())
        .find(|child| !child.is_named())
        .map(|child| child.kind())
}
