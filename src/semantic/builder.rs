//! Scope Builder
//!
//! Walks a parsed chunk once, in source order, creating scopes and symbols
//! and recording references as it goes. Expressions are typed on the fly by
//! the inference half of the builder (see `infer.rs`), so a name used in an
//! initializer is resolved before the name being declared is bound.

use std::sync::Arc;
use tree_sitter::Node;

use super::index::DocumentIndex;
use super::members::{Home, Located};
use super::resolver::split_path;
use super::scope::{ScopeKind, SymbolTable};
use super::symbol::{Reference, Symbol};
use super::types::{SymbolLink, TableType, Type};
use super::ModuleLoader;
use crate::parsing::{
    LuaParser, ParserOptions, check_recursion_depth, extract_doc_comment, range_from_node,
};
use crate::types::{
    Diagnostic, DocumentId, LineIndex, Range, Revision, ScopeId, Severity, Span, SymbolId,
    SymbolKind,
};

/// Value of an expression as seen by the builder.
#[derive(Debug, Clone, Default)]
pub(super) struct Inferred {
    pub ty: Type,
    /// The symbol the expression names, for plain names and dotted paths.
    pub alias: Option<SymbolLink>,
}

impl Inferred {
    pub fn of(ty: Type) -> Self {
        Self { ty, alias: None }
    }
}

/// Parse `text` and build its index.
///
/// Never fails: a malformed document yields an index holding only the root
/// scope plus the syntax diagnostics.
pub fn build_index(
    document: DocumentId,
    revision: Revision,
    text: Arc<str>,
    options: &ParserOptions,
    loader: &mut dyn ModuleLoader,
) -> DocumentIndex {
    let mut parser = match LuaParser::new(options) {
        Ok(parser) => parser,
        Err(e) => {
            tracing::error!("[builder] {e}");
            let diagnostic =
                Diagnostic::new(Range::default(), Severity::Error, "luasense", e.to_string());
            return DocumentIndex::empty(document, revision, text, vec![diagnostic]);
        }
    };

    let output = parser.parse(&text);
    let Some(tree) = output.tree else {
        tracing::debug!(
            "[builder] {document} {revision} malformed ({} errors)",
            output.diagnostics.len()
        );
        return DocumentIndex::empty(document, revision, text, output.diagnostics);
    };

    let built = ScopeBuilder::new(&text, document.clone(), options, loader).build(tree.root_node());
    tracing::debug!(
        "[builder] {document} {revision}: {} symbols, {} scopes, {} references",
        built.table.symbols().len(),
        built.table.scopes().len(),
        built.references.len()
    );

    DocumentIndex {
        document,
        revision,
        lines: LineIndex::new(&text),
        text,
        table: built.table,
        references: built.references,
        exports: built.exports,
        diagnostics: output.diagnostics,
        malformed: false,
    }
}

pub(super) struct Built {
    pub table: SymbolTable,
    pub references: Vec<Reference>,
    pub exports: Type,
}

pub(super) struct ScopeBuilder<'a> {
    pub(super) code: &'a str,
    pub(super) document: DocumentId,
    pub(super) options: &'a ParserOptions,
    pub(super) loader: &'a mut dyn ModuleLoader,
    pub(super) table: SymbolTable,
    pub(super) references: Vec<Reference>,
    pub(super) scope: ScopeId,
    /// One frame per enclosing function; frame 0 is the chunk.
    pub(super) returns: Vec<Option<Inferred>>,
}

impl<'a> ScopeBuilder<'a> {
    pub(super) fn new(
        code: &'a str,
        document: DocumentId,
        options: &'a ParserOptions,
        loader: &'a mut dyn ModuleLoader,
    ) -> Self {
        Self {
            code,
            document,
            options,
            loader,
            table: SymbolTable::new(code.len()),
            references: Vec::new(),
            scope: ScopeId::ROOT,
            returns: vec![None],
        }
    }

    pub(super) fn build(mut self, root: Node) -> Built {
        self.visit_block(root, 0);
        self.resolve_pending();

        let exports = match self.returns.first().cloned().flatten() {
            Some(Inferred {
                alias: Some(link), ..
            }) => Home::local(&self.table).follow(&link).value_type(),
            Some(inferred) => inferred.ty,
            None => Type::Unknown,
        };

        Built {
            table: self.table,
            references: self.references,
            exports,
        }
    }

    pub(super) fn text(&self, node: &Node) -> &'a str {
        &self.code[node.byte_range()]
    }

    pub(super) fn enter_scope(&mut self, kind: ScopeKind, span: Span) -> ScopeId {
        let id = self.table.add_scope(self.scope, kind, span);
        std::mem::replace(&mut self.scope, id)
    }

    pub(super) fn exit_scope(&mut self, saved: ScopeId) {
        self.scope = saved;
    }

    pub(super) fn visit_block(&mut self, node: Node, depth: usize) {
        if !check_recursion_depth(depth, node) {
            return;
        }
        for child in node.children(&mut node.walk()) {
            if child.is_named() {
                self.visit_statement(child, depth + 1);
            }
        }
    }

    fn visit_scoped_block(&mut self, kind: ScopeKind, span: Span, body: Option<Node>, depth: usize) {
        let Some(body) = body else {
            return;
        };
        let saved = self.enter_scope(kind, span);
        self.visit_block(body, depth + 1);
        self.exit_scope(saved);
    }

    fn visit_statement(&mut self, node: Node, depth: usize) {
        if !check_recursion_depth(depth, node) {
            return;
        }

        match node.kind() {
            "variable_declaration" => self.local_declaration(node, depth),
            "assignment_statement" => self.assignment(node, depth),
            "function_declaration" => self.function_declaration(node, depth),
            "do_statement" => {
                let body = node.child_by_field_name("body");
                self.visit_scoped_block(ScopeKind::Block, node_span(&node), body, depth);
            }
            "while_statement" => {
                if let Some(condition) = node.child_by_field_name("condition") {
                    self.infer_expr(condition, depth + 1);
                }
                let body = node.child_by_field_name("body");
                let span = body.map(|b| node_span(&b)).unwrap_or_default();
                self.visit_scoped_block(ScopeKind::Loop, span, body, depth);
            }
            "repeat_statement" => {
                // the `until` condition sees the body's locals
                let saved = self.enter_scope(ScopeKind::Loop, node_span(&node));
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit_block(body, depth + 1);
                }
                if let Some(condition) = node.child_by_field_name("condition") {
                    self.infer_expr(condition, depth + 1);
                }
                self.exit_scope(saved);
            }
            "if_statement" => self.if_statement(node, depth),
            "for_statement" => self.for_statement(node, depth),
            "return_statement" => self.return_statement(node, depth),
            "function_call" => {
                self.infer_expr(node, depth + 1);
            }
            "comment" | "goto_statement" | "label_statement" | "break_statement"
            | "empty_statement" | "hash_bang_line" => {}
            "block" => self.visit_block(node, depth + 1),
            _ => {
                for child in node.children(&mut node.walk()) {
                    if child.is_named() {
                        self.infer_expr(child, depth + 1);
                    }
                }
            }
        }
    }

    fn local_declaration(&mut self, node: Node, depth: usize) {
        let doc = extract_doc_comment(&node, self.code);
        let mut names = None;
        let mut values = Vec::new();

        for child in node.children(&mut node.walk()) {
            match child.kind() {
                "variable_list" => names = Some(child),
                "assignment_statement" => {
                    for part in child.children(&mut child.walk()) {
                        match part.kind() {
                            "variable_list" => names = Some(part),
                            "expression_list" => values = self.infer_list(part, depth),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        let Some(names) = names else {
            return;
        };
        let names: Vec<Node> = names
            .children(&mut names.walk())
            .filter(|n| n.kind() == "identifier")
            .collect();

        for (i, name) in names.into_iter().enumerate() {
            let value = values.get(i).cloned().unwrap_or_default();
            let kind = kind_for(&value.ty, SymbolKind::Variable);
            let mut symbol = self.new_symbol(&name, kind, &node, value, true);
            symbol.doc_comment = doc.clone();
            let id = self.table.declare(symbol);
            self.adopt_members(id);
        }
    }

    fn assignment(&mut self, node: Node, depth: usize) {
        let doc = extract_doc_comment(&node, self.code);
        let mut targets = Vec::new();
        let mut values = Vec::new();

        for child in node.children(&mut node.walk()) {
            match child.kind() {
                "variable_list" => {
                    targets = child
                        .children(&mut child.walk())
                        .filter(|n| n.is_named() && n.kind() != "comment")
                        .collect()
                }
                "expression_list" => values = self.infer_list(child, depth),
                _ => {}
            }
        }

        for (i, target) in targets.into_iter().enumerate() {
            let value = values.get(i).cloned().unwrap_or_default();
            self.assign_target(target, value, &node, doc.clone(), depth);
        }
    }

    fn assign_target(
        &mut self,
        target: Node,
        value: Inferred,
        statement: &Node,
        doc: Option<String>,
        depth: usize,
    ) {
        match target.kind() {
            "identifier" => {
                let name = self.text(&target);
                match self.table.lookup(self.scope, name, target.start_byte()) {
                    Some(id) => {
                        self.record(&[target], 0, Some(SymbolLink::local(id)));
                        self.refine(id, value);
                    }
                    None if self.scope == ScopeId::ROOT || self.options.allow_defined => {
                        let kind = kind_for(&value.ty, SymbolKind::Variable);
                        let mut symbol = self.new_symbol(&target, kind, statement, value, false);
                        symbol.doc_comment = doc;
                        let id = self.table.declare(symbol);
                        self.adopt_members(id);
                    }
                    None => self.record(&[target], 0, None),
                }
            }
            "dot_index_expression" => match name_path(target) {
                Some(segments) => {
                    let kind = kind_for(&value.ty, SymbolKind::Field);
                    self.define_member(&segments, kind, statement, value, doc);
                }
                None => {
                    if let Some(table) = target.child_by_field_name("table") {
                        self.infer_expr(table, depth + 1);
                    }
                }
            },
            _ => {
                self.infer_expr(target, depth + 1);
            }
        }
    }

    /// Handle `a.b.c = v` / `function a.b.c()`: record the prefix, then add
    /// `c` to the table reached by `a.b` unless it already exists there.
    /// Returns the member symbol when it lives in this document.
    fn define_member(
        &mut self,
        segments: &[Node],
        kind: SymbolKind,
        statement: &Node,
        value: Inferred,
        doc: Option<String>,
    ) -> (Option<SymbolId>, Option<SymbolLink>) {
        let links = self.walk_path(segments);
        let last = segments.len() - 1;
        for (i, link) in links.iter().enumerate().take(last) {
            self.record(segments, i, link.clone());
        }
        let container = if last > 0 { links[last - 1].clone() } else { None };

        if let Some(existing) = links[last].clone() {
            self.record(segments, last, Some(existing.clone()));
            if existing.is_local() {
                self.refine(existing.id, value);
                return (Some(existing.id), container);
            }
            return (None, container);
        }

        let Some(container_link) = container.clone() else {
            self.record(segments, last, None);
            return (None, None);
        };
        let mut symbol = self.new_symbol(&segments[last], kind, statement, value, false);
        symbol.doc_comment = doc;
        match self.insert_member(&container_link, symbol) {
            Some(id) => {
                self.adopt_members(id);
                (Some(id), container)
            }
            None => {
                self.record(segments, last, None);
                (None, container)
            }
        }
    }

    fn function_declaration(&mut self, node: Node, depth: usize) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let Some(parameters) = node.child_by_field_name("parameters") else {
            return;
        };
        let body = node.child_by_field_name("body");
        let is_local = node
            .children(&mut node.walk())
            .any(|child| child.kind() == "local");
        let is_method = name.kind() == "method_index_expression";
        let doc = extract_doc_comment(&node, self.code);
        let params = self.parameter_names(parameters);
        let value = Inferred::of(Type::function(params, is_method));

        let (symbol, container) = match name.kind() {
            "identifier" if is_local => {
                let mut symbol = self.new_symbol(&name, SymbolKind::Function, &node, value, true);
                symbol.doc_comment = doc;
                (Some(self.table.declare(symbol)), None)
            }
            "identifier" => {
                let text = self.text(&name);
                match self.table.lookup(self.scope, text, name.start_byte()) {
                    Some(id) => {
                        self.record(&[name], 0, Some(SymbolLink::local(id)));
                        self.table.symbol_mut(id).ty = value.ty;
                        (Some(id), None)
                    }
                    None => {
                        let mut symbol =
                            self.new_symbol(&name, SymbolKind::Function, &node, value, false);
                        symbol.doc_comment = doc;
                        (Some(self.table.declare(symbol)), None)
                    }
                }
            }
            _ => match name_path(name) {
                Some(segments) => {
                    let kind = if is_method {
                        SymbolKind::Method
                    } else {
                        SymbolKind::Function
                    };
                    self.define_member(&segments, kind, &node, value, doc)
                }
                None => (None, None),
            },
        };

        let returns = self.function_body(node, parameters, body, is_method, container, depth);
        if let Some(id) = symbol {
            if let Type::Function(function) = &mut self.table.symbol_mut(id).ty {
                function.returns = Box::new(returns);
            }
        }
    }

    pub(super) fn parameter_names(&self, parameters: Node) -> Vec<String> {
        parameters
            .children(&mut parameters.walk())
            .filter_map(|child| match child.kind() {
                "identifier" => Some(self.text(&child).to_string()),
                "vararg_expression" => Some("...".to_string()),
                _ => None,
            })
            .collect()
    }

    /// Bind parameters in a fresh function scope, walk the body, and return
    /// the inferred return type.
    pub(super) fn function_body(
        &mut self,
        node: Node,
        parameters: Node,
        body: Option<Node>,
        is_method: bool,
        container: Option<SymbolLink>,
        depth: usize,
    ) -> Type {
        let span = Span::new(parameters.start_byte(), node.end_byte());
        let saved = self.enter_scope(ScopeKind::Function, span);

        if is_method {
            let ty = container
                .as_ref()
                .map(|link| Home::local(&self.table).follow(link).value_type())
                .unwrap_or_default();
            let at = parameters.start_byte();
            let symbol = Symbol {
                id: self.table.next_symbol_id(),
                name: "self".to_string(),
                kind: SymbolKind::Parameter,
                document: self.document.clone(),
                range: range_from_node(&parameters),
                span: Span::new(at, at),
                full_range: range_from_node(&parameters),
                scope: self.scope,
                container: None,
                is_local: true,
                ty,
                alias: container,
                doc_comment: None,
            };
            self.table.declare(symbol);
        }

        for child in parameters.children(&mut parameters.walk()) {
            if child.kind() == "identifier" {
                let symbol = self.new_symbol(
                    &child,
                    SymbolKind::Parameter,
                    &parameters,
                    Inferred::default(),
                    true,
                );
                self.table.declare(symbol);
            }
        }

        self.returns.push(None);
        if let Some(body) = body {
            self.visit_block(body, depth + 1);
        }
        let returns = self.returns.pop().flatten().map(|r| r.ty).unwrap_or_default();
        self.exit_scope(saved);
        returns
    }

    fn if_statement(&mut self, node: Node, depth: usize) {
        if let Some(condition) = node.child_by_field_name("condition") {
            self.infer_expr(condition, depth + 1);
        }
        let consequence = node.child_by_field_name("consequence");
        let span = consequence.map(|b| node_span(&b)).unwrap_or_default();
        self.visit_scoped_block(ScopeKind::Block, span, consequence, depth);

        for child in node.children(&mut node.walk()) {
            match child.kind() {
                "elseif_statement" => {
                    if let Some(condition) = child.child_by_field_name("condition") {
                        self.infer_expr(condition, depth + 1);
                    }
                    let body = child.child_by_field_name("consequence");
                    let span = body.map(|b| node_span(&b)).unwrap_or_default();
                    self.visit_scoped_block(ScopeKind::Block, span, body, depth);
                }
                "else_statement" => {
                    let body = child.child_by_field_name("body");
                    let span = body.map(|b| node_span(&b)).unwrap_or_default();
                    self.visit_scoped_block(ScopeKind::Block, span, body, depth);
                }
                _ => {}
            }
        }
    }

    fn for_statement(&mut self, node: Node, depth: usize) {
        let mut variables: Vec<(Node, Type)> = Vec::new();

        if let Some(clause) = node.child_by_field_name("clause") {
            match clause.kind() {
                "for_numeric_clause" => {
                    for field in ["start", "end", "step"] {
                        if let Some(expr) = clause.child_by_field_name(field) {
                            self.infer_expr(expr, depth + 1);
                        }
                    }
                    if let Some(name) = clause.child_by_field_name("name") {
                        variables.push((name, Type::Number));
                    }
                }
                "for_generic_clause" => {
                    for child in clause.children(&mut clause.walk()) {
                        match child.kind() {
                            "expression_list" => {
                                self.infer_list(child, depth);
                            }
                            "variable_list" => variables.extend(
                                child
                                    .children(&mut child.walk())
                                    .filter(|n| n.kind() == "identifier")
                                    .map(|n| (n, Type::Unknown)),
                            ),
                            _ => {}
                        }
                    }
                }
                _ => {}
            }
        }

        let saved = self.enter_scope(ScopeKind::Loop, node_span(&node));
        for (name, ty) in variables {
            let symbol = self.new_symbol(&name, SymbolKind::Variable, &node, Inferred::of(ty), true);
            self.table.declare(symbol);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_block(body, depth + 1);
        }
        self.exit_scope(saved);
    }

    fn return_statement(&mut self, node: Node, depth: usize) {
        let values = node
            .children(&mut node.walk())
            .find(|child| child.kind() == "expression_list")
            .map(|list| self.infer_list(list, depth))
            .unwrap_or_default();

        let Some(first) = values.into_iter().next() else {
            return;
        };
        if let Some(frame) = self.returns.last_mut() {
            let settled = frame.as_ref().is_some_and(|r| !r.ty.is_unknown());
            if !settled {
                *frame = Some(first);
            }
        }
    }

    pub(super) fn infer_list(&mut self, list: Node, depth: usize) -> Vec<Inferred> {
        list.children(&mut list.walk())
            .filter(|child| child.is_named() && child.kind() != "comment")
            .map(|child| self.infer_expr(child, depth + 1))
            .collect()
    }

    pub(super) fn new_symbol(
        &self,
        name: &Node,
        kind: SymbolKind,
        statement: &Node,
        value: Inferred,
        is_local: bool,
    ) -> Symbol {
        Symbol {
            id: self.table.next_symbol_id(),
            name: self.text(name).to_string(),
            kind,
            document: self.document.clone(),
            range: range_from_node(name),
            span: node_span(name),
            full_range: range_from_node(statement),
            scope: self.scope,
            container: None,
            is_local,
            ty: value.ty,
            alias: value.alias,
            doc_comment: None,
        }
    }

    /// Add `symbol` as a member of the table `container` refers to. Tables
    /// borrowed from other documents are left alone.
    pub(super) fn insert_member(&mut self, container: &SymbolLink, mut symbol: Symbol) -> Option<SymbolId> {
        let target = Home::local(&self.table).follow(container).resolve_alias();
        if !target.is_local() {
            return None;
        }
        let target = target.id;

        let convert = match &self.table.symbol(target).ty {
            Type::Table(table) if table.is_foreign() => return None,
            Type::Table(_) => false,
            Type::Unknown | Type::Nil => true,
            _ => return None,
        };
        if convert {
            self.table.symbol_mut(target).ty = Type::Table(TableType::new());
        }

        let name = symbol.name.clone();
        symbol.container = Some(target);
        let id = self.table.add_member(symbol);
        if let Type::Table(table) = &mut self.table.symbol_mut(target).ty {
            table.members.insert(name, id);
        }
        Some(id)
    }

    /// Give an untyped symbol the type of a later assignment.
    fn refine(&mut self, id: SymbolId, value: Inferred) {
        let symbol = self.table.symbol_mut(id);
        if !symbol.ty.is_unknown() || value.ty.is_unknown() {
            return;
        }
        symbol.kind = kind_for(&value.ty, symbol.kind);
        symbol.ty = value.ty;
        if symbol.alias.is_none() {
            symbol.alias = value.alias;
        }
        self.adopt_members(id);
    }

    /// Point the members of a freshly bound table literal back at their owner.
    pub(super) fn adopt_members(&mut self, owner: SymbolId) {
        let members: Vec<SymbolId> = match &self.table.symbol(owner).ty {
            Type::Table(table) if !table.is_foreign() => table.members.values().copied().collect(),
            _ => return,
        };
        for member in members {
            let symbol = self.table.symbol_mut(member);
            if symbol.container.is_none() {
                symbol.container = Some(owner);
            }
        }
    }

    /// Resolve each segment of a dotted path against the table built so far.
    pub(super) fn walk_path(&self, segments: &[Node]) -> Vec<Option<SymbolLink>> {
        let home = Home::local(&self.table);
        let mut out = Vec::with_capacity(segments.len());
        let mut current: Option<Located> = None;
        for (i, segment) in segments.iter().enumerate() {
            let name = self.text(segment);
            current = if i == 0 {
                self.table
                    .lookup(self.scope, name, segment.start_byte())
                    .map(|id| home.locate(id))
            } else {
                current.and_then(|c| c.extended_member(name))
            };
            out.push(current.map(|c| c.to_link()));
        }
        out
    }

    /// Record a reference for `segments[..=index]`.
    pub(super) fn record(&mut self, segments: &[Node], index: usize, target: Option<SymbolLink>) {
        let first = segments[0];
        let last = segments[index];
        let text: String = self.code[first.start_byte()..last.end_byte()]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        self.references.push(Reference {
            text,
            range: range_from_node(&last),
            span: node_span(&last),
            scope: self.scope,
            anchor: first.start_byte(),
            target,
        });
    }

    /// Second chance for references to globals assigned later in the file.
    fn resolve_pending(&mut self) {
        let home = Home::local(&self.table);
        for reference in self.references.iter_mut().filter(|r| r.target.is_none()) {
            let segments = split_path(&reference.text);
            let Some((root, rest)) = segments.split_first() else {
                continue;
            };
            let mut current = self
                .table
                .lookup(reference.scope, root, reference.anchor)
                .map(|id| home.locate(id));
            for name in rest {
                current = current.and_then(|c| c.extended_member(name));
            }
            reference.target = current.map(|c| c.to_link());
        }
    }
}

pub(super) fn node_span(node: &Node) -> Span {
    Span::new(node.start_byte(), node.end_byte())
}

pub(super) fn kind_for(ty: &Type, default: SymbolKind) -> SymbolKind {
    match ty {
        Type::Function(_) if default != SymbolKind::Method => SymbolKind::Function,
        Type::Module(_) => SymbolKind::Module,
        _ => default,
    }
}

/// Identifier nodes of a plain dotted path (`a`, `a.b`, `a.b:c`), or `None`
/// when the base is not a name.
pub(super) fn name_path(node: Node) -> Option<Vec<Node>> {
    match node.kind() {
        "identifier" => Some(vec![node]),
        "dot_index_expression" => {
            let mut path = name_path(node.child_by_field_name("table")?)?;
            path.push(node.child_by_field_name("field")?);
            Some(path)
        }
        "method_index_expression" => {
            let mut path = name_path(node.child_by_field_name("table")?)?;
            path.push(node.child_by_field_name("method")?);
            Some(path)
        }
        _ => None,
    }
}
