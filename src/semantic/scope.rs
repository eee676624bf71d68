//! Scope arena with position-sensitive name lookup.
//!
//! Each scope keeps, per name, the ids of the symbols declared there sorted
//! by position. Looking a name up at an offset takes the last declaration at
//! or before that offset in the innermost scope that has one; inner scopes
//! shadow outer ones regardless of position.

use std::collections::HashMap;

use crate::types::{ScopeId, Span, SymbolId};

use super::symbol::Symbol;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Chunk,
    Function,
    Block,
    Loop,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    pub id: ScopeId,
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    pub span: Span,
    pub children: Vec<ScopeId>,
    /// All symbols declared here, in declaration order.
    pub symbols: Vec<SymbolId>,
    by_name: HashMap<String, Vec<SymbolId>>,
}

impl Scope {
    fn new(id: ScopeId, kind: ScopeKind, parent: Option<ScopeId>, span: Span) -> Self {
        Self {
            id,
            kind,
            parent,
            span,
            children: Vec::new(),
            symbols: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    /// Declarations of `name` in this scope, sorted by position.
    pub fn declarations(&self, name: &str) -> &[SymbolId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Every scope and symbol of one document.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// A table holding only the root scope.
    pub fn new(len: usize) -> Self {
        Self {
            scopes: vec![Scope::new(
                ScopeId::ROOT,
                ScopeKind::Chunk,
                None,
                Span::new(0, len),
            )],
            symbols: Vec::new(),
        }
    }

    pub fn add_scope(&mut self, parent: ScopeId, kind: ScopeKind, span: Span) -> ScopeId {
        let id = ScopeId::new(self.scopes.len() as u32);
        self.scopes.push(Scope::new(id, kind, Some(parent), span));
        self.scopes[parent.index()].children.push(id);
        id
    }

    pub fn next_symbol_id(&self) -> SymbolId {
        SymbolId::new(self.symbols.len() as u32)
    }

    /// Add a symbol to the arena and make it visible by name in its scope.
    pub fn declare(&mut self, symbol: Symbol) -> SymbolId {
        let id = symbol.id;
        let scope = &mut self.scopes[symbol.scope.index()];
        scope.symbols.push(id);
        let start = symbol.span.start;
        let entries = scope.by_name.entry(symbol.name.clone()).or_default();
        let symbols = &self.symbols;
        let at = entries.partition_point(|other| {
            symbols
                .get(other.index())
                .is_some_and(|s| s.span.start <= start)
        });
        entries.insert(at, id);
        self.symbols.push(symbol);
        id
    }

    /// Add a symbol to the arena only. Table members are reached through
    /// their container's type, never by scope lookup.
    pub fn add_member(&mut self, symbol: Symbol) -> SymbolId {
        let id = symbol.id;
        self.symbols.push(symbol);
        id
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.get(id.index())
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.index()]
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.index()]
    }

    pub fn scopes(&self) -> &[Scope] {
        &self.scopes
    }

    pub fn root(&self) -> &Scope {
        &self.scopes[0]
    }

    /// Deepest scope whose span contains `offset`.
    pub fn innermost_scope(&self, offset: usize) -> ScopeId {
        let mut current = ScopeId::ROOT;
        'descend: loop {
            for &child in &self.scopes[current.index()].children {
                if self.scopes[child.index()].span.contains(offset) {
                    current = child;
                    continue 'descend;
                }
            }
            return current;
        }
    }

    /// Scope chain from `scope` up to the root.
    pub fn ancestors(&self, scope: ScopeId) -> impl Iterator<Item = &Scope> + '_ {
        let mut next = Some(scope);
        std::iter::from_fn(move || {
            let scope = self.scopes.get(next?.index())?;
            next = scope.parent;
            Some(scope)
        })
    }

    /// Last declaration of `name` at or before `offset`, searching outwards
    /// from `scope`. A nested scope that declares `name` anywhere hides the
    /// outer ones: before its first declaration that one is returned.
    /// Falls back to a root-scope global declared later in the file, since
    /// globals exist for the whole chunk once assigned.
    pub fn lookup(&self, scope: ScopeId, name: &str, offset: usize) -> Option<SymbolId> {
        for scope in self.ancestors(scope) {
            let declarations = scope.declarations(name);
            let visible = declarations.partition_point(|id| self.symbol(*id).span.start <= offset);
            if visible > 0 {
                return Some(declarations[visible - 1]);
            }
            if scope.parent.is_some() {
                if let Some(first) = declarations.first() {
                    return Some(*first);
                }
            }
        }
        self.root()
            .declarations(name)
            .iter()
            .copied()
            .find(|id| !self.symbol(*id).is_local)
    }

    /// Names visible at `offset` from `scope`, innermost first, each name once.
    pub fn visible(&self, scope: ScopeId, offset: usize) -> Vec<SymbolId> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for scope in self.ancestors(scope) {
            for id in scope.symbols.iter().rev() {
                let symbol = self.symbol(*id);
                let in_reach = symbol.span.start <= offset || !symbol.is_local;
                if in_reach && seen.insert(symbol.name.as_str()) {
                    if let Some(found) = self.lookup(scope.id, &symbol.name, offset) {
                        out.push(found);
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::semantic::types::Type;
    use crate::types::{DocumentId, Range, SymbolKind};

    fn symbol(table: &SymbolTable, name: &str, scope: ScopeId, start: usize, local: bool) -> Symbol {
        Symbol {
            id: table.next_symbol_id(),
            name: name.to_string(),
            kind: SymbolKind::Variable,
            document: DocumentId::new("test://scope"),
            range: Range::default(),
            span: Span::new(start, start + name.len()),
            full_range: Range::default(),
            scope,
            container: None,
            is_local: local,
            ty: Type::Unknown,
            alias: None,
            doc_comment: None,
        }
    }

    #[test]
    fn test_same_scope_shadowing_is_positional() {
        let mut table = SymbolTable::new(100);
        let first = table.declare(symbol(&table, "x", ScopeId::ROOT, 10, true));
        let second = table.declare(symbol(&table, "x", ScopeId::ROOT, 40, true));

        assert_eq!(table.lookup(ScopeId::ROOT, "x", 5), None);
        assert_eq!(table.lookup(ScopeId::ROOT, "x", 10), Some(first));
        assert_eq!(table.lookup(ScopeId::ROOT, "x", 39), Some(first));
        assert_eq!(table.lookup(ScopeId::ROOT, "x", 40), Some(second));
        assert_eq!(table.lookup(ScopeId::ROOT, "x", 99), Some(second));
    }

    #[test]
    fn test_inner_scope_shadows_unconditionally() {
        let mut table = SymbolTable::new(100);
        let inner = table.add_scope(ScopeId::ROOT, ScopeKind::Block, Span::new(20, 60));
        table.declare(symbol(&table, "x", ScopeId::ROOT, 50, true));
        let inner_x = table.declare(symbol(&table, "x", inner, 22, true));

        assert_eq!(table.innermost_scope(55), inner);
        assert_eq!(table.lookup(inner, "x", 55), Some(inner_x));

        // before the inner declaration, still the inner one
        let block = table.add_scope(ScopeId::ROOT, ScopeKind::Block, Span::new(70, 95));
        let outer = table.declare(symbol(&table, "y", ScopeId::ROOT, 2, true));
        let inner_y = table.declare(symbol(&table, "y", block, 85, true));
        assert_eq!(table.lookup(block, "y", 75), Some(inner_y));
        assert_eq!(table.lookup(ScopeId::ROOT, "y", 96), Some(outer));
    }

    #[test]
    fn test_globals_visible_before_declaration() {
        let mut table = SymbolTable::new(100);
        let global = table.declare(symbol(&table, "g", ScopeId::ROOT, 80, false));
        table.declare(symbol(&table, "l", ScopeId::ROOT, 80, true));

        assert_eq!(table.lookup(ScopeId::ROOT, "g", 3), Some(global));
        assert_eq!(table.lookup(ScopeId::ROOT, "l", 3), None);
    }

    #[test]
    fn test_visible_names_innermost_first() {
        let mut table = SymbolTable::new(100);
        let block = table.add_scope(ScopeId::ROOT, ScopeKind::Block, Span::new(30, 90));
        table.declare(symbol(&table, "a", ScopeId::ROOT, 0, true));
        table.declare(symbol(&table, "b", ScopeId::ROOT, 10, true));
        let inner_a = table.declare(symbol(&table, "a", block, 35, true));

        let visible = table.visible(block, 50);
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0], inner_a);
    }
}
