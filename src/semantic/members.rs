//! Member lookup across table and module types.
//!
//! A [`Located`] symbol pairs a symbol id with the arena it belongs to, so
//! lookups can hop into other documents through `Module` types and foreign
//! tables without copying anything.

use std::sync::Arc;

use super::index::DocumentIndex;
use super::scope::SymbolTable;
use super::symbol::Symbol;
use super::types::{IndexRef, Prototype, SymbolLink, TableType, Type};
use crate::types::SymbolId;

/// Longest alias chain followed before giving up.
const MAX_ALIAS_HOPS: usize = 16;
/// Deepest prototype chain searched by extended lookup.
const MAX_PROTOTYPE_DEPTH: usize = 32;

/// The arena a symbol id is interpreted in.
#[derive(Clone, Copy)]
pub struct Home<'a> {
    pub table: &'a SymbolTable,
    /// `None` for the document being queried or built.
    pub origin: Option<&'a IndexRef>,
}

impl<'a> Home<'a> {
    pub fn local(table: &'a SymbolTable) -> Self {
        Self {
            table,
            origin: None,
        }
    }

    pub fn foreign(origin: &'a IndexRef) -> Self {
        Self {
            table: &origin.index().table,
            origin: Some(origin),
        }
    }

    pub fn locate(self, id: SymbolId) -> Located<'a> {
        Located { home: self, id }
    }

    /// Resolve a link stored in this arena.
    pub fn follow(self, link: &'a SymbolLink) -> Located<'a> {
        match &link.origin {
            Some(origin) => Home::foreign(origin).locate(link.id),
            None => self.locate(link.id),
        }
    }

    /// Arena the members of `table` live in.
    fn for_table(self, table: &'a TableType) -> Home<'a> {
        match &table.origin {
            Some(origin) => Home::foreign(origin),
            None => self,
        }
    }

    fn key(&self) -> usize {
        self.table as *const SymbolTable as usize
    }
}

/// A symbol together with the arena it lives in.
#[derive(Clone, Copy)]
pub struct Located<'a> {
    pub home: Home<'a>,
    pub id: SymbolId,
}

impl<'a> Located<'a> {
    pub fn symbol(&self) -> &'a Symbol {
        self.home.table.symbol(self.id)
    }

    pub fn is_local(&self) -> bool {
        self.home.origin.is_none()
    }

    /// Follow alias links to the symbol that actually holds the value.
    pub fn resolve_alias(self) -> Located<'a> {
        let mut current = self;
        for _ in 0..MAX_ALIAS_HOPS {
            match &current.symbol().alias {
                Some(link) => current = current.home.follow(link),
                None => return current,
            }
        }
        current
    }

    /// Owned link to this symbol, relative to the document being queried.
    pub fn to_link(&self) -> SymbolLink {
        SymbolLink {
            origin: self.home.origin.cloned(),
            id: self.id,
        }
    }

    /// Index this symbol belongs to, given the index being queried.
    pub fn index(&self, queried: &Arc<DocumentIndex>) -> Arc<DocumentIndex> {
        match self.home.origin {
            Some(origin) => origin.arc().clone(),
            None => queried.clone(),
        }
    }

    /// The value type behind this symbol, safe to store in the queried
    /// document.
    pub fn value_type(self) -> Type {
        let target = self.resolve_alias();
        let ty = &target.symbol().ty;
        match target.home.origin {
            Some(origin) => ty.rebased(origin),
            None => ty.clone(),
        }
    }

    /// The container type after alias following, with its arena.
    pub fn container(self) -> (Home<'a>, &'a Type) {
        let target = self.resolve_alias();
        (target.home, &target.symbol().ty)
    }

    pub fn own_member(self, name: &str) -> Option<Located<'a>> {
        let (home, ty) = self.container();
        own_member(home, ty, name)
    }

    pub fn extended_member(self, name: &str) -> Option<Located<'a>> {
        let (home, ty) = self.container();
        extended_member(home, ty, name)
    }

    pub fn members(self, extended: bool) -> Vec<(&'a str, Located<'a>)> {
        let (home, ty) = self.container();
        members(home, ty, extended)
    }
}

/// Exact member of a table or module, no inheritance.
pub fn own_member<'a>(home: Home<'a>, ty: &'a Type, name: &str) -> Option<Located<'a>> {
    match ty {
        Type::Table(table) => table
            .members
            .get(name)
            .map(|id| home.for_table(table).locate(*id)),
        Type::Module(module) => {
            let (table, origin) = module.exports()?;
            let home = Home::foreign(origin).for_table(table);
            table.members.get(name).map(|id| home.locate(*id))
        }
        _ => None,
    }
}

/// Member lookup that continues through prototype links.
pub fn extended_member<'a>(home: Home<'a>, ty: &'a Type, name: &str) -> Option<Located<'a>> {
    let mut visited = Vec::new();
    extended_member_inner(home, ty, name, &mut visited, 0)
}

fn extended_member_inner<'a>(
    home: Home<'a>,
    ty: &'a Type,
    name: &str,
    visited: &mut Vec<(usize, SymbolId)>,
    depth: usize,
) -> Option<Located<'a>> {
    if depth > MAX_PROTOTYPE_DEPTH {
        return None;
    }
    if let Some(found) = own_member(home, ty, name) {
        return Some(found);
    }

    let (table_home, table) = match ty {
        Type::Table(table) => (home.for_table(table), table),
        Type::Module(module) => {
            let (table, origin) = module.exports()?;
            (Home::foreign(origin).for_table(table), table)
        }
        _ => return None,
    };

    let base = match table.prototype.as_ref()? {
        Prototype::Index(link) => table_home.follow(link).resolve_alias(),
        Prototype::Metatable(link) => {
            // `Class.__index = Class` makes the metatable its own base, so
            // only the base is tracked for cycles
            let metatable = table_home.follow(link).resolve_alias();
            let (mt_home, mt_ty) = metatable.container();
            extended_member_inner(mt_home, mt_ty, "__index", visited, depth + 1)?.resolve_alias()
        }
    };

    if !enter(visited, base) {
        return None;
    }
    let (base_home, base_ty) = base.container();
    extended_member_inner(base_home, base_ty, name, visited, depth + 1)
}

/// Record a visit, false if the symbol was already on the chain.
fn enter(visited: &mut Vec<(usize, SymbolId)>, located: Located<'_>) -> bool {
    let key = (located.home.key(), located.id);
    if visited.contains(&key) {
        return false;
    }
    visited.push(key);
    true
}

/// Named members, own members first, inherited ones after (shadowed names
/// are listed once).
pub fn members<'a>(home: Home<'a>, ty: &'a Type, extended: bool) -> Vec<(&'a str, Located<'a>)> {
    let mut out: Vec<(&'a str, Located<'a>)> = Vec::new();
    let mut visited = Vec::new();
    collect_members(home, ty, extended, &mut out, &mut visited, 0);
    out
}

fn collect_members<'a>(
    home: Home<'a>,
    ty: &'a Type,
    extended: bool,
    out: &mut Vec<(&'a str, Located<'a>)>,
    visited: &mut Vec<(usize, SymbolId)>,
    depth: usize,
) {
    if depth > MAX_PROTOTYPE_DEPTH {
        return;
    }
    let (table_home, table) = match ty {
        Type::Table(table) => (home.for_table(table), table),
        Type::Module(module) => match module.exports() {
            Some((table, origin)) => (Home::foreign(origin).for_table(table), table),
            None => return,
        },
        _ => return,
    };

    for (name, id) in &table.members {
        if !out.iter().any(|(seen, _)| *seen == name.as_str()) {
            out.push((name.as_str(), table_home.locate(*id)));
        }
    }

    if !extended {
        return;
    }
    let base = match &table.prototype {
        Some(Prototype::Index(link)) => table_home.follow(link).resolve_alias(),
        Some(Prototype::Metatable(link)) => {
            let metatable = table_home.follow(link).resolve_alias();
            let (mt_home, mt_ty) = metatable.container();
            match extended_member(mt_home, mt_ty, "__index") {
                Some(index) => index.resolve_alias(),
                None => return,
            }
        }
        None => return,
    };
    if !enter(visited, base) {
        return;
    }
    let (base_home, base_ty) = base.container();
    collect_members(base_home, base_ty, extended, out, visited, depth + 1);
}
