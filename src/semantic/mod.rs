//! Semantic model of a Lua document
//!
//! - `builder` / `infer`: one walk over the syntax tree producing scopes,
//!   symbols, references and types
//! - `scope`: scope arena with position-sensitive lookup
//! - `members`: table/module member lookup, including prototype chains
//! - `resolver`: dotted-path definition resolution

pub mod builder;
mod infer;
pub mod index;
pub mod members;
pub mod resolver;
pub mod scope;
pub mod symbol;
pub mod types;

pub use builder::build_index;
pub use index::{DocumentIndex, SymbolHandle};
pub use members::{Home, Located};
pub use resolver::{DefinitionResolver, Resolution, resolve_in, split_path};
pub use scope::{Scope, ScopeKind, SymbolTable};
pub use symbol::{Reference, Symbol};
pub use types::{FunctionType, IndexRef, ModuleType, Prototype, SymbolLink, TableType, Type};

use std::sync::Arc;

/// Source of other documents' indices for `require`.
pub trait ModuleLoader {
    /// The index of module `name`, or `None` when it cannot be produced
    /// (unknown name, cycle, read failure).
    fn load(&mut self, name: &str) -> Option<Arc<DocumentIndex>>;
}

/// Loader for documents analysed on their own.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoModules;

impl ModuleLoader for NoModules {
    fn load(&mut self, _name: &str) -> Option<Arc<DocumentIndex>> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::ParserOptions;
    use crate::types::{DocumentId, Revision, SymbolKind};
    use std::collections::HashMap;

    fn index(code: &str) -> Arc<DocumentIndex> {
        index_with(code, &ParserOptions::default(), &mut NoModules)
    }

    fn index_with(
        code: &str,
        options: &ParserOptions,
        loader: &mut dyn ModuleLoader,
    ) -> Arc<DocumentIndex> {
        Arc::new(build_index(
            DocumentId::new("test://main.lua"),
            Revision::new(1),
            Arc::from(code),
            options,
            loader,
        ))
    }

    fn offset_of(code: &str, needle: &str, nth: usize) -> usize {
        code.match_indices(needle)
            .nth(nth)
            .map(|(i, _)| i)
            .unwrap_or_else(|| panic!("'{needle}' #{nth} not found"))
    }

    fn resolved_name(index: &Arc<DocumentIndex>, expr: &str, offset: usize) -> Option<String> {
        resolve_in(index, expr, offset)
            .into_first()
            .map(|handle| handle.symbol().name.clone())
    }

    #[test]
    fn test_same_scope_redeclaration() {
        let code = "local x = 1\nprint(x)\nlocal x = 'two'\nprint(x)\n";
        let index = index(code);

        let first = resolve_in(&index, "x", offset_of(code, "print(x)", 0) + 6).into_first().unwrap();
        assert_eq!(first.symbol().ty, Type::Number);
        let second = resolve_in(&index, "x", offset_of(code, "print(x)", 1) + 6).into_first().unwrap();
        assert_eq!(second.symbol().ty, Type::String);
    }

    #[test]
    fn test_block_redeclaration_hides_outer_throughout() {
        let code = "local x = 1\ndo\n  print(x)\n  local x = 'inner'\nend\nprint(x)\n";
        let index = index(code);

        let before = resolve_in(&index, "x", offset_of(code, "print(x)", 0) + 6).into_first().unwrap();
        assert_eq!(before.symbol().range.start.line, 3);
        assert_eq!(before.symbol().ty, Type::String);

        let after_block = resolve_in(&index, "x", offset_of(code, "print(x)", 1) + 6).into_first().unwrap();
        assert_eq!(after_block.symbol().range.start.line, 0);
    }

    #[test]
    fn test_local_reads_outer_in_initializer() {
        let code = "local x = {}\ndo\n  local x = x\nend\n";
        let index = index(code);
        let inner_ref = offset_of(code, "= x", 0) + 2;
        let reference = index.reference_at(inner_ref).unwrap();
        let target = reference.target.clone().unwrap();
        assert_eq!(index.symbol(target.id).range.start.line, 0);
    }

    #[test]
    fn test_local_function_visible_in_body() {
        let code = "local function fact(n)\n  return fact(n - 1)\nend\n";
        let index = index(code);
        let call = offset_of(code, "fact(n - 1)", 0);
        let reference = index.reference_at(call + 1).unwrap();
        assert!(reference.target.is_some());
    }

    #[test]
    fn test_dotted_path_members() {
        let code = "local a = { b = { c = 1 } }\nlocal n = 5\nprint(a.b.c)\n";
        let index = index(code);
        let at = offset_of(code, "print", 0);

        assert_eq!(resolved_name(&index, "a.b.c", at).as_deref(), Some("c"));
        assert!(resolve_in(&index, "n.x", at).is_not_navigable());
        assert_eq!(resolve_in(&index, "a.c.d", at), Resolution::empty());
        assert_eq!(resolve_in(&index, "a.b.c.d", at), Resolution::empty());
        assert_eq!(resolve_in(&index, "missing.x", at), Resolution::empty());
    }

    #[test]
    fn test_intermediate_non_table_is_empty() {
        let code = "local a = { b = 1 }\nreturn a\n";
        let index = index(code);
        let at = code.len();
        assert_eq!(resolve_in(&index, "a.b.c", at), Resolution::empty());
    }

    #[test]
    fn test_method_resolves_through_index_prototype() {
        let code = r#"
local Base = {}
function Base:speak() return "..." end

local Derived = setmetatable({}, { __index = Base })
function Derived:run() end

local d = Derived
d:speak()
"#;
        let index = index(code);
        let at = offset_of(code, "d:speak", 0);
        let found = resolve_in(&index, "Derived:speak", at).into_first().unwrap();
        assert_eq!(found.symbol().kind, SymbolKind::Method);
        assert_eq!(found.symbol().range.start.line, 2);
        assert_eq!(resolved_name(&index, "d.speak", at).as_deref(), Some("speak"));
        // intermediate hops never use the prototype
        assert_eq!(resolve_in(&index, "Derived.speak.x", at), Resolution::empty());
    }

    #[test]
    fn test_class_idiom_instances() {
        let code = r#"
local Animal = {}
Animal.__index = Animal

function Animal.new(name)
  local self = setmetatable({}, Animal)
  self.name = name
  return self
end

function Animal:describe()
  return self.name
end

local cat = Animal.new("cat")
cat:describe()
"#;
        let index = index(code);
        let at = offset_of(code, "cat:describe", 0);
        let found = resolve_in(&index, "cat:describe", at).into_first().unwrap();
        assert_eq!(found.symbol().name, "describe");
        assert_eq!(found.symbol().container.map(|c| index.symbol(c).name.clone()).as_deref(), Some("Animal"));
    }

    #[test]
    fn test_self_inside_method() {
        let code = "local M = {}\nfunction M:a() end\nfunction M:b()\n  self:a()\nend\n";
        let index = index(code);
        let at = offset_of(code, "self:a", 0);
        assert_eq!(resolved_name(&index, "self:a", at).as_deref(), Some("a"));
    }

    #[test]
    fn test_globals_defined_at_top_level_only() {
        let code = "function f()\n  g = 1\nend\nh = 2\n";
        let index = index(code);
        let names: Vec<&str> = index.table.root().symbols.iter().map(|id| index.symbol(*id).name.as_str()).collect();
        assert_eq!(names, vec!["f", "h"]);

        let options = ParserOptions {
            allow_defined: true,
            ..ParserOptions::default()
        };
        let index = index_with(code, &options, &mut NoModules);
        assert!(index.definitions().iter().any(|s| s.name == "g" && !s.is_local));
    }

    #[test]
    fn test_later_global_resolves_reference() {
        let code = "local function run()\n  helper()\nend\nfunction helper() end\n";
        let index = index(code);
        let reference = index.reference_at(offset_of(code, "helper()", 0)).unwrap();
        assert!(reference.target.is_some());
    }

    #[test]
    fn test_function_return_type() {
        let code = "local function make()\n  return { x = 1 }\nend\nlocal t = make()\nprint(t.x)\n";
        let index = index(code);
        let at = offset_of(code, "print", 0);
        assert_eq!(resolved_name(&index, "t.x", at).as_deref(), Some("x"));
    }

    #[test]
    fn test_scopes_of_control_flow() {
        let code = "for i = 1, 3 do\n  local v = i\nend\nprint(i)\n";
        let index = index(code);
        assert!(resolve_in(&index, "i", offset_of(code, "local v", 0)).into_first().is_some());
        assert!(resolve_in(&index, "i", offset_of(code, "print(i)", 0) + 6).into_first().is_none());
    }

    #[test]
    fn test_malformed_document_is_empty() {
        let index = index("local function (");
        assert!(index.malformed);
        assert!(index.definitions().is_empty());
        assert!(!index.diagnostics.is_empty());
    }

    #[test]
    fn test_rebuild_is_deterministic() {
        let code = "local M = {}\nM.x = 1\nfunction M.f(a) return a end\nreturn M\n";
        let first = index(code);
        let second = index(code);
        assert_eq!(*first, *second);
    }

    struct MapLoader(HashMap<String, Arc<DocumentIndex>>);

    impl ModuleLoader for MapLoader {
        fn load(&mut self, name: &str) -> Option<Arc<DocumentIndex>> {
            self.0.get(name).cloned()
        }
    }

    #[test]
    fn test_require_produces_module() {
        let util = Arc::new(build_index(
            DocumentId::new("test://util.lua"),
            Revision::new(1),
            Arc::from("local M = {}\nfunction M.greet() end\nreturn M\n"),
            &ParserOptions::default(),
            &mut NoModules,
        ));
        let mut loader = MapLoader(HashMap::from([("util".to_string(), util)]));

        let code = "local u = require('util')\nlocal missing = require('nope')\nu.greet()\n";
        let index = index_with(code, &ParserOptions::default(), &mut loader);
        let at = offset_of(code, "u.greet", 0);

        let u = resolve_in(&index, "u", at).into_first().unwrap();
        assert!(matches!(u.symbol().ty, Type::Module(_)));
        assert_eq!(u.symbol().kind, SymbolKind::Module);

        let greet = resolve_in(&index, "u.greet", at).into_first().unwrap();
        assert_eq!(greet.document().as_str(), "test://util.lua");

        let missing = resolve_in(&index, "missing", at).into_first().unwrap();
        assert!(missing.symbol().ty.is_unknown());
    }

    #[test]
    fn test_non_table_exports_are_unknown() {
        let value = Arc::new(build_index(
            DocumentId::new("test://value.lua"),
            Revision::new(1),
            Arc::from("return 42\n"),
            &ParserOptions::default(),
            &mut NoModules,
        ));
        let mut loader = MapLoader(HashMap::from([("value".to_string(), value)]));
        let index = index_with("local v = require 'value'\n", &ParserOptions::default(), &mut loader);
        let v = index.definitions().iter().find(|s| s.name == "v").unwrap();
        assert!(v.ty.is_unknown());
    }
}
