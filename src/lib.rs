pub mod checker;
pub mod config;
pub mod indexing;
pub mod logging;
pub mod parsing;
pub mod providers;
pub mod semantic;
pub mod session;
pub mod types;
pub mod watcher;

pub use types::*;
pub use checker::{CheckError, Checker};
pub use config::{ConfigError, Settings};
pub use indexing::{CommitOutcome, DocumentManager, IndexError, ModuleIndex};
pub use parsing::{LuaVersion, ParserOptions};
pub use semantic::{DefinitionResolver, DocumentIndex, Resolution, SymbolHandle, Type};
pub use session::{DiagnosticSink, Session};
