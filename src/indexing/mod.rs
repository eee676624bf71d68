//! Indexing: per-document lifecycle and the workspace module map.

pub mod documents;
pub mod loader;
pub mod modules;
pub mod walker;

pub use documents::{CommitOutcome, DocumentManager, PendingBuild};
pub use loader::{MAX_REQUIRE_DEPTH, WorkspaceLoader};
pub use modules::{ModuleEntry, ModuleIndex, module_key};
pub use walker::{FileWalker, is_lua_file};

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Index for '{document}' was superseded by a newer edit")]
    Superseded { document: String },
}
