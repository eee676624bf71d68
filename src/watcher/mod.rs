//! Filesystem change events.
//!
//! Editors report watched-file changes themselves; the CLI `watch` command
//! gets the same [`FileEvent`] values from a native `notify` watcher.

mod error;
mod events;
mod native;

pub use error::WatchError;
pub use events::{FileChangeKind, FileEvent};
pub use native::NativeWatcher;
