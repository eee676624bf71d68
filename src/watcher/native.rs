//! `notify`-backed watcher producing [`FileEvent`]s.

use std::path::PathBuf;

use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::error::WatchError;
use super::events::FileEvent;
use crate::indexing::is_lua_file;

pub struct NativeWatcher {
    event_rx: mpsc::Receiver<notify::Result<Event>>,
    _watcher: notify::RecommendedWatcher,
}

impl NativeWatcher {
    /// Watch every root recursively. Roots that cannot be watched are
    /// skipped with a warning; failing to watch all of them is an error.
    pub fn new(roots: &[PathBuf]) -> Result<Self, WatchError> {
        let (tx, event_rx) = mpsc::channel(256);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;

        let mut watched = 0;
        let mut last_error = None;
        for root in roots {
            match watcher.watch(root, RecursiveMode::Recursive) {
                Ok(()) => {
                    crate::debug_event!("watcher", "watching", "{}", root.display());
                    watched += 1;
                }
                Err(e) => {
                    tracing::warn!("[watcher] failed to watch {}: {e}", root.display());
                    last_error = Some(WatchError::PathWatchFailed {
                        path: root.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        if watched == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        crate::log_event!("watcher", "started", "{watched} roots");
        Ok(Self {
            event_rx,
            _watcher: watcher,
        })
    }

    /// Next batch of Lua file events. Errors from the backend are logged
    /// and skipped; `ChannelClosed` means the watcher is gone.
    pub async fn next_events(&mut self) -> Result<Vec<FileEvent>, WatchError> {
        loop {
            match self.event_rx.recv().await {
                Some(Ok(event)) => {
                    let events = translate(event);
                    if !events.is_empty() {
                        return Ok(events);
                    }
                }
                Some(Err(e)) => tracing::error!("[watcher] file watch error: {e}"),
                None => return Err(WatchError::ChannelClosed),
            }
        }
    }
}

/// Map a notify event onto created/changed/deleted file events.
fn translate(event: Event) -> Vec<FileEvent> {
    let lua_paths = || event.paths.iter().filter(|p| is_lua_file(p)).cloned();
    match event.kind {
        EventKind::Create(_) => lua_paths().map(FileEvent::created).collect(),
        EventKind::Remove(_) => lua_paths().map(FileEvent::deleted).collect(),
        // Renames arrive as (from, to) pairs
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut events = Vec::new();
            if let Some(from) = event.paths.first().filter(|p| is_lua_file(p)) {
                events.push(FileEvent::deleted(from.clone()));
            }
            if let Some(to) = event.paths.get(1).filter(|p| is_lua_file(p)) {
                events.push(FileEvent::created(to.clone()));
            }
            events
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            lua_paths().map(FileEvent::deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            lua_paths().map(FileEvent::created).collect()
        }
        EventKind::Modify(_) => lua_paths().map(FileEvent::changed).collect(),
        _ => Vec::new(),
    }
}
