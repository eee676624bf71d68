//! `watch` command.

use std::path::PathBuf;

use luasense::Settings;
use luasense::watcher::{FileChangeKind, NativeWatcher};

pub async fn run(settings: &Settings, root: Option<PathBuf>) -> anyhow::Result<()> {
    let root = super::workspace_root(root);
    let modules = super::scanned_modules(settings, &root);
    let mut watcher = NativeWatcher::new(&modules.roots())?;
    eprintln!("Watching {} module files, Ctrl+C to stop", modules.len());

    loop {
        tokio::select! {
            events = watcher.next_events() => {
                for event in events? {
                    match event.kind {
                        FileChangeKind::Created => {
                            if modules.add_file(&event.path) {
                                println!("+ {}", event.path.display());
                            }
                        }
                        FileChangeKind::Deleted => {
                            if modules.remove_file(&event.path) {
                                println!("- {}", event.path.display());
                            }
                        }
                        FileChangeKind::Changed => {
                            tracing::debug!("[watch] changed {}", event.path.display());
                        }
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                eprintln!("Stopped");
                return Ok(());
            }
        }
    }
}
