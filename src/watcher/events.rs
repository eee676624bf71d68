use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChangeKind {
    Created,
    Changed,
    Deleted,
}

/// One watched-file change, as an editor reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEvent {
    pub path: PathBuf,
    pub kind: FileChangeKind,
}

impl FileEvent {
    pub fn created(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileChangeKind::Created,
        }
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileChangeKind::Changed,
        }
    }

    pub fn deleted(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: FileChangeKind::Deleted,
        }
    }

    /// `kind` as a protocol change type (1 created, 2 changed, 3 deleted).
    pub fn from_change_type(path: impl Into<PathBuf>, change_type: u8) -> Option<Self> {
        let kind = match change_type {
            1 => FileChangeKind::Created,
            2 => FileChangeKind::Changed,
            3 => FileChangeKind::Deleted,
            _ => return None,
        };
        Some(Self {
            path: path.into(),
            kind,
        })
    }
}
