use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The remote object a workspace syncs against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RemoteTarget {
    Page(String),
    Database(String),
}

impl RemoteTarget {
    pub fn id(&self) -> &str {
        match self {
            RemoteTarget::Page(id) | RemoteTarget::Database(id) => id,
        }
    }

    pub fn root_page_id(&self) -> Option<&str> {
        match self {
            RemoteTarget::Page(id) => Some(id),
            RemoteTarget::Database(_) => None,
        }
    }
}

/// What the last successful push or pull recorded for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineEntry {
    /// `None` while a created page still awaits its content.
    pub hash: Option<String>,
    pub remote_id: String,
    /// `None` for the root page and database entries.
    pub parent_id: Option<String>,
    pub depth: usize,
    #[serde(default)]
    pub flattened: bool,
    /// Exact remote title.
    pub title: String,
    pub last_edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncBaseline {
    pub target: Option<RemoteTarget>,
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files: BTreeMap<String, BaselineEntry>,
}

impl SyncBaseline {
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// File recorded for a remote page id.
    pub fn path_of(&self, remote_id: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(_, entry)| entry.remote_id == remote_id)
            .map(|(path, _)| path.as_str())
    }
}
