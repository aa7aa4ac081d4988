use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable snapshot of the working set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// File name to content hash.
    pub files: BTreeMap<String, String>,
}

impl CommitRecord {
    pub fn new(message: impl Into<String>, files: BTreeMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            message: message.into(),
            files,
        }
    }

    /// First eight characters of the id, for display.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }
}

/// Differences between the working set and the last commit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Status {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl Status {
    pub fn is_clean(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

/// Compares working file hashes with a commit's. Every list comes out
/// sorted since both maps are ordered.
pub fn compute_status(
    working: &BTreeMap<String, String>,
    last_commit: Option<&CommitRecord>,
) -> Status {
    let empty = BTreeMap::new();
    let committed = last_commit.map(|c| &c.files).unwrap_or(&empty);

    let mut status = Status::default();
    for (path, hash) in working {
        match committed.get(path) {
            None => status.added.push(path.clone()),
            Some(old) if old != hash => status.modified.push(path.clone()),
            Some(_) => {}
        }
    }
    status.deleted = committed
        .keys()
        .filter(|path| !working.contains_key(*path))
        .cloned()
        .collect();
    status
}
