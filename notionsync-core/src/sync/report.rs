//! Outcomes of sync operations.

use crate::store::{CommitRecord, Status};
use crate::warning::Warning;

use super::SyncError;

/// A page that could not be synced; the rest of the operation went on.
#[derive(Debug)]
pub struct PageFailure {
    pub file: String,
    pub error: SyncError,
}

impl std::fmt::Display for PageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [{}] {}", self.file, self.error.category(), self.error)
    }
}

#[derive(Debug, Default)]
pub struct PushReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub archived: Vec<String>,
    pub unchanged: usize,
    pub failures: Vec<PageFailure>,
    pub warnings: Vec<Warning>,
}

impl PushReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct PullReport {
    /// Files written with new content.
    pub written: Vec<String>,
    /// Pages whose local file already matched.
    pub unchanged: usize,
    /// Files removed because their page is gone remotely.
    pub removed: Vec<String>,
    pub failures: Vec<PageFailure>,
    pub warnings: Vec<Warning>,
    /// The commit recording the pulled content, if anything changed.
    pub commit: Option<CommitRecord>,
}

impl PullReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn conflicts(&self) -> Vec<&str> {
        self.failures
            .iter()
            .filter(|f| matches!(f.error, SyncError::Conflict { .. }))
            .map(|f| f.file.as_str())
            .collect()
    }
}

/// Remote changes since the last sync, from page metadata only.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RemoteDivergence {
    /// Pages edited remotely after the last sync.
    pub changed: Vec<String>,
    /// Pages archived or deleted remotely.
    pub missing: Vec<String>,
    /// Pages whose metadata could not be fetched, with the reason.
    pub unreachable: Vec<(String, String)>,
}

impl RemoteDivergence {
    pub fn is_clean(&self) -> bool {
        self.changed.is_empty() && self.missing.is_empty() && self.unreachable.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct StatusReport {
    pub local: Status,
    /// `None` when never synced or no remote client was given.
    pub remote: Option<RemoteDivergence>,
    /// Committed files not yet in the remote or changed since last synced.
    pub unpushed: Vec<String>,
}
