//! Sync error types.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::remote::RemoteError;
use crate::store::StoreError;

/// Errors from sync operations.
///
/// Whole-operation errors abort before any remote call. Per-page errors
/// ([`SyncError::Conflict`], [`SyncError::RemoteUnavailable`],
/// [`SyncError::ParentFailed`]) are collected in reports instead.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local uncommitted edits differ from incoming remote content.
    #[error("sync conflict in {file}: uncommitted local changes differ from the remote")]
    Conflict { file: String },

    #[error("remote unavailable for {page}: {source}")]
    RemoteUnavailable {
        page: String,
        #[source]
        source: RemoteError,
    },

    /// The page's parent could not be synced, so it was not attempted.
    #[error("skipped {file}: parent page {parent} failed")]
    ParentFailed { file: String, parent: String },

    #[error("state corruption in {path}: {detail}")]
    StateCorruption { path: PathBuf, detail: String },

    #[error("not a notionsync workspace: {0}; run init first")]
    NotInitialized(PathBuf),

    #[error("nothing committed yet; run commit first")]
    NoCommits,

    #[error("workspace is locked by another process ({0})")]
    Locked(PathBuf),

    #[error("no remote target configured; set a page URL or database id")]
    NoRemoteTarget,

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SyncError {
    /// Short category name printed by the CLI.
    pub fn category(&self) -> &'static str {
        match self {
            SyncError::Conflict { .. } => "conflict",
            SyncError::RemoteUnavailable { .. } | SyncError::ParentFailed { .. } => "remote",
            SyncError::StateCorruption { .. } => "state",
            SyncError::NotInitialized(_)
            | SyncError::NoCommits
            | SyncError::Locked(_)
            | SyncError::NoRemoteTarget => "usage",
            SyncError::Io { .. } => "io",
        }
    }

    pub(crate) fn remote(page: impl Into<String>, source: RemoteError) -> Self {
        SyncError::RemoteUnavailable {
            page: page.into(),
            source,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotInitialized(path) => SyncError::NotInitialized(path),
            StoreError::Locked(path) => SyncError::Locked(path),
            StoreError::Corrupt { path, detail } => SyncError::StateCorruption { path, detail },
            StoreError::Io { path, source } => SyncError::Io { path, source },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories() {
        assert_eq!(
            SyncError::Conflict {
                file: "A.md".to_string()
            }
            .category(),
            "conflict"
        );
        assert_eq!(
            SyncError::remote("A.md", RemoteError::Transient("503".to_string())).category(),
            "remote"
        );
        let corrupt: SyncError = StoreError::Corrupt {
            path: PathBuf::from("baseline.json"),
            detail: "bad".to_string(),
        }
        .into();
        assert_eq!(corrupt.category(), "state");
        assert_eq!(SyncError::NoCommits.category(), "usage");
    }
}
