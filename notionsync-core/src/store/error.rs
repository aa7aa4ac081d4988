use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not a notionsync workspace (no state at {0}); run init first")]
    NotInitialized(PathBuf),

    #[error("workspace is locked by another process ({0})")]
    Locked(PathBuf),

    #[error("state file {path} is corrupt: {detail}")]
    Corrupt { path: PathBuf, detail: String },

    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, detail: impl ToString) -> Self {
        StoreError::Corrupt {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}
