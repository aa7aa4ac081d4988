//! Sync orchestration between the workspace and the remote.
//!
//! [`Workspace`] runs the user-facing operations:
//!
//! - `status`: working tree against the last commit, plus remote edits
//!   since the last sync from page metadata,
//! - `commit`: snapshot the working tree,
//! - `push`: send changed committed pages, parents first,
//! - `pull`: fetch the remote tree and write it as files,
//! - `log`: list commits.
//!
//! Per-page failures during push and pull do not stop the operation; they
//! are collected in the returned report and the baseline only advances for
//! pages that succeeded.

mod error;
mod orchestrator;
mod pull;
mod push;
mod report;
mod status;


pub use error::SyncError;
pub use orchestrator::{SyncOptions, Workspace, INIT_COMMIT_MESSAGE};
pub use pull::PULL_COMMIT_MESSAGE;
pub use report::{PageFailure, PullReport, PushReport, RemoteDivergence, StatusReport};
