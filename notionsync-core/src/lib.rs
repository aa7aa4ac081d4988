//! Notionsync Core Library
//!
//! Markdown conversion and the sync engine that keeps a directory of
//! Markdown files in step with a tree of Notion pages.

pub mod hierarchy;
pub mod mapper;
pub mod markdown;
pub mod page_ref;
pub mod remote;
pub mod store;
pub mod sync;
pub mod warning;

pub use markdown::{parse, parse_document, parse_page, render, BlockKind, BlockNode, InlineSpan};
pub use page_ref::{parse_page_ref, PageRefError};
pub use remote::{NotionClient, PageParent, RemoteClient, RemoteError};
pub use store::{CommitRecord, RemoteTarget, Status, Store, StoreError};
pub use sync::{
    PageFailure, PullReport, PushReport, RemoteDivergence, StatusReport, SyncError, SyncOptions,
    Workspace,
};
pub use warning::Warning;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
