//! Remote document store boundary.
//!
//! [`RemoteClient`] is a blocking contract: each call either succeeds or
//! fails terminally. Retries, rate limiting and pagination cursors stay
//! behind it. [`NotionClient`] talks to the Notion HTTP API; tests use the
//! in-memory implementation in [`memory`].

mod block;
mod error;
#[cfg(test)]
pub mod memory;
mod notion;
mod wire;

pub use block::{
    rich_text_plain, EquationContent, Link, RemoteBlock, RemoteBlockKind, RichText,
    RichTextAnnotations, RichTextContent, TextContent, RICH_TEXT_LIMIT,
};
pub use error::RemoteError;
pub use notion::{NotionClient, NOTION_API_URL, NOTION_VERSION};

use chrono::{DateTime, Utc};

/// Where a new page is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageParent {
    Page(String),
    /// Database entries get their title in the `Name` property.
    Database(String),
}

/// One page of a block's children listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildrenPage {
    pub blocks: Vec<RemoteBlock>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub id: String,
    pub title: String,
    pub last_edited_at: DateTime<Utc>,
    pub archived: bool,
}

/// One page of database query results.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabasePage {
    pub pages: Vec<PageMetadata>,
    pub next_cursor: Option<String>,
}

pub trait RemoteClient {
    /// Creates an empty page and returns its id.
    fn create_page(&self, parent: &PageParent, title: &str) -> Result<String, RemoteError>;

    /// Appends blocks, with their children, after the existing children of
    /// `parent_id`.
    fn append_blocks(&self, parent_id: &str, blocks: &[RemoteBlock]) -> Result<(), RemoteError>;

    /// Fetches one page of direct children. Children of the returned blocks
    /// are not populated.
    fn list_children_page(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage, RemoteError>;

    fn page_metadata(&self, page_id: &str) -> Result<PageMetadata, RemoteError>;

    fn archive_page(&self, page_id: &str) -> Result<(), RemoteError>;

    fn delete_block(&self, block_id: &str) -> Result<(), RemoteError>;

    fn query_database(
        &self,
        database_id: &str,
        cursor: Option<&str>,
    ) -> Result<DatabasePage, RemoteError>;

    /// Lists every child of `block_id`, draining all cursors and descending
    /// into nested content. Child pages and databases are not descended into.
    fn list_children(&self, block_id: &str) -> Result<Vec<RemoteBlock>, RemoteError> {
        let mut blocks = self.list_direct_children(block_id)?;
        for block in &mut blocks {
            if !block.has_children || block.kind.is_child_page_like() {
                continue;
            }
            if let Some(id) = block.id.clone() {
                block.children = self.list_children(&id)?;
            }
        }
        Ok(blocks)
    }

    /// Direct children of `block_id` with all cursors drained. Nested
    /// content is not fetched.
    fn list_direct_children(&self, block_id: &str) -> Result<Vec<RemoteBlock>, RemoteError> {
        let mut blocks = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.list_children_page(block_id, cursor.as_deref())?;
            blocks.extend(page.blocks);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(blocks)
    }

    /// Every entry of a database, all cursors drained.
    fn list_database_pages(&self, database_id: &str) -> Result<Vec<PageMetadata>, RemoteError> {
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let page = self.query_database(database_id, cursor.as_deref())?;
            pages.extend(page.pages);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(pages)
    }
}
