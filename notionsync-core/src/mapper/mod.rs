//! Translation between document nodes and remote blocks.

mod batch;
mod from_remote;
mod to_remote;

pub use batch::{partition_batches, DEFAULT_BATCH_LIMIT, MAX_BLOCKS_PER_REQUEST};
pub use from_remote::{from_remote, rich_text_to_spans};
pub use to_remote::{normalize_language, spans_to_rich_text, to_remote, Mapped};

use crate::markdown::BlockNode;
use crate::remote::RemoteBlock;
use crate::warning::Warning;

/// A reference to a child page found while mapping a page's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildPageRequest {
    pub title: String,
    /// Sibling file holding the child page.
    pub file: String,
}

/// A page's content ready to append, plus the child pages it references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MappedPage {
    pub blocks: Vec<RemoteBlock>,
    pub child_pages: Vec<ChildPageRequest>,
    pub warnings: Vec<Warning>,
}

/// Maps a page's top-level nodes in order.
pub fn map_page(nodes: &[BlockNode]) -> MappedPage {
    let mut page = MappedPage::default();
    for node in nodes {
        match to_remote(node, &mut page.child_pages, &mut page.warnings) {
            Mapped::Block(block) => page.blocks.push(block),
            Mapped::ChildPage(request) => page.child_pages.push(request),
        }
    }
    page
}

/// Maps a page's remote content back to nodes.
pub fn nodes_from_remote(blocks: &[RemoteBlock], warnings: &mut Vec<Warning>) -> Vec<BlockNode> {
    blocks.iter().map(|b| from_remote(b, warnings)).collect()
}
