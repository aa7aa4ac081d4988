//! In-memory [`RemoteClient`] for tests.
//!
//! Behaves like the remote where the sync engine can observe it: created
//! pages appear as `child_page` blocks of their parent, listings are paged,
//! archived pages drop out of listings. Every call is recorded and failures
//! can be injected per page title or per parent id.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use super::{
    ChildrenPage, DatabasePage, PageMetadata, PageParent, RemoteBlock, RemoteBlockKind,
    RemoteClient, RemoteError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    CreatePage { parent: PageParent, title: String },
    AppendBlocks { parent_id: String, count: usize },
    ListChildren { block_id: String, cursor: Option<String> },
    PageMetadata(String),
    ArchivePage(String),
    DeleteBlock(String),
    QueryDatabase { database_id: String, cursor: Option<String> },
}

impl Call {
    /// True for calls that change remote state.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Call::CreatePage { .. }
                | Call::AppendBlocks { .. }
                | Call::ArchivePage(_)
                | Call::DeleteBlock(_)
        )
    }
}

#[derive(Debug, Clone)]
struct PageInfo {
    title: String,
    parent: Option<PageParent>,
    archived: bool,
    last_edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct Node {
    /// Page info for page nodes, block kind for content nodes.
    page: Option<PageInfo>,
    kind: Option<RemoteBlockKind>,
    children: Vec<String>,
    /// Page that owns this node; a page owns itself.
    owner: String,
}

#[derive(Debug, Default)]
struct State {
    nodes: HashMap<String, Node>,
    databases: Vec<String>,
    calls: Vec<Call>,
    next_id: u64,
    clock: i64,
    fail_create: HashMap<String, RemoteError>,
    fail_append: HashMap<String, RemoteError>,
}

impl State {
    fn new_id(&mut self) -> String {
        self.next_id += 1;
        format!("00000000-0000-4000-8000-{:012x}", self.next_id)
    }

    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).single().unwrap_or_default()
            + Duration::seconds(self.clock)
    }

    fn touch(&mut self, owner: &str) {
        let now = self.tick();
        if let Some(info) = self.nodes.get_mut(owner).and_then(|n| n.page.as_mut()) {
            info.last_edited_at = now;
        }
    }

    fn insert_block(&mut self, owner: &str, block: &RemoteBlock) -> String {
        let id = self.new_id();
        let children: Vec<String> = block
            .children
            .iter()
            .map(|child| self.insert_block(owner, child))
            .collect();
        self.nodes.insert(
            id.clone(),
            Node {
                page: None,
                kind: Some(block.kind.clone()),
                children,
                owner: owner.to_string(),
            },
        );
        id
    }

    fn insert_page(&mut self, parent: Option<PageParent>, title: &str) -> String {
        let id = self.new_id();
        let now = self.tick();
        self.nodes.insert(
            id.clone(),
            Node {
                page: Some(PageInfo {
                    title: title.to_string(),
                    parent: parent.clone(),
                    archived: false,
                    last_edited_at: now,
                }),
                kind: None,
                children: Vec::new(),
                owner: id.clone(),
            },
        );
        if let Some(PageParent::Page(parent_id)) = &parent {
            if let Some(node) = self.nodes.get_mut(parent_id) {
                node.children.push(id.clone());
            }
            self.touch(parent_id);
        }
        id
    }

    /// The listing form of a node, without children populated.
    fn listed(&self, id: &str) -> Option<RemoteBlock> {
        let node = self.nodes.get(id)?;
        let kind = match (&node.page, &node.kind) {
            (Some(info), _) if info.archived => return None,
            (Some(info), _) => RemoteBlockKind::ChildPage {
                title: info.title.clone(),
            },
            (None, Some(kind)) => kind.clone(),
            (None, None) => return None,
        };
        Some(RemoteBlock {
            id: Some(id.to_string()),
            kind,
            children: Vec::new(),
            has_children: node.page.is_some() || !node.children.is_empty(),
        })
    }

    fn metadata(&self, id: &str) -> Option<PageMetadata> {
        let info = self.nodes.get(id)?.page.as_ref()?;
        Some(PageMetadata {
            id: id.to_string(),
            title: info.title.clone(),
            last_edited_at: info.last_edited_at,
            archived: info.archived,
        })
    }
}

#[derive(Debug)]
pub struct MemoryRemote {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    /// Listings return at most `page_size` items per cursor page.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: page_size.max(1),
        }
    }

    /// Creates a root page that is not a child of any other page.
    pub fn add_root_page(&self, title: &str) -> String {
        self.state.lock().unwrap().insert_page(None, title)
    }

    pub fn add_database(&self, database_id: &str) {
        self.state
            .lock()
            .unwrap()
            .databases
            .push(database_id.to_string());
    }

    /// Creates a page with content directly, without recording calls.
    pub fn seed_page(&self, parent: PageParent, title: &str, blocks: &[RemoteBlock]) -> String {
        let mut state = self.state.lock().unwrap();
        let id = state.insert_page(Some(parent), title);
        for block in blocks {
            let child = state.insert_block(&id, block);
            if let Some(node) = state.nodes.get_mut(&id) {
                node.children.push(child);
            }
        }
        id
    }

    /// Appends blocks to a page without recording calls, as a remote edit.
    pub fn edit_page(&self, page_id: &str, blocks: &[RemoteBlock]) {
        let mut state = self.state.lock().unwrap();
        for block in blocks {
            let child = state.insert_block(page_id, block);
            if let Some(node) = state.nodes.get_mut(page_id) {
                node.children.push(child);
            }
        }
        state.touch(page_id);
    }

    pub fn archive(&self, page_id: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(info) = state.nodes.get_mut(page_id).and_then(|n| n.page.as_mut()) {
            info.archived = true;
        }
    }

    pub fn fail_create_page(&self, title: &str, error: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .fail_create
            .insert(title.to_string(), error);
    }

    pub fn fail_append(&self, parent_id: &str, error: RemoteError) {
        self.state
            .lock()
            .unwrap()
            .fail_append
            .insert(parent_id.to_string(), error);
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.fail_create.clear();
        state.fail_append.clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn mutation_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_mutation()).count()
    }

    /// Live pages with the given title.
    pub fn pages_titled(&self, title: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        let mut ids: Vec<String> = state
            .nodes
            .iter()
            .filter(|(_, n)| {
                n.page
                    .as_ref()
                    .is_some_and(|p| p.title == title && !p.archived)
            })
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn parent_of(&self, page_id: &str) -> Option<PageParent> {
        let state = self.state.lock().unwrap();
        state.nodes.get(page_id)?.page.as_ref()?.parent.clone()
    }

    pub fn is_archived(&self, page_id: &str) -> bool {
        let state = self.state.lock().unwrap();
        state.metadata(page_id).is_some_and(|m| m.archived)
    }

    /// Full content tree of a page, excluding child pages.
    pub fn content(&self, page_id: &str) -> Vec<RemoteBlock> {
        fn build(state: &State, id: &str) -> Option<RemoteBlock> {
            let mut block = state.listed(id)?;
            if block.kind.is_child_page_like() {
                return None;
            }
            let node = state.nodes.get(id)?;
            block.children = node
                .children
                .iter()
                .filter_map(|c| build(state, c))
                .collect();
            Some(block)
        }
        let state = self.state.lock().unwrap();
        state
            .nodes
            .get(page_id)
            .map(|n| {
                n.children
                    .iter()
                    .filter_map(|c| build(&state, c))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl RemoteClient for MemoryRemote {
    fn create_page(&self, parent: &PageParent, title: &str) -> Result<String, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreatePage {
            parent: parent.clone(),
            title: title.to_string(),
        });
        if let Some(error) = state.fail_create.get(title) {
            return Err(error.clone());
        }
        match parent {
            PageParent::Page(id) if state.metadata(id).is_none() => {
                return Err(RemoteError::NotFound(id.clone()))
            }
            PageParent::Database(id) if !state.databases.contains(id) => {
                return Err(RemoteError::NotFound(id.clone()))
            }
            _ => {}
        }
        Ok(state.insert_page(Some(parent.clone()), title))
    }

    fn append_blocks(&self, parent_id: &str, blocks: &[RemoteBlock]) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::AppendBlocks {
            parent_id: parent_id.to_string(),
            count: blocks.len(),
        });
        if let Some(error) = state.fail_append.get(parent_id) {
            return Err(error.clone());
        }
        if blocks.len() > 100 {
            return Err(RemoteError::Validation(
                "children length should be <= 100".to_string(),
            ));
        }
        let owner = match state.nodes.get(parent_id) {
            Some(node) => node.owner.clone(),
            None => return Err(RemoteError::NotFound(parent_id.to_string())),
        };
        for block in blocks {
            let child = state.insert_block(&owner, block);
            if let Some(node) = state.nodes.get_mut(parent_id) {
                node.children.push(child);
            }
        }
        state.touch(&owner);
        Ok(())
    }

    fn list_children_page(
        &self,
        block_id: &str,
        cursor: Option<&str>,
    ) -> Result<ChildrenPage, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListChildren {
            block_id: block_id.to_string(),
            cursor: cursor.map(str::to_string),
        });
        let Some(node) = state.nodes.get(block_id) else {
            return Err(RemoteError::NotFound(block_id.to_string()));
        };
        let listed: Vec<RemoteBlock> = node
            .children
            .iter()
            .filter_map(|c| state.listed(c))
            .collect();

        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(listed.len());
        let next_cursor = (end < listed.len()).then(|| end.to_string());
        Ok(ChildrenPage {
            blocks: listed[start.min(end)..end].to_vec(),
            next_cursor,
        })
    }

    fn page_metadata(&self, page_id: &str) -> Result<PageMetadata, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::PageMetadata(page_id.to_string()));
        state
            .metadata(page_id)
            .ok_or_else(|| RemoteError::NotFound(page_id.to_string()))
    }

    fn archive_page(&self, page_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ArchivePage(page_id.to_string()));
        let now = state.tick();
        match state.nodes.get_mut(page_id).and_then(|n| n.page.as_mut()) {
            Some(info) => {
                info.archived = true;
                info.last_edited_at = now;
                Ok(())
            }
            None => Err(RemoteError::NotFound(page_id.to_string())),
        }
    }

    fn delete_block(&self, block_id: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::DeleteBlock(block_id.to_string()));
        let Some(owner) = state.nodes.get(block_id).map(|n| n.owner.clone()) else {
            return Err(RemoteError::NotFound(block_id.to_string()));
        };
        state.nodes.remove(block_id);
        for node in state.nodes.values_mut() {
            node.children.retain(|c| c != block_id);
        }
        state.touch(&owner);
        Ok(())
    }

    fn query_database(
        &self,
        database_id: &str,
        cursor: Option<&str>,
    ) -> Result<DatabasePage, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::QueryDatabase {
            database_id: database_id.to_string(),
            cursor: cursor.map(str::to_string),
        });
        if !state.databases.iter().any(|d| d == database_id) {
            return Err(RemoteError::NotFound(database_id.to_string()));
        }
        let parent = PageParent::Database(database_id.to_string());
        let mut entries: Vec<(u64, PageMetadata)> = state
            .nodes
            .iter()
            .filter(|(_, n)| {
                n.page
                    .as_ref()
                    .is_some_and(|p| p.parent.as_ref() == Some(&parent) && !p.archived)
            })
            .filter_map(|(id, _)| {
                let order = u64::from_str_radix(id.rsplit('-').next()?, 16).ok()?;
                Some((order, state.metadata(id)?))
            })
            .collect();
        entries.sort_by_key(|(order, _)| *order);

        let start: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let end = (start + self.page_size).min(entries.len());
        Ok(DatabasePage {
            pages: entries[start.min(end)..end]
                .iter()
                .map(|(_, m)| m.clone())
                .collect(),
            next_cursor: (end < entries.len()).then(|| end.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RichText;

    fn para(text: &str) -> RemoteBlock {
        RemoteBlock::new(RemoteBlockKind::Paragraph {
            rich_text: vec![RichText::text(text)],
        })
    }

    #[test]
    fn test_list_children_drains_cursors_and_nests() {
        let remote = MemoryRemote::with_page_size(2);
        let root = remote.add_root_page("Root");
        let blocks: Vec<RemoteBlock> = (0..5).map(|i| para(&format!("p{i}"))).collect();
        let nested = RemoteBlock::new(RemoteBlockKind::BulletedListItem {
            rich_text: vec![RichText::text("outer")],
        })
        .with_children(vec![para("inner")]);
        remote.edit_page(&root, &blocks);
        remote.edit_page(&root, &[nested]);

        let listed = remote.list_children(&root).unwrap();
        assert_eq!(listed.len(), 6);
        assert_eq!(listed[5].children.len(), 1);

        let list_calls = remote
            .calls()
            .iter()
            .filter(|c| matches!(c, Call::ListChildren { block_id, .. } if *block_id == root))
            .count();
        assert_eq!(list_calls, 3);
    }

    #[test]
    fn test_child_pages_are_listed_not_descended() {
        let remote = MemoryRemote::new();
        let root = remote.add_root_page("Root");
        let child = remote
            .create_page(&PageParent::Page(root.clone()), "Child")
            .unwrap();
        remote.append_blocks(&child, &[para("body")]).unwrap();

        let listed = remote.list_children(&root).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            listed[0].kind,
            RemoteBlockKind::ChildPage {
                title: "Child".to_string()
            }
        );
        assert!(listed[0].children.is_empty());
    }

    #[test]
    fn test_injected_failure() {
        let remote = MemoryRemote::new();
        let root = remote.add_root_page("Root");
        remote.fail_create_page("Bad", RemoteError::Transient("boom".into()));
        assert!(remote
            .create_page(&PageParent::Page(root.clone()), "Bad")
            .is_err());
        assert!(remote.create_page(&PageParent::Page(root), "Good").is_ok());
    }
}
