use std::collections::{BTreeMap, HashMap, HashSet};

use crate::markdown::{BlockKind, BlockNode};
use crate::remote::RemoteBlock;
use crate::warning::Warning;

use super::filename::{FileNamer, ROOT_FILE};
use super::table::{PageIdx, PageRecord, PageTable};

/// Default cap on page nesting below the root.
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// What the last sync recorded about a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownPage {
    pub remote_id: String,
    /// Path of the parent page; `None` for top-level pages.
    pub parent: Option<String>,
    pub title: String,
    pub depth: usize,
    pub flattened: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Remote id of the root page. `None` when syncing against a database,
    /// where every top-level page is a database entry and `index.md` has no
    /// remote counterpart.
    pub root_page_id: Option<String>,
    pub max_depth: usize,
}

/// A local page file as seen by the resolver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPage {
    pub path: String,
    pub title: String,
    /// Files referenced by child page links, in document order.
    pub child_files: Vec<String>,
}

/// A page found while walking the remote tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePageInfo {
    pub id: String,
    pub title: String,
    /// `None` for the root page and for database entries.
    pub parent_id: Option<String>,
}

/// Builds the page table for a push from local files and the baseline.
///
/// Known pages keep their recorded parent. A new page gets the first page
/// (in path order) that links to it as parent, or the root otherwise.
pub fn resolve_local(
    pages: &[LocalPage],
    known: &BTreeMap<String, KnownPage>,
    options: &ResolveOptions,
    warnings: &mut Vec<Warning>,
) -> PageTable {
    let mut sorted: Vec<&LocalPage> = pages.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut table = PageTable::new();
    let mut root = None;
    for page in &sorted {
        let mut record = PageRecord::new(page.path.clone(), page.title.clone());
        if page.path == ROOT_FILE {
            if let Some(id) = &options.root_page_id {
                record.remote_id = Some(id.clone());
                let idx = table.insert(record);
                root = Some(idx);
                continue;
            }
        }
        if let Some(entry) = known.get(&page.path) {
            record.remote_id = Some(entry.remote_id.clone());
            record.flattened = entry.flattened;
        }
        table.insert(record);
    }

    let mut referrers: HashMap<&str, &str> = HashMap::new();
    for page in &sorted {
        for child in &page.child_files {
            if child != &page.path && child != ROOT_FILE {
                referrers.entry(child.as_str()).or_insert(page.path.as_str());
            }
        }
    }

    for page in &sorted {
        let Some(idx) = table.lookup(&page.path) else {
            continue;
        };
        if Some(idx) == root {
            continue;
        }
        let parent_path = match known.get(&page.path) {
            Some(entry) => entry.parent.clone(),
            None => referrers.get(page.path.as_str()).map(|p| p.to_string()),
        };
        let parent = parent_path
            .and_then(|p| table.lookup(&p))
            .filter(|p| *p != idx && !(root.is_none() && table.get(*p).path == ROOT_FILE))
            .or(root);
        table.get_mut(idx).parent = parent;
    }

    break_cycles(&mut table, root);
    assign_depths(&mut table, root, options.max_depth, warnings);
    table
}

/// Builds the page table for a pull from the remote pages, listed parents
/// before children.
///
/// Pages already in the baseline keep their file name; new pages are named
/// from their title in listing order, so the first of two equal titles gets
/// the plain name.
pub fn resolve_remote(
    pages: &[RemotePageInfo],
    known: &BTreeMap<String, KnownPage>,
    options: &ResolveOptions,
    warnings: &mut Vec<Warning>,
) -> PageTable {
    let incoming: HashSet<&str> = pages.iter().map(|p| p.id.as_str()).collect();
    let mut known_by_id: HashMap<&str, &str> = HashMap::new();
    let mut namer = FileNamer::new();
    for (path, entry) in known {
        if incoming.contains(entry.remote_id.as_str()) {
            known_by_id.insert(entry.remote_id.as_str(), path.as_str());
            namer.reserve(path);
        }
    }

    let mut table = PageTable::new();
    let mut root = None;
    for page in pages {
        let is_root = options.root_page_id.as_deref() == Some(page.id.as_str());
        let path = if is_root {
            ROOT_FILE.to_string()
        } else if let Some(path) = known_by_id.get(page.id.as_str()) {
            path.to_string()
        } else {
            namer.assign(&page.title, warnings)
        };

        let mut record = PageRecord::new(path, page.title.clone());
        record.remote_id = Some(page.id.clone());
        let idx = table.insert(record);
        if is_root {
            root = Some(idx);
        }
    }

    for page in pages {
        let Some(idx) = table.find_remote(&page.id) else {
            continue;
        };
        if Some(idx) == root {
            continue;
        }
        let parent = page
            .parent_id
            .as_deref()
            .and_then(|id| table.find_remote(id))
            .filter(|p| *p != idx)
            .or(root);
        table.get_mut(idx).parent = parent;
    }

    break_cycles(&mut table, root);
    assign_depths(&mut table, root, options.max_depth, warnings);
    table
}

/// Re-points any page whose parent chain loops back on itself to the root.
fn break_cycles(table: &mut PageTable, root: Option<PageIdx>) {
    let all: Vec<PageIdx> = table.iter().map(|(idx, _)| idx).collect();
    for idx in all {
        let mut seen = HashSet::from([idx]);
        let mut current = table.get(idx).parent;
        while let Some(p) = current {
            if !seen.insert(p) {
                table.get_mut(idx).parent = root.filter(|r| *r != idx);
                break;
            }
            current = table.get(p).parent;
        }
    }
}

fn chain_length(table: &PageTable, idx: PageIdx) -> usize {
    let mut length = 0;
    let mut current = table.get(idx).parent;
    while let Some(p) = current {
        length += 1;
        current = table.get(p).parent;
    }
    length
}

/// Computes depths parents-first and moves pages nested beyond `max_depth`
/// up to be siblings of their deepest permitted ancestor.
fn assign_depths(
    table: &mut PageTable,
    root: Option<PageIdx>,
    max_depth: usize,
    warnings: &mut Vec<Warning>,
) {
    let max_depth = max_depth.max(1);
    let mut order: Vec<(usize, PageIdx)> = table
        .iter()
        .map(|(idx, _)| (chain_length(table, idx), idx))
        .collect();
    order.sort();

    for (_, idx) in order {
        if Some(idx) == root {
            table.get_mut(idx).depth = 0;
            continue;
        }
        let depth = match table.get(idx).parent {
            Some(p) => table.get(p).depth + 1,
            None => 1,
        };
        if depth <= max_depth {
            table.get_mut(idx).depth = depth;
            continue;
        }

        // The parent sits at max_depth; become its sibling.
        let new_parent = table.get(idx).parent.and_then(|p| table.get(p).parent);
        let record = table.get_mut(idx);
        record.parent = new_parent;
        record.depth = max_depth;
        record.flattened = true;
        Warning::HierarchyDepthExceeded {
            title: record.title.clone(),
            depth,
            max_depth,
        }
        .record(warnings);
    }
}

/// Fills in the file of each child page link from `table` and drops child
/// pages that are not embedded.
///
/// `nodes` must be the mapping of `blocks`. A top-level child page is
/// embedded when other content follows it; trailing child pages are linked
/// through the page table alone. Nested child pages are always embedded.
pub fn link_child_pages(
    nodes: Vec<BlockNode>,
    blocks: &[RemoteBlock],
    table: &PageTable,
) -> Vec<BlockNode> {
    link_level(nodes, blocks, table, true)
}

fn link_level(
    nodes: Vec<BlockNode>,
    blocks: &[RemoteBlock],
    table: &PageTable,
    top_level: bool,
) -> Vec<BlockNode> {
    let last_content = nodes
        .iter()
        .rposition(|n| !matches!(n.kind, BlockKind::ChildPageRef { .. }));

    let mut out = Vec::with_capacity(nodes.len());
    for (i, (mut node, block)) in nodes.into_iter().zip(blocks).enumerate() {
        if let BlockKind::ChildPageRef { file, .. } = &mut node.kind {
            let embedded = !top_level || last_content.is_some_and(|last| i < last);
            let linked = block
                .id
                .as_deref()
                .and_then(|id| table.find_remote(id))
                .map(|idx| table.get(idx).path.clone());
            match linked {
                Some(path) if embedded => *file = path,
                _ => continue,
            }
        }
        let children = std::mem::take(&mut node.children);
        node.children = link_level(children, &block.children, table, false);
        out.push(node);
    }
    out
}
