//! Pull: bring the remote tree into the workspace.

use std::collections::{HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};

use crate::hierarchy::{link_child_pages, resolve_remote, RemotePageInfo, ROOT_FILE};
use crate::mapper::nodes_from_remote;
use crate::markdown::render;
use crate::remote::{RemoteBlock, RemoteBlockKind, RemoteClient};
use crate::store::{content_hash, BaselineEntry, RemoteTarget};

use super::orchestrator::known_pages;
use super::{PageFailure, PullReport, SyncError, Workspace};

/// Message of the commit a pull records.
pub const PULL_COMMIT_MESSAGE: &str = "Pull from remote";

/// Pages and content fetched from the remote.
#[derive(Debug, Default)]
struct RemoteTree {
    /// Parents before children.
    pages: Vec<RemotePageInfo>,
    content: HashMap<String, Vec<RemoteBlock>>,
    edited: HashMap<String, DateTime<Utc>>,
    /// False when some page's content could not be listed.
    complete: bool,
}

impl Workspace {
    /// Pulls the remote tree into the workspace.
    ///
    /// A file with uncommitted changes is only overwritten when the
    /// incoming content equals it; otherwise it is reported as a conflict
    /// and left alone. Files of pages gone from the remote are removed when
    /// clean. The pulled state is recorded as a commit so the commit log
    /// and baseline agree.
    pub fn pull(&self, remote: &dyn RemoteClient) -> Result<PullReport, SyncError> {
        let _lock = self.store.lock()?;
        let target = self.target()?.clone();
        let mut baseline = self.baseline_for(&target)?;
        let last_commit = self.store.last_commit()?;
        let mut report = PullReport::default();

        let tree = fetch_tree(remote, &target, &mut report)?;
        let known = known_pages(&baseline, &target);
        let table = resolve_remote(
            &tree.pages,
            &known,
            &self.resolve_options(&target),
            &mut report.warnings,
        );

        let mut files = last_commit.map(|c| c.files).unwrap_or_default();

        for idx in table.parents_first() {
            let record = table.get(idx);
            let Some(remote_id) = record.remote_id.as_deref() else {
                continue;
            };
            let Some(blocks) = tree.content.get(remote_id) else {
                continue;
            };

            let nodes = nodes_from_remote(blocks, &mut report.warnings);
            let nodes = link_child_pages(nodes, blocks, &table);
            let text = render(&nodes);
            let incoming = content_hash(text.as_bytes());

            let working = self.store.working_hash(&record.path)?;
            let dirty = working.as_ref() != files.get(&record.path);
            if working.as_deref() == Some(incoming.as_str()) {
                report.unchanged += 1;
            } else if dirty {
                tracing::warn!(file = %record.path, "local changes conflict with remote");
                report.failures.push(PageFailure {
                    file: record.path.clone(),
                    error: SyncError::Conflict {
                        file: record.path.clone(),
                    },
                });
                continue;
            } else {
                self.store.write_working(&record.path, text.as_bytes())?;
                tracing::info!(file = %record.path, "wrote page");
                report.written.push(record.path.clone());
            }

            self.store.objects().put(text.as_bytes())?;
            files.insert(record.path.clone(), incoming.clone());
            baseline.files.insert(
                record.path.clone(),
                BaselineEntry {
                    hash: Some(incoming),
                    remote_id: remote_id.to_string(),
                    parent_id: record.parent.and_then(|p| table.get(p).remote_id.clone()),
                    depth: record.depth,
                    flattened: record.flattened,
                    title: record.title.clone(),
                    last_edited_at: tree.edited.get(remote_id).copied(),
                },
            );
            self.store.save_baseline(&baseline)?;
        }

        if tree.complete {
            let present: HashSet<&str> = table
                .iter()
                .filter_map(|(_, r)| r.remote_id.as_deref())
                .collect();
            let gone: Vec<String> = baseline
                .files
                .iter()
                .filter(|(path, entry)| {
                    !present.contains(entry.remote_id.as_str()) && table.lookup(path).is_none()
                })
                .map(|(path, _)| path.clone())
                .collect();

            for path in gone {
                let working = self.store.working_hash(&path)?;
                if working.is_some() && working.as_ref() != files.get(&path) {
                    report.failures.push(PageFailure {
                        file: path.clone(),
                        error: SyncError::Conflict { file: path },
                    });
                    continue;
                }
                self.store.remove_working(&path)?;
                files.remove(&path);
                baseline.files.remove(&path);
                self.store.save_baseline(&baseline)?;
                tracing::info!(file = %path, "removed page deleted remotely");
                report.removed.push(path);
            }
        } else {
            tracing::warn!("remote tree incomplete; not removing local pages");
        }

        report.commit = self.store.record_commit(PULL_COMMIT_MESSAGE, files)?;
        baseline.last_sync = Some(Utc::now());
        self.store.save_baseline(&baseline)?;

        tracing::info!(
            written = report.written.len(),
            unchanged = report.unchanged,
            removed = report.removed.len(),
            failed = report.failures.len(),
            "pull finished"
        );
        Ok(report)
    }
}

/// Walks the remote breadth first from the root page, or from the
/// database's entries, fetching each page's full content.
fn fetch_tree(
    remote: &dyn RemoteClient,
    target: &RemoteTarget,
    report: &mut PullReport,
) -> Result<RemoteTree, SyncError> {
    let mut tree = RemoteTree {
        complete: true,
        ..RemoteTree::default()
    };
    let mut titles: HashMap<String, String> = HashMap::new();
    let mut queue: VecDeque<String> = VecDeque::new();

    match target {
        RemoteTarget::Page(root) => {
            let meta = remote
                .page_metadata(root)
                .map_err(|e| SyncError::remote(ROOT_FILE, e))?;
            tree.edited.insert(root.clone(), meta.last_edited_at);
            titles.insert(root.clone(), meta.title.clone());
            tree.pages.push(RemotePageInfo {
                id: root.clone(),
                title: meta.title,
                parent_id: None,
            });
            queue.push_back(root.clone());
        }
        RemoteTarget::Database(database_id) => {
            let entries = remote
                .list_database_pages(database_id)
                .map_err(|e| SyncError::remote(database_id, e))?;
            for meta in entries.into_iter().filter(|m| !m.archived) {
                tree.edited.insert(meta.id.clone(), meta.last_edited_at);
                titles.insert(meta.id.clone(), meta.title.clone());
                queue.push_back(meta.id.clone());
                tree.pages.push(RemotePageInfo {
                    id: meta.id,
                    title: meta.title,
                    parent_id: None,
                });
            }
        }
    }

    while let Some(page_id) = queue.pop_front() {
        let blocks = match remote.list_children(&page_id) {
            Ok(blocks) => blocks,
            Err(e) => {
                let title = titles.get(&page_id).cloned().unwrap_or_else(|| page_id.clone());
                tracing::warn!(page = %title, "could not list page content: {}", e);
                tree.complete = false;
                report.failures.push(PageFailure {
                    file: title.clone(),
                    error: SyncError::remote(title, e),
                });
                continue;
            }
        };

        for (id, title) in child_pages(&blocks) {
            if titles.contains_key(&id) {
                continue;
            }
            match remote.page_metadata(&id) {
                Ok(meta) => {
                    tree.edited.insert(id.clone(), meta.last_edited_at);
                }
                Err(e) => tracing::warn!(page = %title, "could not read page metadata: {}", e),
            }
            titles.insert(id.clone(), title.clone());
            tree.pages.push(RemotePageInfo {
                id: id.clone(),
                title,
                parent_id: Some(page_id.clone()),
            });
            queue.push_back(id);
        }
        tree.content.insert(page_id, blocks);
    }
    Ok(tree)
}

/// Child pages anywhere in a page's content, in document order.
fn child_pages(blocks: &[RemoteBlock]) -> Vec<(String, String)> {
    let mut found = Vec::new();
    for block in blocks {
        match (&block.kind, &block.id) {
            (RemoteBlockKind::ChildPage { title }, Some(id)) => {
                found.push((id.clone(), title.clone()));
            }
            _ => found.extend(child_pages(&block.children)),
        }
    }
    found
}
