//! Push: send committed pages to the remote.

use std::collections::{BTreeMap, HashSet};

use chrono::Utc;

use crate::hierarchy::{resolve_local, title_from_file, LocalPage, PageIdx, PageTable, ROOT_FILE};
use crate::mapper::{map_page, partition_batches};
use crate::markdown::{parse_page, ParsedPage};
use crate::remote::{PageParent, RemoteClient, RemoteError};
use crate::store::{BaselineEntry, RemoteTarget, SyncBaseline};

use super::orchestrator::known_pages;
use super::{PageFailure, PushReport, SyncError, Workspace};

/// Whether a page was created or had its content replaced.
enum Pushed {
    Created,
    Updated,
}

impl Workspace {
    /// Pushes the last commit.
    ///
    /// Pages whose committed content differs from the baseline, or that
    /// have never been pushed, are sent parents first:
    /// 1. a new page is created under its resolved parent,
    /// 2. an existing page has its content blocks deleted,
    /// 3. the page's content is appended in batches.
    ///
    /// The baseline is saved after every page, so a failed push resumes
    /// where it stopped. Pages under a failed parent are skipped. Committed
    /// deletions are archived remotely last.
    pub fn push(&self, remote: &dyn RemoteClient) -> Result<PushReport, SyncError> {
        let _lock = self.store.lock()?;
        let target = self.target()?.clone();
        let commit = self.store.last_commit()?.ok_or(SyncError::NoCommits)?;
        let mut baseline = self.baseline_for(&target)?;
        let mut report = PushReport::default();

        // Read every committed page before touching the remote.
        let mut pages: BTreeMap<String, ParsedPage> = BTreeMap::new();
        for (path, hash) in &commit.files {
            let bytes = self.store.read_object(hash)?;
            pages.insert(path.clone(), parse_page(&String::from_utf8_lossy(&bytes)));
        }

        let local: Vec<LocalPage> = pages
            .iter()
            .map(|(path, parsed)| LocalPage {
                path: path.clone(),
                title: page_title(path, parsed, &baseline),
                child_files: parsed
                    .child_refs()
                    .into_iter()
                    .map(|(_, file)| file.to_string())
                    .filter(|file| pages.contains_key(file))
                    .collect(),
            })
            .collect();
        let known = known_pages(&baseline, &target);
        let mut table = resolve_local(
            &local,
            &known,
            &self.resolve_options(&target),
            &mut report.warnings,
        );

        let mut failed: HashSet<PageIdx> = HashSet::new();
        let mut touched: Vec<String> = Vec::new();

        for idx in table.parents_first() {
            let record = table.get(idx).clone();
            if matches!(target, RemoteTarget::Database(_)) && record.path == ROOT_FILE {
                continue;
            }
            let (Some(hash), Some(parsed)) = (commit.files.get(&record.path), pages.get(&record.path))
            else {
                continue;
            };

            let synced_hash = baseline
                .files
                .get(&record.path)
                .and_then(|entry| entry.hash.as_deref());
            if record.remote_id.is_some() && synced_hash == Some(hash.as_str()) {
                report.unchanged += 1;
                continue;
            }

            if record.parent.is_some_and(|p| failed.contains(&p)) {
                failed.insert(idx);
                report.failures.push(PageFailure {
                    file: record.path.clone(),
                    error: SyncError::ParentFailed {
                        file: record.path.clone(),
                        parent: table.parent_path(idx).unwrap_or_default().to_string(),
                    },
                });
                continue;
            }

            report.warnings.extend(parsed.warnings.iter().cloned());
            let outcome = self.push_page(
                remote,
                &target,
                &mut table,
                idx,
                parsed,
                hash,
                &mut baseline,
                &mut report,
            );
            match outcome {
                Ok(pushed) => {
                    let record = table.get(idx);
                    touched.extend(record.remote_id.clone());
                    if let Pushed::Created = pushed {
                        touched.extend(record.parent.and_then(|p| table.get(p).remote_id.clone()));
                        report.created.push(record.path.clone());
                    } else {
                        report.updated.push(record.path.clone());
                    }
                }
                Err(error @ SyncError::RemoteUnavailable { .. }) => {
                    tracing::warn!(file = %record.path, "push failed: {}", error);
                    failed.insert(idx);
                    report.failures.push(PageFailure {
                        file: record.path.clone(),
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        self.archive_deleted(remote, &commit.files, &mut baseline, &mut report)?;

        let changed =
            !report.created.is_empty() || !report.updated.is_empty() || !report.archived.is_empty();
        if changed {
            refresh_edit_times(remote, &touched, &mut baseline);
            baseline.last_sync = Some(Utc::now());
            self.store.save_baseline(&baseline)?;
        }

        tracing::info!(
            created = report.created.len(),
            updated = report.updated.len(),
            archived = report.archived.len(),
            unchanged = report.unchanged,
            failed = report.failures.len(),
            "push finished"
        );
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn push_page(
        &self,
        remote: &dyn RemoteClient,
        target: &RemoteTarget,
        table: &mut PageTable,
        idx: PageIdx,
        parsed: &ParsedPage,
        hash: &str,
        baseline: &mut SyncBaseline,
        report: &mut PushReport,
    ) -> Result<Pushed, SyncError> {
        let record = table.get(idx).clone();
        let parent_id = record.parent.and_then(|p| table.get(p).remote_id.clone());
        let remote_error = |e: RemoteError| SyncError::remote(&record.path, e);

        let mut entry = BaselineEntry {
            hash: None,
            remote_id: String::new(),
            parent_id: parent_id.clone(),
            depth: record.depth,
            flattened: record.flattened,
            title: record.title.clone(),
            last_edited_at: None,
        };

        let (page_id, pushed) = match &record.remote_id {
            Some(id) => {
                clear_content(remote, id).map_err(remote_error)?;
                if let Some(known) = baseline.files.get(&record.path) {
                    entry.parent_id = known.parent_id.clone();
                }
                (id.clone(), Pushed::Updated)
            }
            None => {
                let parent = match (parent_id, target) {
                    (Some(id), _) => PageParent::Page(id),
                    (None, RemoteTarget::Page(root)) => PageParent::Page(root.clone()),
                    (None, RemoteTarget::Database(db)) => PageParent::Database(db.clone()),
                };
                let id = remote
                    .create_page(&parent, &record.title)
                    .map_err(remote_error)?;
                tracing::info!(file = %record.path, id = %id, "created page");
                table.get_mut(idx).remote_id = Some(id.clone());

                // Record the page before its content so a failed append is
                // retried against this page rather than creating another.
                entry.remote_id = id.clone();
                baseline.files.insert(record.path.clone(), entry.clone());
                self.store.save_baseline(baseline)?;
                (id, Pushed::Created)
            }
        };

        let mapped = map_page(&parsed.blocks);
        report.warnings.extend(mapped.warnings);
        for batch in partition_batches(mapped.blocks, self.options.batch_limit) {
            tracing::debug!(file = %record.path, blocks = batch.len(), "appending batch");
            remote
                .append_blocks(&page_id, &batch)
                .map_err(remote_error)?;
        }

        entry.remote_id = page_id;
        entry.hash = Some(hash.to_string());
        baseline.files.insert(record.path.clone(), entry);
        self.store.save_baseline(baseline)?;
        Ok(pushed)
    }

    /// Archives pages whose files were deleted in the commit. The root page
    /// is never archived.
    fn archive_deleted(
        &self,
        remote: &dyn RemoteClient,
        committed: &BTreeMap<String, String>,
        baseline: &mut SyncBaseline,
        report: &mut PushReport,
    ) -> Result<(), SyncError> {
        let deleted: Vec<(String, String)> = baseline
            .files
            .iter()
            .filter(|(path, _)| *path != ROOT_FILE && !committed.contains_key(*path))
            .map(|(path, entry)| (path.clone(), entry.remote_id.clone()))
            .collect();

        for (path, remote_id) in deleted {
            match remote.archive_page(&remote_id) {
                Ok(()) | Err(RemoteError::NotFound(_)) => {
                    tracing::info!(file = %path, "archived page");
                    baseline.files.remove(&path);
                    self.store.save_baseline(baseline)?;
                    report.archived.push(path);
                }
                Err(e) => report.failures.push(PageFailure {
                    file: path.clone(),
                    error: SyncError::remote(path, e),
                }),
            }
        }
        Ok(())
    }
}

/// Front matter title, else the recorded remote title, else the file name.
fn page_title(path: &str, parsed: &ParsedPage, baseline: &SyncBaseline) -> String {
    parsed
        .title
        .clone()
        .or_else(|| baseline.files.get(path).map(|entry| entry.title.clone()))
        .unwrap_or_else(|| title_from_file(path))
}

/// Deletes a page's content blocks, leaving its child pages in place.
fn clear_content(remote: &dyn RemoteClient, page_id: &str) -> Result<(), RemoteError> {
    let stale: Vec<String> = remote
        .list_direct_children(page_id)?
        .into_iter()
        .filter(|block| !block.kind.is_child_page_like())
        .filter_map(|block| block.id)
        .collect();
    for id in stale {
        remote.delete_block(&id)?;
    }
    Ok(())
}

/// Records the remote's edit time of every pushed page so later status
/// checks only report edits made after this push.
fn refresh_edit_times(remote: &dyn RemoteClient, touched: &[String], baseline: &mut SyncBaseline) {
    let mut seen = HashSet::new();
    for id in touched {
        if !seen.insert(id.as_str()) {
            continue;
        }
        let Some(entry) = baseline.files.values_mut().find(|e| &e.remote_id == id) else {
            continue;
        };
        match remote.page_metadata(id) {
            Ok(meta) => entry.last_edited_at = Some(meta.last_edited_at),
            Err(e) => tracing::warn!(id = %id, "could not read page metadata: {}", e),
        }
    }
}
