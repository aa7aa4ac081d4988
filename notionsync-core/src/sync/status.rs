use crate::hierarchy::ROOT_FILE;
use crate::remote::{RemoteClient, RemoteError};
use crate::store::{RemoteTarget, SyncBaseline};

use super::{RemoteDivergence, StatusReport, SyncError, Workspace};

impl Workspace {
    /// Working tree against the last commit, committed pages not yet
    /// pushed, and, when `remote` is given and the workspace was synced
    /// before, which pages changed remotely since. Nothing is written.
    pub fn status(&self, remote: Option<&dyn RemoteClient>) -> Result<StatusReport, SyncError> {
        let local = self.store.status()?;
        let baseline = match &self.options.target {
            Some(target) => self.baseline_for(target)?,
            None => self.store.load_baseline()?,
        };

        let mut unpushed = Vec::new();
        if let Some(commit) = self.store.last_commit()? {
            let database_mode = matches!(baseline.target, Some(RemoteTarget::Database(_)));
            for (path, hash) in &commit.files {
                if database_mode && path == ROOT_FILE {
                    continue;
                }
                let synced = baseline.files.get(path).and_then(|e| e.hash.as_ref());
                if synced != Some(hash) {
                    unpushed.push(path.clone());
                }
            }
        }

        let remote = match remote {
            Some(remote) if !baseline.is_empty() => Some(remote_divergence(remote, &baseline)),
            _ => None,
        };

        Ok(StatusReport {
            local,
            remote,
            unpushed,
        })
    }
}

/// Compares each synced page's remote edit time with the recorded one.
/// Only metadata is fetched.
fn remote_divergence(remote: &dyn RemoteClient, baseline: &SyncBaseline) -> RemoteDivergence {
    let mut divergence = RemoteDivergence::default();
    for (path, entry) in &baseline.files {
        match remote.page_metadata(&entry.remote_id) {
            Ok(meta) if meta.archived => divergence.missing.push(path.clone()),
            Ok(meta) => {
                let newer = entry
                    .last_edited_at
                    .map_or(true, |synced| meta.last_edited_at > synced);
                if newer {
                    divergence.changed.push(path.clone());
                }
            }
            Err(RemoteError::NotFound(_)) => divergence.missing.push(path.clone()),
            Err(e) => divergence.unreachable.push((path.clone(), e.to_string())),
        }
    }
    divergence
}
