use std::collections::BTreeMap;
use std::path::Path;

use crate::hierarchy::{KnownPage, ResolveOptions, DEFAULT_MAX_DEPTH, ROOT_FILE};
use crate::mapper::DEFAULT_BATCH_LIMIT;
use crate::store::{CommitRecord, RemoteTarget, Store, SyncBaseline};

use super::SyncError;

/// Message of the commit `init` records for a new `index.md`.
pub const INIT_COMMIT_MESSAGE: &str = "Initialize workspace";

/// Settings the sync operations need beyond the workspace itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub target: Option<RemoteTarget>,
    /// Top-level blocks per append request.
    pub batch_limit: usize,
    /// Deepest page nesting below the root.
    pub max_depth: usize,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            target: None,
            batch_limit: DEFAULT_BATCH_LIMIT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A workspace directory and its sync state.
///
/// `init`, `commit`, `push` and `pull` hold the workspace lock for their
/// whole duration; `status` and `log` only read.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub(super) store: Store,
    pub(super) options: SyncOptions,
}

impl Workspace {
    /// Creates the state directory and, if missing, an empty `index.md`.
    /// A freshly created `index.md` is committed when there are no commits
    /// yet, so a first pull may replace it. Running it again leaves
    /// existing state and files alone.
    pub fn init(root: &Path, options: SyncOptions) -> Result<Self, SyncError> {
        let store = Store::init(root)?;
        let _lock = store.lock()?;

        if store.working_hash(ROOT_FILE)?.is_none() {
            store.write_working(ROOT_FILE, b"")?;
            tracing::info!("created {}", ROOT_FILE);
            if store.last_commit()?.is_none() {
                let hash = store.objects().put(b"")?;
                let files = BTreeMap::from([(ROOT_FILE.to_string(), hash)]);
                store.record_commit(INIT_COMMIT_MESSAGE, files)?;
            }
        }
        tracing::info!(root = %root.display(), "initialized workspace");
        Ok(Self { store, options })
    }

    pub fn open(root: &Path, options: SyncOptions) -> Result<Self, SyncError> {
        let store = Store::open(root)?;
        Ok(Self { store, options })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn commit(&self, message: &str) -> Result<Option<CommitRecord>, SyncError> {
        let _lock = self.store.lock()?;
        Ok(self.store.commit(message)?)
    }

    /// Commits, most recent first.
    pub fn log(&self) -> Result<Vec<CommitRecord>, SyncError> {
        Ok(self.store.log()?)
    }

    pub(super) fn target(&self) -> Result<&RemoteTarget, SyncError> {
        self.options.target.as_ref().ok_or(SyncError::NoRemoteTarget)
    }

    /// The baseline for `target`. A baseline recorded against another
    /// target does not describe this one and is started over.
    pub(super) fn baseline_for(&self, target: &RemoteTarget) -> Result<SyncBaseline, SyncError> {
        let mut baseline = self.store.load_baseline()?;
        if baseline.target.as_ref().is_some_and(|t| t != target) {
            tracing::warn!(
                previous = ?baseline.target,
                current = ?target,
                "remote target changed; starting from an empty baseline"
            );
            baseline = SyncBaseline::default();
        }
        baseline.target = Some(target.clone());
        Ok(baseline)
    }

    pub(super) fn resolve_options(&self, target: &RemoteTarget) -> ResolveOptions {
        ResolveOptions {
            root_page_id: target.root_page_id().map(str::to_string),
            max_depth: self.options.max_depth,
        }
    }
}

/// Baseline entries in the form the hierarchy resolver takes, with parents
/// as paths.
pub(super) fn known_pages(
    baseline: &SyncBaseline,
    target: &RemoteTarget,
) -> BTreeMap<String, KnownPage> {
    baseline
        .files
        .iter()
        .map(|(path, entry)| {
            let parent = entry.parent_id.as_deref().and_then(|parent_id| {
                baseline.path_of(parent_id).map(str::to_string).or_else(|| {
                    (target.root_page_id() == Some(parent_id)).then(|| ROOT_FILE.to_string())
                })
            });
            let known = KnownPage {
                remote_id: entry.remote_id.clone(),
                parent,
                title: entry.title.clone(),
                depth: entry.depth,
                flattened: entry.flattened,
            };
            (path.clone(), known)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BaselineEntry;
    use tempfile::TempDir;

    #[test]
    fn test_init_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::init(temp.path(), SyncOptions::default()).unwrap();
        assert!(temp.path().join(ROOT_FILE).exists());

        assert_eq!(workspace.log().unwrap()[0].message, INIT_COMMIT_MESSAGE);
        assert!(workspace.store().status().unwrap().is_clean());

        std::fs::write(temp.path().join(ROOT_FILE), "# Home\n").unwrap();
        workspace.commit("first").unwrap();
        Workspace::init(temp.path(), SyncOptions::default()).unwrap();

        assert_eq!(
            std::fs::read_to_string(temp.path().join(ROOT_FILE)).unwrap(),
            "# Home\n"
        );
        assert_eq!(workspace.log().unwrap().len(), 2);
    }

    #[test]
    fn test_open_uninitialized() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Workspace::open(temp.path(), SyncOptions::default()),
            Err(SyncError::NotInitialized(_))
        ));
    }

    #[test]
    fn test_commit_while_locked() {
        let temp = TempDir::new().unwrap();
        let workspace = Workspace::init(temp.path(), SyncOptions::default()).unwrap();
        let _held = workspace.store().lock().unwrap();
        assert!(matches!(
            workspace.commit("blocked"),
            Err(SyncError::Locked(_))
        ));
    }

    #[test]
    fn test_known_pages_resolve_parent_paths() {
        let target = RemoteTarget::Page("root".to_string());
        let mut baseline = SyncBaseline::default();
        let entry = |id: &str, parent: Option<&str>, depth| BaselineEntry {
            hash: None,
            remote_id: id.to_string(),
            parent_id: parent.map(str::to_string),
            depth,
            flattened: false,
            title: id.to_string(),
            last_edited_at: None,
        };
        baseline
            .files
            .insert("A.md".to_string(), entry("a", Some("root"), 1));
        baseline
            .files
            .insert("B.md".to_string(), entry("b", Some("a"), 2));

        let known = known_pages(&baseline, &target);
        assert_eq!(known["A.md"].parent.as_deref(), Some(ROOT_FILE));
        assert_eq!(known["B.md"].parent.as_deref(), Some("A.md"));
    }
}
