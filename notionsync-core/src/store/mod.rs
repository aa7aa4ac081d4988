//! Local version store.
//!
//! Everything lives in `.notionsync/` inside the workspace:
//!
//! ```text
//! <workspace>/.notionsync/
//! ├─ LOCK            # advisory lock held by mutating commands
//! ├─ commits.json    # append-only commit log
//! ├─ baseline.json   # what the last push/pull agreed with the remote
//! └─ objects/        # committed file contents, by sha256
//! ```
//!
//! State files are replaced atomically. A state file that cannot be read
//! back is reported as [`StoreError::Corrupt`] before anything is written.

mod atomic;
mod baseline;
mod commit;
mod error;
mod hash;
mod lock;
mod objects;

pub use atomic::write_atomic;
pub use baseline::{BaselineEntry, RemoteTarget, SyncBaseline};
pub use commit::{compute_status, CommitRecord, Status};
pub use error::StoreError;
pub use hash::content_hash;
pub use lock::StoreLock;
pub use objects::ObjectStore;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::hierarchy::is_markdown_file;

/// Name of the state directory inside a workspace.
pub const STATE_DIR: &str = ".notionsync";

const COMMITS_FILE: &str = "commits.json";
const BASELINE_FILE: &str = "baseline.json";
const OBJECTS_DIR: &str = "objects";

#[derive(Debug, Clone)]
pub struct Store {
    root: PathBuf,
    state_dir: PathBuf,
    objects: ObjectStore,
}

impl Store {
    fn at(root: &Path) -> Self {
        let state_dir = root.join(STATE_DIR);
        let objects = ObjectStore::new(state_dir.join(OBJECTS_DIR));
        Self {
            root: root.to_path_buf(),
            state_dir,
            objects,
        }
    }

    /// Creates the state directory if missing. Existing state is kept.
    pub fn init(root: &Path) -> Result<Self, StoreError> {
        let store = Self::at(root);
        let objects_dir = store.state_dir.join(OBJECTS_DIR);
        fs::create_dir_all(&objects_dir).map_err(|e| StoreError::io(&objects_dir, e))?;

        let commits = store.commits_path();
        if !commits.exists() {
            store.write_json(&commits, &Vec::<CommitRecord>::new())?;
        }
        let baseline = store.baseline_path();
        if !baseline.exists() {
            store.write_json(&baseline, &SyncBaseline::default())?;
        }
        Ok(store)
    }

    /// Opens an initialized workspace.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let store = Self::at(root);
        if !store.state_dir.is_dir() {
            return Err(StoreError::NotInitialized(store.state_dir));
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    pub fn lock(&self) -> Result<StoreLock, StoreError> {
        StoreLock::acquire(&self.state_dir)
    }

    fn commits_path(&self) -> PathBuf {
        self.state_dir.join(COMMITS_FILE)
    }

    fn baseline_path(&self) -> PathBuf {
        self.state_dir.join(BASELINE_FILE)
    }

    fn read_json<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(T::default()),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| StoreError::corrupt(path, e))
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), StoreError> {
        let mut bytes = serde_json::to_vec_pretty(value).map_err(|e| StoreError::corrupt(path, e))?;
        bytes.push(b'\n');
        write_atomic(path, &bytes).map_err(|e| StoreError::io(path, e))
    }

    // --- working set ---

    /// Top-level Markdown files of the workspace, sorted. Hidden files are
    /// skipped.
    pub fn working_files(&self) -> Result<Vec<String>, StoreError> {
        let entries = fs::read_dir(&self.root).map_err(|e| StoreError::io(&self.root, e))?;
        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.root, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') || !is_markdown_file(&name) {
                continue;
            }
            let is_file = entry
                .file_type()
                .map_err(|e| StoreError::io(entry.path(), e))?
                .is_file();
            if is_file {
                files.push(name);
            }
        }
        files.sort();
        Ok(files)
    }

    /// Current content hash of every working file.
    pub fn working_hashes(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let mut hashes = BTreeMap::new();
        for name in self.working_files()? {
            let bytes = self.read_working(&name)?;
            hashes.insert(name, content_hash(&bytes));
        }
        Ok(hashes)
    }

    pub fn read_working(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.root.join(name);
        fs::read(&path).map_err(|e| StoreError::io(path, e))
    }

    /// Hash of a working file, `None` if it does not exist.
    pub fn working_hash(&self, name: &str) -> Result<Option<String>, StoreError> {
        let path = self.root.join(name);
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(content_hash(&bytes))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    pub fn write_working(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.root.join(name);
        write_atomic(&path, bytes).map_err(|e| StoreError::io(path, e))
    }

    pub fn remove_working(&self, name: &str) -> Result<(), StoreError> {
        let path = self.root.join(name);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    // --- commits ---

    /// Every commit, oldest first.
    fn load_commits(&self) -> Result<Vec<CommitRecord>, StoreError> {
        self.read_json(&self.commits_path())
    }

    /// Commits, most recent first.
    pub fn log(&self) -> Result<Vec<CommitRecord>, StoreError> {
        let mut commits = self.load_commits()?;
        commits.reverse();
        Ok(commits)
    }

    pub fn last_commit(&self) -> Result<Option<CommitRecord>, StoreError> {
        Ok(self.load_commits()?.pop())
    }

    pub fn status(&self) -> Result<Status, StoreError> {
        let working = self.working_hashes()?;
        let last = self.last_commit()?;
        Ok(compute_status(&working, last.as_ref()))
    }

    /// Snapshots the working set. Returns `None` when nothing changed since
    /// the last commit.
    pub fn commit(&self, message: &str) -> Result<Option<CommitRecord>, StoreError> {
        let commits = self.load_commits()?;
        let mut contents = Vec::new();
        let mut files = BTreeMap::new();
        for name in self.working_files()? {
            let bytes = self.read_working(&name)?;
            files.insert(name, content_hash(&bytes));
            contents.push(bytes);
        }
        if is_unchanged(&commits, &files) {
            tracing::debug!("nothing to commit");
            return Ok(None);
        }
        for bytes in &contents {
            self.objects.put(bytes)?;
        }
        self.append_commit(commits, message, files)
    }

    /// Appends a commit with the given mapping, unless it equals the last
    /// commit's. Every hash must already be in the object store.
    pub fn record_commit(
        &self,
        message: &str,
        files: BTreeMap<String, String>,
    ) -> Result<Option<CommitRecord>, StoreError> {
        let commits = self.load_commits()?;
        self.append_commit(commits, message, files)
    }

    fn append_commit(
        &self,
        mut commits: Vec<CommitRecord>,
        message: &str,
        files: BTreeMap<String, String>,
    ) -> Result<Option<CommitRecord>, StoreError> {
        if is_unchanged(&commits, &files) {
            tracing::debug!("nothing to commit");
            return Ok(None);
        }

        let record = CommitRecord::new(message, files);
        commits.push(record.clone());
        self.write_json(&self.commits_path(), &commits)?;
        tracing::info!(id = %record.id, files = record.files.len(), "recorded commit");
        Ok(Some(record))
    }

    /// Committed content of a file.
    pub fn read_object(&self, hash: &str) -> Result<Vec<u8>, StoreError> {
        self.objects.get(hash)
    }

    // --- baseline ---

    pub fn load_baseline(&self) -> Result<SyncBaseline, StoreError> {
        self.read_json(&self.baseline_path())
    }

    pub fn save_baseline(&self, baseline: &SyncBaseline) -> Result<(), StoreError> {
        self.write_json(&self.baseline_path(), baseline)
    }
}

/// Whether `files` would record the same snapshot as the last commit.
fn is_unchanged(commits: &[CommitRecord], files: &BTreeMap<String, String>) -> bool {
    match commits.last() {
        Some(last) => &last.files == files,
        None => files.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> (Store, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = Store::init(temp.path()).unwrap();
        (store, temp)
    }

    fn write(temp: &TempDir, name: &str, content: &str) {
        fs::write(temp.path().join(name), content).unwrap();
    }

    #[test]
    fn test_open_requires_init() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            Store::open(temp.path()),
            Err(StoreError::NotInitialized(_))
        ));
        Store::init(temp.path()).unwrap();
        assert!(Store::open(temp.path()).is_ok());
    }

    #[test]
    fn test_working_set_is_top_level_markdown() {
        let (store, temp) = workspace();
        write(&temp, "index.md", "# Home\n");
        write(&temp, "notes.txt", "ignored");
        write(&temp, ".hidden.md", "ignored");
        fs::create_dir(temp.path().join("sub")).unwrap();
        fs::write(temp.path().join("sub").join("Deep.md"), "ignored").unwrap();
        assert_eq!(store.working_files().unwrap(), vec!["index.md"]);
    }

    #[test]
    fn test_status_scenario() {
        let (store, temp) = workspace();
        write(&temp, "A.md", "a");
        write(&temp, "B.md", "b");
        store.commit("first").unwrap().unwrap();

        write(&temp, "A.md", "a changed");
        fs::remove_file(temp.path().join("B.md")).unwrap();
        write(&temp, "C.md", "c");

        let status = store.status().unwrap();
        assert_eq!(status.modified, vec!["A.md"]);
        assert_eq!(status.deleted, vec!["B.md"]);
        assert_eq!(status.added, vec!["C.md"]);
    }

    #[test]
    fn test_commits_are_monotonic() {
        let (store, temp) = workspace();
        for i in 0..3 {
            write(&temp, "index.md", &format!("version {i}\n"));
            store.commit(&format!("commit {i}")).unwrap().unwrap();
        }
        assert!(store.commit("no change").unwrap().is_none());

        let log = store.log().unwrap();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].message, "commit 2");
        assert_eq!(log[2].message, "commit 0");
        assert!(store.status().unwrap().is_clean());
    }

    #[test]
    fn test_deleted_files_leave_next_commit() {
        let (store, temp) = workspace();
        write(&temp, "A.md", "a");
        write(&temp, "B.md", "b");
        store.commit("both").unwrap();
        fs::remove_file(temp.path().join("B.md")).unwrap();
        let record = store.commit("drop B").unwrap().unwrap();
        assert_eq!(record.files.keys().collect::<Vec<_>>(), vec!["A.md"]);
        let content = store.read_object(&record.files["A.md"]).unwrap();
        assert_eq!(content, b"a");
    }

    #[test]
    fn test_noop_commit_writes_no_objects() {
        let (store, temp) = workspace();
        write(&temp, "index.md", "home\n");
        let record = store.commit("first").unwrap().unwrap();
        let hash = record.files["index.md"].clone();

        let objects_dir = temp.path().join(STATE_DIR).join(OBJECTS_DIR);
        for entry in fs::read_dir(&objects_dir).unwrap() {
            let path = entry.unwrap().path();
            if path.is_dir() {
                fs::remove_dir_all(path).unwrap();
            } else {
                fs::remove_file(path).unwrap();
            }
        }

        assert!(store.commit("again").unwrap().is_none());
        assert!(!store.objects().contains(&hash));
        assert_eq!(fs::read_dir(&objects_dir).unwrap().count(), 0);

        write(&temp, "index.md", "home, edited\n");
        let record = store.commit("edit").unwrap().unwrap();
        assert!(store.objects().contains(&record.files["index.md"]));
    }

    #[test]
    fn test_empty_workspace_commit_is_noop() {
        let (store, _temp) = workspace();
        assert!(store.commit("empty").unwrap().is_none());
        assert!(store.log().unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_state_is_reported() {
        let (store, temp) = workspace();
        fs::write(
            temp.path().join(STATE_DIR).join(COMMITS_FILE),
            "{not json",
        )
        .unwrap();
        assert!(matches!(store.log(), Err(StoreError::Corrupt { .. })));
        write(&temp, "A.md", "a");
        assert!(matches!(
            store.commit("x"),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_baseline_round_trip() {
        let (store, _temp) = workspace();
        assert!(store.load_baseline().unwrap().is_empty());
        let mut baseline = SyncBaseline {
            target: Some(RemoteTarget::Page("root".to_string())),
            ..SyncBaseline::default()
        };
        baseline.files.insert(
            "index.md".to_string(),
            BaselineEntry {
                hash: Some("h".to_string()),
                remote_id: "root".to_string(),
                parent_id: None,
                depth: 0,
                flattened: false,
                title: "Home".to_string(),
                last_edited_at: None,
            },
        );
        store.save_baseline(&baseline).unwrap();
        assert_eq!(store.load_baseline().unwrap(), baseline);
    }

    #[test]
    fn test_init_keeps_existing_state() {
        let (store, temp) = workspace();
        write(&temp, "A.md", "a");
        store.commit("keep").unwrap();
        let again = Store::init(temp.path()).unwrap();
        assert_eq!(again.log().unwrap().len(), 1);
    }
}
