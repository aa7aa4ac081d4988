use std::fs::{File, OpenOptions};
use std::path::Path;

use fs2::FileExt;

use super::StoreError;

const LOCK_FILE: &str = "LOCK";

/// Exclusive advisory lock on a workspace's state directory, released on
/// drop.
#[derive(Debug)]
pub struct StoreLock {
    _file: File,
}

impl StoreLock {
    /// Takes the lock without blocking; fails with [`StoreError::Locked`]
    /// if another handle holds it.
    pub fn acquire(state_dir: &Path) -> Result<Self, StoreError> {
        let path = state_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::io(&path, e))?;

        if file.try_lock_exclusive().is_err() {
            return Err(StoreError::Locked(path));
        }
        tracing::debug!(path = %path.display(), "acquired workspace lock");
        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_second_lock_is_refused_until_release() {
        let temp = TempDir::new().unwrap();
        let first = StoreLock::acquire(temp.path()).unwrap();
        assert!(matches!(
            StoreLock::acquire(temp.path()),
            Err(StoreError::Locked(_))
        ));
        drop(first);
        assert!(StoreLock::acquire(temp.path()).is_ok());
    }
}
