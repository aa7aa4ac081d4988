use std::fs;
use std::io;
use std::path::PathBuf;

use super::atomic::write_atomic;
use super::hash::content_hash;
use super::StoreError;

/// Content-addressed file contents under `objects/<sha256>`.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    dir: PathBuf,
}

impl ObjectStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, hash: &str) -> PathBuf {
        self.dir.join(hash)
    }

    /// Stores `bytes` once and returns their hash.
    pub fn put(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let hash = content_hash(bytes);
        let path = self.path(&hash);
        if !path.exists() {
            write_atomic(&path, bytes).map_err(|e| StoreError::io(&path, e))?;
        }
        Ok(hash)
    }

    /// Reads an object back; a missing or altered object is corruption.
    pub fn get(&self, hash: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.path(hash);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::corrupt(path, "object is missing"))
            }
            Err(e) => return Err(StoreError::io(path, e)),
        };
        if content_hash(&bytes) != hash {
            return Err(StoreError::corrupt(path, "object content does not match its hash"));
        }
        Ok(bytes)
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.path(hash).exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_put_and_get() {
        let temp = TempDir::new().unwrap();
        let objects = ObjectStore::new(temp.path().to_path_buf());
        let hash = objects.put(b"# Title\n").unwrap();
        assert!(objects.contains(&hash));
        assert_eq!(objects.get(&hash).unwrap(), b"# Title\n");
        assert_eq!(objects.put(b"# Title\n").unwrap(), hash);
    }

    #[test]
    fn test_tampered_object_is_corrupt() {
        let temp = TempDir::new().unwrap();
        let objects = ObjectStore::new(temp.path().to_path_buf());
        let hash = objects.put(b"original").unwrap();
        fs::write(temp.path().join(&hash), b"changed").unwrap();
        assert!(matches!(objects.get(&hash), Err(StoreError::Corrupt { .. })));
        assert!(matches!(
            objects.get("0000"),
            Err(StoreError::Corrupt { .. })
        ));
    }
}
