//! File-based blob storage.
//!
//! The index blob is stored as a single file, by default
//! `~/.thicket/index.json` or `$THICKET_HOME/index.json`.
//! Atomic writes are achieved via temp file + rename, so a crash mid-write
//! leaves the previously persisted blob intact. Each write gets its own temp
//! file, so overlapping saves from separate handles all succeed and the last
//! rename wins.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::config::Config;
use crate::error::{Result, ThicketError};
use crate::storage::BlobStore;

/// File-based blob store.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    /// Path of the blob file.
    path: PathBuf,
}

impl FileBlobStore {
    /// Create a store for the index path configured in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = config.index_path().ok_or_else(|| {
            ThicketError::config("Could not determine index path (no home directory)")
        })?;
        Self::with_path(path)
    }

    /// Create a store at a specific file path.
    ///
    /// Creates the parent directory if it doesn't exist.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| ThicketError::storage(parent, e))?;
            }
        }

        Ok(Self { path })
    }

    /// Path of the blob file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory holding the blob file and its temp files.
    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    /// Create a uniquely named hidden temp file next to the blob.
    fn temp_file(&self) -> Result<NamedTempFile> {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "index".to_string());
        let dir = self.dir();
        tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| ThicketError::storage(dir, e))
    }
}

impl BlobStore for FileBlobStore {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ThicketError::storage(&self.path, e)),
        }
    }

    fn save(&self, bytes: &[u8]) -> Result<()> {
        let mut temp = self.temp_file()?;
        temp.write_all(bytes)
            .map_err(|e| ThicketError::storage(temp.path(), e))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| ThicketError::storage(temp.path(), e))?;

        // Rename temp file to final path (atomic on POSIX)
        temp.persist(&self.path)
            .map_err(|e| ThicketError::storage(&self.path, e.error))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::traits::tests::test_blob_store_roundtrip;
    use tempfile::TempDir;

    fn create_test_store() -> (FileBlobStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileBlobStore::with_path(dir.path().join("index.json")).unwrap();
        (store, dir)
    }

    #[test]
    fn test_file_blob_store_roundtrip() {
        let (store, _dir) = create_test_store();
        test_blob_store_roundtrip(&store);
    }

    #[test]
    fn test_with_path_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b").join("index.json");

        let _store = FileBlobStore::with_path(&nested).unwrap();

        assert!(nested.parent().unwrap().is_dir());
        assert!(!nested.exists());
    }

    #[test]
    fn test_load_missing_is_none() {
        let (store, _dir) = create_test_store();
        assert!(store.load().unwrap().is_none());
    }

    fn dir_entries(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_temp_file_cleaned_up() {
        let (store, dir) = create_test_store();
        store.save(b"{}").unwrap();
        store.save(b"{\"again\":true}").unwrap();

        assert_eq!(dir_entries(&dir), vec!["index.json".to_string()]);
    }

    #[test]
    fn test_temp_file_is_hidden_sibling() {
        let (store, dir) = create_test_store();
        let temp = store.temp_file().unwrap();

        assert_eq!(temp.path().parent(), Some(dir.path()));
        let name = temp.path().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(".index.json."), "{}", name);
        assert!(name.ends_with(".tmp"), "{}", name);
    }

    #[test]
    fn test_temp_files_are_unique_per_write() {
        let (store, _dir) = create_test_store();
        let first = store.temp_file().unwrap();
        let second = store.temp_file().unwrap();
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn test_stale_temp_file_does_not_affect_load() {
        let (store, dir) = create_test_store();
        store.save(b"committed").unwrap();

        // Simulate a crash between temp write and rename
        fs::write(dir.path().join(".index.json.crashed.tmp"), b"half-written").unwrap();

        assert_eq!(store.load().unwrap().as_deref(), Some(&b"committed"[..]));
    }

    #[test]
    fn test_concurrent_saves_all_succeed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("index.json");
        let payloads: Vec<Vec<u8>> = (0..4u8).map(|i| vec![b'a' + i; 256 * 1024]).collect();

        for _ in 0..10 {
            std::thread::scope(|scope| {
                let handles: Vec<_> = payloads
                    .iter()
                    .map(|payload| {
                        let store = FileBlobStore::with_path(&path).unwrap();
                        scope.spawn(move || store.save(payload).map_err(|e| e.to_string()))
                    })
                    .collect();
                for handle in handles {
                    handle.join().unwrap().unwrap();
                }
            });

            let stored = FileBlobStore::with_path(&path).unwrap().load().unwrap().unwrap();
            assert!(payloads.contains(&stored), "blob is not one of the writes");
        }

        assert_eq!(dir_entries(&dir), vec!["index.json".to_string()]);
    }

    #[test]
    fn test_load_error_propagates() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be: read fails with something
        // other than NotFound.
        let path = dir.path().join("index.json");
        fs::create_dir_all(&path).unwrap();
        let store = FileBlobStore::with_path(&path).unwrap();

        assert!(matches!(store.load(), Err(ThicketError::Storage { .. })));
    }
}
