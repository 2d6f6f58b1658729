//! In-memory blob storage.
//!
//! Thread-safe `BlobStore` for tests and for request-scoped use where
//! durability is not needed. Writes can be made to fail on demand to
//! exercise storage-failure paths.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{Result, ThicketError};
use crate::storage::BlobStore;

/// In-memory blob store.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blob: RwLock<Option<Vec<u8>>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryBlobStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `bytes`.
    pub fn with_blob(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            blob: RwLock::new(Some(bytes.into())),
            ..Self::default()
        }
    }

    /// Make subsequent saves fail (or succeed again).
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Drop the stored blob.
    pub fn clear(&self) {
        *self.blob.write().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

impl BlobStore for MemoryBlobStore {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        let blob = self.blob.read().unwrap_or_else(|e| e.into_inner());
        Ok(blob.clone())
    }

    fn save(&self, bytes: &[u8]) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(ThicketError::storage(
                "<memory>",
                io::Error::other("simulated write failure"),
            ));
        }
        *self.blob.write().unwrap_or_else(|e| e.into_inner()) = Some(bytes.to_vec());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
