//! Blob storage traits for Thicket.
//!
//! The index is persisted as one opaque blob. This module defines the
//! `BlobStore` trait that durable storage backends implement.

use std::sync::Arc;

use crate::error::Result;

/// Trait for durable index blob storage.
///
/// Implementations hold exactly one blob. Failures are returned to the
/// caller as-is; no retries happen at this layer.
pub trait BlobStore: Send + Sync {
    /// Load the stored blob.
    ///
    /// Returns `Ok(None)` if nothing has been saved yet.
    fn load(&self) -> Result<Option<Vec<u8>>>;

    /// Replace the stored blob.
    fn save(&self, bytes: &[u8]) -> Result<()>;

    /// Check whether a blob has been saved.
    fn exists(&self) -> Result<bool> {
        Ok(self.load()?.is_some())
    }
}

/// Blanket implementation of BlobStore for Arc-wrapped stores.
///
/// Lets several engines (or a test and an engine) share one store.
impl<T: BlobStore + ?Sized> BlobStore for Arc<T> {
    fn load(&self) -> Result<Option<Vec<u8>>> {
        (**self).load()
    }

    fn save(&self, bytes: &[u8]) -> Result<()> {
        (**self).save(bytes)
    }

    fn exists(&self) -> Result<bool> {
        (**self).exists()
    }
}
