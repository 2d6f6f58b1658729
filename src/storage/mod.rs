//! Durable storage for the serialized index.
//!
//! This module provides the `BlobStore` abstraction the index is loaded from
//! and persisted to, with file-based and in-memory backends.

pub mod file;
pub mod memory;
pub mod traits;

pub use file::FileBlobStore;
pub use memory::MemoryBlobStore;
pub use traits::BlobStore;
