//! Serialized index blob.
//!
//! The durable form of the index is a JSON snapshot of every live document.
//! The tantivy index itself only ever lives in RAM and is rebuilt on load.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::IndexedDocument;
use crate::error::{Result, ThicketError};

/// Current snapshot format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Persisted index state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub format_version: u32,
    /// Incremented on every persist.
    pub generation: u64,
    pub saved_at: DateTime<Utc>,
    pub documents: Vec<IndexedDocument>,
}

/// Just enough of a snapshot to check its generation without decoding
/// every document.
#[derive(Debug, Deserialize)]
struct SnapshotHeader {
    format_version: u32,
    generation: u64,
}

impl IndexSnapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(generation: u64, documents: Vec<IndexedDocument>) -> Self {
        Self {
            format_version: SNAPSHOT_FORMAT_VERSION,
            generation,
            saved_at: Utc::now(),
            documents,
        }
    }

    /// Serialize to blob bytes.
    pub fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| ThicketError::serde(format!("encode snapshot: {}", e)))
    }

    /// Deserialize from blob bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let snapshot: IndexSnapshot = serde_json::from_slice(bytes)
            .map_err(|e| ThicketError::serde(format!("decode snapshot: {}", e)))?;
        check_version(snapshot.format_version)?;
        Ok(snapshot)
    }

    /// Read only the generation of a stored blob.
    pub fn peek_generation(bytes: &[u8]) -> Result<u64> {
        let header: SnapshotHeader = serde_json::from_slice(bytes)
            .map_err(|e| ThicketError::serde(format!("decode snapshot header: {}", e)))?;
        check_version(header.format_version)?;
        Ok(header.generation)
    }
}

fn check_version(version: u32) -> Result<()> {
    if version != SNAPSHOT_FORMAT_VERSION {
        return Err(ThicketError::serde(format!(
            "unsupported snapshot format version {} (expected {})",
            version, SNAPSHOT_FORMAT_VERSION
        )));
    }
    Ok(())
}
