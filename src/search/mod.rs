//! Full-text search over indexed documents.
//!
//! # Search Behavior
//!
//! `TantivyIndex::search()` runs a boosted BM25 query with fuzzy top-up:
//! - **Field boosts**: title > summary > content
//! - **Fuzzy top-up**: When few results are found, retries with typo tolerance
//! - **Match reporting**: Each hit carries the tokens it matched, per field
//!
//! The index is held in RAM. `IndexSnapshot` is its durable form.

pub mod hit;
pub mod snapshot;
pub mod tantivy_backend;

pub use hit::{FieldSnippets, Hit, MatchInfo, SearchField, SearchResult};
pub use snapshot::{IndexSnapshot, SNAPSHOT_FORMAT_VERSION};
pub use tantivy_backend::{Removal, TantivyIndex};
