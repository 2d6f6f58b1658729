//! Thicket - search indexing and snippet highlighting for site content.
//!
//! Thicket keeps a full-text index of documents (title, summary, content),
//! persists it as a single blob, and at query time returns ranked hits with
//! highlighted excerpts. Snippets locate an exact match first and fall back
//! to a cutoff-bounded fuzzy match.
//!
//! ```
//! use thicket::{Config, DocumentInput, MemoryBlobStore, SearchEngine};
//!
//! let mut engine = SearchEngine::new(MemoryBlobStore::new(), Config::default());
//! engine.upsert(DocumentInput::new(1u64, "hello", "Hello").with_text("the quick brown fox"))?;
//!
//! let results = engine.search_with_snippets("quick", None)?;
//! assert_eq!(
//!     results[0].snippets.content.as_deref(),
//!     Some("the <mark>quick</mark> brown fox")
//! );
//! # Ok::<(), thicket::ThicketError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod highlight;
pub mod search;
pub mod storage;
pub mod util;

pub use config::{Config, PersistMode};
pub use core::{ContentBody, DocumentId, DocumentInput, IndexedDocument, RichNode};
pub use engine::{SearchEngine, RESULT_LIMIT_MAX};
pub use error::{Result, ThicketError};
pub use highlight::build_snippet;
pub use search::{FieldSnippets, Hit, MatchInfo, Removal, SearchField, SearchResult};
pub use storage::{BlobStore, FileBlobStore, MemoryBlobStore};

// CLI commands
pub use cli::{DeleteCommand, IndexCommand, SearchCommand};
