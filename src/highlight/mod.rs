//! Snippet and highlight engine.
//!
//! Pure, synchronous functions with no shared state: safe to run per hit and
//! per field in any order or in parallel.
//!
//! # Usage
//!
//! ```
//! use thicket::highlight::build_snippet;
//!
//! let snippet = build_snippet("unbelievable results", &["believ"], "");
//! assert_eq!(snippet.as_deref(), Some("<mark>unbelievable</mark> results"));
//! ```

pub mod distance;
pub mod snippet;

pub use distance::{bounded_levenshtein, DistanceBuffers};
pub use snippet::{
    build_snippet, CONTEXT_RADIUS, FUZZY_MAX_DISTANCE, MARK_CLOSE, MARK_OPEN, SCAN_LIMIT,
    SNIPPET_CEILING,
};
