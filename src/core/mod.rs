//! Core document types and normalization for Thicket.
//!
//! This module contains the document model handed to the upsert pipeline
//! and the normalizer that turns it into an indexable record.

pub mod document;
pub mod normalize;

pub use document::{ContentBody, DocumentId, DocumentInput, IndexedDocument, RichNode};
pub use normalize::{
    derive_summary, flatten_text, normalize_content, prepare_document, CONTENT_CEILING,
    SUMMARY_CEILING,
};
