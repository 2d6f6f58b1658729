//! Document normalization.
//!
//! Rich content is flattened to plain text, capped at [`CONTENT_CEILING`]
//! characters, and a summary is derived from the content when the caller
//! supplies none. The ceiling bounds what the index and the highlighter ever
//! have to look at.

use crate::core::document::{ContentBody, DocumentInput, IndexedDocument, RichNode};
use crate::error::Result;
use crate::util::truncate_chars;

/// Maximum number of characters of content that get indexed.
pub const CONTENT_CEILING: usize = 10_000;

/// Length of a summary derived from content.
pub const SUMMARY_CEILING: usize = 200;

/// Flatten a rich document tree into plain text.
///
/// Text leaves are collected depth-first, in document order, and joined with
/// single spaces. Nodes without text contribute nothing. `None` yields the
/// empty string.
pub fn flatten_text(root: Option<&RichNode>) -> String {
    let Some(root) = root else {
        return String::new();
    };

    let mut parts: Vec<&str> = Vec::new();
    // Explicit stack: editor trees from the database are not trusted to be shallow.
    let mut stack: Vec<&RichNode> = vec![root];
    while let Some(node) = stack.pop() {
        if let Some(text) = node.text.as_deref() {
            if !text.is_empty() {
                parts.push(text);
            }
        }
        stack.extend(node.children.iter().rev());
    }

    parts.join(" ")
}

/// Convert a content body to plain text and apply the content ceiling.
pub fn normalize_content(body: Option<&ContentBody>) -> String {
    let plain = match body {
        None => String::new(),
        Some(ContentBody::Plain(text)) => text.clone(),
        Some(ContentBody::Rich(root)) => flatten_text(Some(root)),
    };
    truncate_chars(&plain, CONTENT_CEILING).to_string()
}

/// Use the provided summary if it has content, else the head of `content`.
pub fn derive_summary(provided: Option<&str>, content: &str) -> String {
    match provided.map(str::trim) {
        Some(summary) if !summary.is_empty() => summary.to_string(),
        _ => truncate_chars(content, SUMMARY_CEILING).to_string(),
    }
}

/// Turn caller input into the record that goes into the index.
///
/// Fails only when the id cannot key the index.
pub fn prepare_document(input: DocumentInput) -> Result<IndexedDocument> {
    input.id.validate()?;

    let content = normalize_content(input.content.as_ref());
    let summary = derive_summary(input.summary.as_deref(), &content);

    Ok(IndexedDocument {
        id: input.id,
        slug: input.slug,
        title: input.title,
        summary,
        content,
        category: input.category,
    })
}
