//! Utility functions for Thicket.
//!
//! Character-aware truncation, HTML escaping, and size-limited file reads
//! shared by the normalizer, the highlighter, and the CLI.

use std::fs;
use std::path::Path;

use crate::error::{Result, ThicketError};

/// Maximum size of a document input file read by the CLI (10 MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Return the prefix of `text` holding at most `max_chars` characters.
///
/// Counts Unicode scalar values, never splits a character, and borrows
/// instead of allocating.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Escape the five HTML-significant characters `& < > " '`.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Read a file into a string with size limit protection.
///
/// Returns an error if the file exceeds `MAX_FILE_SIZE`.
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| ThicketError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(ThicketError::invalid_document(format!(
            "File {} is too large ({} bytes, max {} bytes)",
            path.display(),
            size,
            max_size
        )));
    }

    fs::read_to_string(path).map_err(|e| ThicketError::storage(path, e))
}
