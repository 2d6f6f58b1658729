//! Index command for Thicket.
//!
//! Upserts documents read from a JSON file (one object or an array).

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::core::DocumentInput;
use crate::engine::SearchEngine;
use crate::error::{Result, ThicketError};
use crate::storage::BlobStore;
use crate::util::read_to_string_limited;

/// Options for the index command.
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the index command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexOutput {
    /// Whether indexing succeeded.
    pub success: bool,
    /// Number of documents upserted.
    pub count: usize,
    /// Ids of the upserted documents, in input order.
    pub ids: Vec<String>,
    /// Error message if indexing failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IndexOutput {
    /// Create a successful output.
    pub fn success(ids: Vec<String>) -> Self {
        Self {
            success: true,
            count: ids.len(),
            ids,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            count: 0,
            ids: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// A document file holds one document or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentBatch {
    Many(Vec<DocumentInput>),
    One(Box<DocumentInput>),
}

/// Parse a document file's contents.
pub fn parse_documents(text: &str) -> Result<Vec<DocumentInput>> {
    let batch: DocumentBatch = serde_json::from_str(text).map_err(|e| {
        ThicketError::serde(format!(
            "expected a document object or an array of documents: {}",
            e
        ))
    })?;
    Ok(match batch {
        DocumentBatch::Many(documents) => documents,
        DocumentBatch::One(document) => vec![*document],
    })
}

/// The index command implementation.
pub struct IndexCommand<S: BlobStore> {
    engine: SearchEngine<S>,
}

impl<S: BlobStore> IndexCommand<S> {
    /// Create a new index command.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            engine: SearchEngine::new(store, config),
        }
    }

    /// Index every document in the file at `path`.
    pub fn run(&mut self, path: &Path) -> IndexOutput {
        match self.index_file(path) {
            Ok(ids) => IndexOutput::success(ids),
            Err(e) => IndexOutput::failure(e.to_string()),
        }
    }

    fn index_file(&mut self, path: &Path) -> Result<Vec<String>> {
        let text = read_to_string_limited(path)?;
        let documents = parse_documents(&text)?;
        let ids = self.engine.upsert_many(documents)?;
        self.engine.flush()?;
        Ok(ids.into_iter().map(String::from).collect())
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &IndexOutput, options: &IndexOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else if output.success {
            format!("Indexed {} document(s)\n", output.count)
        } else {
            format!(
                "Indexing failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
