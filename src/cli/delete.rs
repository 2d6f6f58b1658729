//! Delete command for Thicket.
//!
//! Removes a document by id. Deleting an id that is not indexed succeeds.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::SearchEngine;
use crate::error::Result;
use crate::storage::BlobStore;

/// Options for the delete command.
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
}

/// Output format for the delete command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteOutput {
    /// Whether the delete succeeded.
    pub success: bool,
    /// The id that was deleted.
    pub id: String,
    /// Error message if the delete failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DeleteOutput {
    /// Create a successful output.
    pub fn success(id: impl Into<String>) -> Self {
        Self {
            success: true,
            id: id.into(),
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            id: id.into(),
            error: Some(error.into()),
        }
    }
}

/// The delete command implementation.
pub struct DeleteCommand<S: BlobStore> {
    engine: SearchEngine<S>,
}

impl<S: BlobStore> DeleteCommand<S> {
    /// Create a new delete command.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            engine: SearchEngine::new(store, config),
        }
    }

    /// Delete the document with `id`.
    pub fn run(&mut self, id: &str) -> DeleteOutput {
        match self.delete(id) {
            Ok(()) => DeleteOutput::success(id),
            Err(e) => DeleteOutput::failure(id, e.to_string()),
        }
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.engine.delete(id)?;
        self.engine.flush()
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &DeleteOutput, options: &DeleteOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else if output.success {
            format!("Deleted {}\n", output.id)
        } else {
            format!(
                "Delete failed for {}: {}\n",
                output.id,
                output.error.as_deref().unwrap_or("unknown error")
            )
        }
    }
}
