//! Search command for Thicket.
//!
//! Runs a query and prints ranked hits with highlighted snippets.

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::engine::SearchEngine;
use crate::search::SearchResult;
use crate::storage::BlobStore;

/// Options for the search command.
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Output as JSON.
    pub json: bool,
    /// Suppress output.
    pub quiet: bool,
    /// Maximum number of results (clamped to 25).
    pub limit: Option<usize>,
}

/// Output format for the search command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutput {
    /// Whether the search was successful.
    pub success: bool,
    /// The search query used.
    pub query: String,
    /// Number of results found.
    pub count: usize,
    /// The search results.
    pub results: Vec<SearchResultInfo>,
    /// Error message if search failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Simplified result info for output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultInfo {
    pub id: String,
    pub slug: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Relevance score.
    pub score: f32,
    /// Highlighted title, if the document has one.
    pub title_snippet: Option<String>,
    /// Highlighted summary, if the document has one.
    pub summary_snippet: Option<String>,
    /// Highlighted content excerpt, if the document has content.
    pub content_snippet: Option<String>,
}

impl From<SearchResult> for SearchResultInfo {
    fn from(result: SearchResult) -> Self {
        let document = result.hit.document;
        Self {
            id: document.id.into(),
            slug: document.slug,
            title: document.title,
            category: document.category,
            score: result.hit.score,
            title_snippet: result.snippets.title,
            summary_snippet: result.snippets.summary,
            content_snippet: result.snippets.content,
        }
    }
}

impl SearchOutput {
    /// Create a successful output.
    pub fn success(query: impl Into<String>, results: Vec<SearchResultInfo>) -> Self {
        let count = results.len();
        Self {
            success: true,
            query: query.into(),
            count,
            results,
            error: None,
        }
    }

    /// Create a failed output.
    pub fn failure(query: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            query: query.into(),
            count: 0,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// The search command implementation.
pub struct SearchCommand<S: BlobStore> {
    engine: SearchEngine<S>,
}

impl<S: BlobStore> SearchCommand<S> {
    /// Create a new search command.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            engine: SearchEngine::new(store, config),
        }
    }

    /// Run the search command with the given query.
    ///
    /// A blank query is not an error; it simply matches nothing.
    pub fn run(&mut self, query: &str, options: &SearchOptions) -> SearchOutput {
        let trimmed_query = query.trim();
        match self.engine.search_with_snippets(trimmed_query, options.limit) {
            Ok(results) => SearchOutput::success(
                trimmed_query,
                results.into_iter().map(SearchResultInfo::from).collect(),
            ),
            Err(e) => SearchOutput::failure(trimmed_query, e.to_string()),
        }
    }

    /// Format output based on options.
    pub fn format_output(&self, output: &SearchOutput, options: &SearchOptions) -> String {
        if options.quiet {
            return String::new();
        }

        if options.json {
            serde_json::to_string_pretty(output).unwrap_or_else(|_| "{}".to_string())
        } else {
            self.format_human_readable(output)
        }
    }

    /// Format output as human-readable text.
    fn format_human_readable(&self, output: &SearchOutput) -> String {
        if !output.success {
            return format!(
                "Search failed: {}\n",
                output.error.as_deref().unwrap_or("unknown error")
            );
        }

        if output.results.is_empty() {
            return format!("No documents found for query: \"{}\"\n", output.query);
        }

        let mut lines = Vec::new();
        lines.push(format!(
            "Found {} document(s) for query: \"{}\"\n",
            output.count, output.query
        ));

        for (i, result) in output.results.iter().enumerate() {
            lines.push(format!(
                "{}. {} (score: {:.2})",
                i + 1,
                result.title,
                result.score
            ));
            if let Some(snippet) = result
                .content_snippet
                .as_deref()
                .or(result.summary_snippet.as_deref())
            {
                lines.push(format!("   {}", snippet));
            }
            lines.push(format!("   ID: {} | Slug: {}", result.id, result.slug));
            lines.push(String::new());
        }

        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DocumentInput;
    use crate::storage::MemoryBlobStore;
    use std::sync::Arc;

    fn seeded_store() -> Arc<MemoryBlobStore> {
        let store = Arc::new(MemoryBlobStore::new());
        let mut engine = SearchEngine::new(Arc::clone(&store), Config::default());
        engine
            .upsert_many(vec![
                DocumentInput::new("1", "async-errors", "Error handling in async code")
                    .with_text("Always use the question mark operator in async functions."),
                DocumentInput::new("2", "mutex-deadlock", "Mutex deadlock")
                    .with_text("Avoid holding a mutex across await points.")
                    .with_category("pitfall"),
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_search_output_success() {
        let output = SearchOutput::success("q", Vec::new());
        assert!(output.success);
        assert_eq!(output.query, "q");
        assert_eq!(output.count, 0);
        assert!(output.error.is_none());
    }

    #[test]
    fn test_search_output_failure() {
        let output = SearchOutput::failure("query", "storage error");

        assert!(!output.success);
        assert_eq!(output.count, 0);
        assert!(output.results.is_empty());
        assert_eq!(output.error, Some("storage error".to_string()));
    }

    #[test]
    fn test_search_basic() {
        let mut cmd = SearchCommand::new(seeded_store(), Config::default());
        let output = cmd.run("deadlock", &SearchOptions::default());

        assert!(output.success);
        assert_eq!(output.results[0].id, "2");
        assert_eq!(output.results[0].category.as_deref(), Some("pitfall"));
        assert!(output.results[0]
            .title_snippet
            .as_deref()
            .unwrap()
            .contains("<mark>deadlock</mark>"));
    }

    #[test]
    fn test_search_blank_query_is_empty_success() {
        let mut cmd = SearchCommand::new(seeded_store(), Config::default());
        let output = cmd.run("   \n\t  ", &SearchOptions::default());

        assert!(output.success);
        assert!(output.results.is_empty());
    }

    #[test]
    fn test_search_with_limit() {
        let mut cmd = SearchCommand::new(seeded_store(), Config::default());
        let options = SearchOptions {
            limit: Some(1),
            ..Default::default()
        };

        let output = cmd.run("async mutex", &options);
        assert!(output.success);
        assert_eq!(output.count, 1);
    }

    #[test]
    fn test_search_corrupt_store_fails() {
        let store = MemoryBlobStore::with_blob(b"garbage".to_vec());
        let mut cmd = SearchCommand::new(store, Config::default());
        let output = cmd.run("anything", &SearchOptions::default());

        assert!(!output.success);
        assert!(output.error.unwrap().contains("serialization"));
    }

    #[test]
    fn test_format_human_readable() {
        let mut cmd = SearchCommand::new(seeded_store(), Config::default());
        let output = cmd.run("mutex", &SearchOptions::default());
        let text = cmd.format_output(&output, &SearchOptions::default());

        assert!(text.contains("Found 1 document(s)"));
        assert!(text.contains("<mark>mutex</mark>"));
        assert!(text.contains("Slug: mutex-deadlock"));

        let none = cmd.run("kubernetes", &SearchOptions::default());
        assert!(cmd
            .format_output(&none, &SearchOptions::default())
            .contains("No documents found"));
    }

    #[test]
    fn test_format_json_and_quiet() {
        let mut cmd = SearchCommand::new(seeded_store(), Config::default());
        let output = cmd.run("mutex", &SearchOptions::default());

        let json = SearchOptions {
            json: true,
            ..Default::default()
        };
        let parsed: serde_json::Value =
            serde_json::from_str(&cmd.format_output(&output, &json)).unwrap();
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["results"][0]["slug"], "mutex-deadlock");

        let quiet = SearchOptions {
            quiet: true,
            ..Default::default()
        };
        assert!(cmd.format_output(&output, &quiet).is_empty());
    }
}
