//! Query result types.

use serde::Serialize;

use crate::core::IndexedDocument;

/// A searchable text field of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    Title,
    Summary,
    Content,
}

impl SearchField {
    /// All searchable fields, in snippet order.
    pub fn all() -> [SearchField; 3] {
        [SearchField::Title, SearchField::Summary, SearchField::Content]
    }

    /// Field name as used in the index schema.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Summary => "summary",
            SearchField::Content => "content",
        }
    }

    /// The field's text on a document.
    pub fn text<'a>(&self, document: &'a IndexedDocument) -> &'a str {
        match self {
            SearchField::Title => &document.title,
            SearchField::Summary => &document.summary,
            SearchField::Content => &document.content,
        }
    }
}

impl std::fmt::Display for SearchField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terms the index matched within one field of a hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchInfo {
    pub field: SearchField,
    /// Document tokens that matched, in order of first appearance.
    pub terms: Vec<String>,
}

/// A single query result.
#[derive(Debug, Clone, Serialize)]
pub struct Hit {
    pub document: IndexedDocument,
    /// Relevance score (higher is better).
    pub score: f32,
    /// Per-field matched terms. Fields without matches are absent.
    pub matches: Vec<MatchInfo>,
}

impl Hit {
    /// Matched terms for `field`, empty if the field had none.
    pub fn terms_for(&self, field: SearchField) -> &[String] {
        self.matches
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.terms.as_slice())
            .unwrap_or(&[])
    }
}

/// Highlighted excerpts for one hit. `None` means the field has no text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldSnippets {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub content: Option<String>,
}

impl FieldSnippets {
    /// Mutable slot for `field`.
    pub fn slot_mut(&mut self, field: SearchField) -> &mut Option<String> {
        match field {
            SearchField::Title => &mut self.title,
            SearchField::Summary => &mut self.summary,
            SearchField::Content => &mut self.content,
        }
    }
}

/// A hit annotated with per-field snippets.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub hit: Hit,
    pub snippets: FieldSnippets,
}
