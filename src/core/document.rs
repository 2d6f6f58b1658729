//! Document types for Thicket.
//!
//! `DocumentInput` is what callers hand to the upsert pipeline: rich content
//! straight from the content store. `IndexedDocument` is the normalized
//! record that actually lives in the index and in the persisted snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ThicketError};

/// Stable document identifier.
///
/// Accepts either a string or an integer on input; integers are coerced to
/// their decimal string form so that `42` and `"42"` address the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "RawDocumentId")]
pub struct DocumentId(String);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDocumentId {
    Text(String),
    Signed(i64),
    Unsigned(u64),
}

impl From<RawDocumentId> for DocumentId {
    fn from(raw: RawDocumentId) -> Self {
        match raw {
            RawDocumentId::Text(s) => Self(s),
            RawDocumentId::Signed(n) => Self(n.to_string()),
            RawDocumentId::Unsigned(n) => Self(n.to_string()),
        }
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.0
    }
}

impl DocumentId {
    /// Create an id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fail fast on ids that cannot key the index.
    pub fn validate(&self) -> Result<()> {
        if self.0.trim().is_empty() {
            return Err(ThicketError::invalid_document("document id must not be empty"));
        }
        Ok(())
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for DocumentId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node of a rich-text document tree.
///
/// Only `text` and `children` matter for indexing; `kind` is carried so that
/// editor JSON (`{"type": "paragraph", "content": [...]}`) deserializes
/// without loss.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RichNode {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, alias = "content", skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RichNode>,
}

impl RichNode {
    /// A leaf node holding text.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: Some(text.into()),
            children: Vec::new(),
        }
    }

    /// A container node with children.
    pub fn node(kind: impl Into<String>, children: Vec<RichNode>) -> Self {
        Self {
            kind: Some(kind.into()),
            text: None,
            children,
        }
    }
}

/// Body content as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentBody {
    /// Already-plain text.
    Plain(String),
    /// A rich document tree.
    Rich(RichNode),
}

/// A document as submitted to the upsert pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    pub id: DocumentId,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub content: Option<ContentBody>,
    #[serde(default)]
    pub category: Option<String>,
}

impl DocumentInput {
    /// Create an input with the required fields.
    pub fn new(id: impl Into<DocumentId>, slug: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            slug: slug.into(),
            title: title.into(),
            summary: None,
            content: None,
            category: None,
        }
    }

    /// Set the summary.
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Set plain-text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.content = Some(ContentBody::Plain(text.into()));
        self
    }

    /// Set rich content.
    pub fn with_rich(mut self, root: RichNode) -> Self {
        self.content = Some(ContentBody::Rich(root));
        self
    }

    /// Set the category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// A normalized document as stored in the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub id: DocumentId,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}
