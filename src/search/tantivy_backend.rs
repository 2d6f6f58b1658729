//! Tantivy-based inverted index for Thicket.
//!
//! Provides BM25 relevance scoring with per-field boosts and a fuzzy top-up
//! pass for typos. The index lives in RAM; durability is the caller's job
//! (see [`crate::search::IndexSnapshot`]).

use std::collections::HashSet;

use tantivy::collector::{Count, DocSetCollector, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, FuzzyTermQuery, Occur, Query, QueryParser, TermQuery};
use tantivy::schema::{
    Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, Value, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, RemoveLongFilter, SimpleTokenizer, TextAnalyzer, TokenStream};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};

use crate::config::{Config, SearchConfig, DEFAULT_WRITER_HEAP_BYTES, MAX_FUZZY_DISTANCE};
use crate::core::{DocumentId, IndexedDocument};
use crate::error::{Result, ThicketError};
use crate::highlight::{bounded_levenshtein, DistanceBuffers};
use crate::search::hit::{Hit, MatchInfo, SearchField};

/// Name the text analyzer is registered under.
const TOKENIZER_NAME: &str = "thicket_text";

/// Tokens longer than this (in bytes) are dropped by the analyzer.
const MAX_TOKEN_LEN: usize = 40;

/// Escape special characters in query strings to prevent query injection.
///
/// Tantivy's query parser supports special syntax (AND, OR, field:value, wildcards, etc.)
/// which could cause unexpected behavior if user input is passed directly.
/// This function escapes all special characters so they're treated as literals.
fn escape_query(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() * 2);
    for c in query.chars() {
        match c {
            '+' | '-' | '!' | '(' | ')' | '{' | '}' | '[' | ']' | '^' | '"' | '~' | '*' | '?'
            | ':' | '\\' | '/' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Edit budget for one query token.
///
/// Short tokens (<=4 chars) with edit distance 2 match too many unrelated
/// words, so they get at most 1.
fn term_edit_distance(token: &str, max: u8) -> u8 {
    if token.chars().count() <= 4 {
        max.min(1)
    } else {
        max
    }
}

/// Outcome of removing a document by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// An entry existed and was removed.
    Removed,
    /// No entry had this id.
    NotPresent,
}

impl Removal {
    /// Whether an entry with the id existed before the operation.
    pub fn was_present(self) -> bool {
        self == Removal::Removed
    }
}

#[derive(Debug, Clone, Copy)]
struct IndexFields {
    id: Field,
    slug: Field,
    title: Field,
    summary: Field,
    content: Field,
    category: Field,
}

impl IndexFields {
    fn text_field(&self, field: SearchField) -> Field {
        match field {
            SearchField::Title => self.title,
            SearchField::Summary => self.summary,
            SearchField::Content => self.content,
        }
    }
}

/// In-memory tantivy index of documents.
///
/// # Example
///
/// ```
/// use thicket::config::Config;
/// use thicket::core::{prepare_document, DocumentInput};
/// use thicket::search::TantivyIndex;
///
/// let index = TantivyIndex::in_memory(&Config::default())?;
/// let doc = prepare_document(DocumentInput::new("1", "hello", "Hello").with_text("hello world"))?;
/// index.insert(&doc)?;
/// assert_eq!(index.search("world", 10)?.len(), 1);
/// # Ok::<(), thicket::ThicketError>(())
/// ```
pub struct TantivyIndex {
    index: Index,
    reader: IndexReader,
    fields: IndexFields,
    analyzer: TextAnalyzer,
    settings: SearchConfig,
    writer_heap_bytes: usize,
}

impl TantivyIndex {
    /// Create a new, empty in-memory index.
    pub fn in_memory(config: &Config) -> Result<Self> {
        let (schema, fields) = Self::build_schema();
        let index = Index::create_in_ram(schema);

        let analyzer = Self::build_analyzer();
        index.tokenizers().register(TOKENIZER_NAME, analyzer.clone());

        // Mutations reload explicitly after commit, so reads never lag writes.
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| ThicketError::index("create reader", e))?;

        Ok(Self {
            index,
            reader,
            fields,
            analyzer,
            settings: config.search.clone(),
            writer_heap_bytes: config.index.writer_heap_bytes.max(DEFAULT_WRITER_HEAP_BYTES),
        })
    }

    /// Build an in-memory index holding `documents`.
    pub fn from_documents(config: &Config, documents: &[IndexedDocument]) -> Result<Self> {
        let index = Self::in_memory(config)?;
        if !documents.is_empty() {
            index.insert_many(documents)?;
        }
        Ok(index)
    }

    fn build_schema() -> (Schema, IndexFields) {
        let mut schema_builder = Schema::builder();

        // STRING = indexed without tokenization, which allows delete-by-id
        let id = schema_builder.add_text_field("id", STRING | STORED);
        let slug = schema_builder.add_text_field("slug", STORED);

        let text_options = TextOptions::default().set_stored().set_indexing_options(
            TextFieldIndexing::default()
                .set_tokenizer(TOKENIZER_NAME)
                .set_index_option(IndexRecordOption::WithFreqsAndPositions),
        );

        let title = schema_builder.add_text_field("title", text_options.clone());
        let summary = schema_builder.add_text_field("summary", text_options.clone());
        let content = schema_builder.add_text_field("content", text_options);
        let category = schema_builder.add_text_field("category", STRING | STORED);

        let fields = IndexFields {
            id,
            slug,
            title,
            summary,
            content,
            category,
        };
        (schema_builder.build(), fields)
    }

    fn build_analyzer() -> TextAnalyzer {
        TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(RemoveLongFilter::limit(MAX_TOKEN_LEN))
            .filter(LowerCaser)
            .build()
    }

    /// Run `apply` against a fresh writer, then commit and reload the reader.
    fn write<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut IndexWriter) -> Result<()>,
    {
        let mut writer: IndexWriter = self.index.writer(self.writer_heap_bytes).map_err(|e| {
            ThicketError::index(
                format!(
                    "allocate {}MB for index writer",
                    self.writer_heap_bytes / 1_000_000
                ),
                e,
            )
        })?;

        apply(&mut writer)?;

        writer
            .commit()
            .map_err(|e| ThicketError::index("commit", e))?;
        self.reader
            .reload()
            .map_err(|e| ThicketError::index("reload reader", e))?;
        Ok(())
    }

    fn tantivy_doc(&self, document: &IndexedDocument) -> TantivyDocument {
        let mut doc = TantivyDocument::new();
        doc.add_text(self.fields.id, document.id.as_str());
        doc.add_text(self.fields.slug, &document.slug);
        doc.add_text(self.fields.title, &document.title);
        doc.add_text(self.fields.summary, &document.summary);
        doc.add_text(self.fields.content, &document.content);
        if let Some(category) = &document.category {
            doc.add_text(self.fields.category, category);
        }
        doc
    }

    fn read_document(&self, doc: &TantivyDocument) -> Option<IndexedDocument> {
        let text = |field: Field| {
            doc.get_first(field)
                .and_then(|value| value.as_str().map(str::to_string))
        };
        Some(IndexedDocument {
            id: DocumentId::new(text(self.fields.id)?),
            slug: text(self.fields.slug).unwrap_or_default(),
            title: text(self.fields.title).unwrap_or_default(),
            summary: text(self.fields.summary).unwrap_or_default(),
            content: text(self.fields.content).unwrap_or_default(),
            category: text(self.fields.category),
        })
    }

    fn id_term(&self, id: &DocumentId) -> Term {
        Term::from_field_text(self.fields.id, id.as_str())
    }

    fn count_id(&self, searcher: &Searcher, id: &DocumentId) -> Result<usize> {
        let query = TermQuery::new(self.id_term(id), IndexRecordOption::Basic);
        searcher
            .search(&query, &Count)
            .map_err(|e| ThicketError::index("count by id", e))
    }

    /// Insert a document, replacing any entry with the same id.
    ///
    /// Returns whether a previous entry was replaced.
    pub fn insert(&self, document: &IndexedDocument) -> Result<Removal> {
        let replaced = self.insert_many(std::slice::from_ref(document))?;
        Ok(if replaced > 0 {
            Removal::Removed
        } else {
            Removal::NotPresent
        })
    }

    /// Insert a batch of documents in one commit (upsert behavior).
    ///
    /// Returns how many of them replaced an existing entry.
    pub fn insert_many(&self, documents: &[IndexedDocument]) -> Result<usize> {
        let searcher = self.reader.searcher();
        let mut replaced = 0;
        for document in documents {
            if self.count_id(&searcher, &document.id)? > 0 {
                replaced += 1;
            }
        }

        self.write(|writer| {
            for document in documents {
                writer.delete_term(self.id_term(&document.id));
                writer
                    .add_document(self.tantivy_doc(document))
                    .map_err(|e| ThicketError::index("add document", e))?;
            }
            Ok(())
        })?;

        Ok(replaced)
    }

    /// Remove the entry for `id`. A missing id is reported, not an error.
    pub fn remove(&self, id: &DocumentId) -> Result<Removal> {
        if !self.contains(id)? {
            return Ok(Removal::NotPresent);
        }
        self.write(|writer| {
            writer.delete_term(self.id_term(id));
            Ok(())
        })?;
        Ok(Removal::Removed)
    }

    /// Check whether an entry with `id` exists.
    pub fn contains(&self, id: &DocumentId) -> Result<bool> {
        Ok(self.count_id(&self.reader.searcher(), id)? > 0)
    }

    /// Lowercased, deduplicated analyzer tokens of `text`.
    fn tokenize(&self, text: &str) -> Vec<String> {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(text);
        let mut tokens: Vec<String> = Vec::new();
        while stream.advance() {
            let token = &stream.token().text;
            if !tokens.contains(token) {
                tokens.push(token.clone());
            }
        }
        tokens
    }

    fn fuzzy_distance(&self) -> u8 {
        self.settings.fuzzy_distance.min(MAX_FUZZY_DISTANCE)
    }

    /// Boosted full-text query across title, summary and content.
    fn exact_query(&self, query_str: &str) -> Result<Box<dyn Query>> {
        let mut query_parser = QueryParser::for_index(
            &self.index,
            vec![self.fields.title, self.fields.summary, self.fields.content],
        );
        query_parser.set_field_boost(self.fields.title, self.settings.title_boost);
        query_parser.set_field_boost(self.fields.summary, self.settings.summary_boost);
        query_parser.set_field_boost(self.fields.content, self.settings.content_boost);

        let escaped_query = escape_query(query_str);
        query_parser
            .parse_query(&escaped_query)
            .map_err(|e| ThicketError::query(format!("failed to parse query: {}", e)))
    }

    /// Every token must fuzzily match in at least one field.
    fn fuzzy_query(&self, tokens: &[String]) -> BooleanQuery {
        let max = self.fuzzy_distance();
        let subqueries: Vec<(Occur, Box<dyn Query>)> = tokens
            .iter()
            .map(|token| {
                let distance = term_edit_distance(token, max);
                let field_queries: Vec<(Occur, Box<dyn Query>)> = SearchField::all()
                    .into_iter()
                    .map(|field| {
                        let term = Term::from_field_text(self.fields.text_field(field), token);
                        let query: Box<dyn Query> =
                            Box::new(FuzzyTermQuery::new(term, distance, true));
                        (Occur::Should, query)
                    })
                    .collect();
                let term_query: Box<dyn Query> = Box::new(BooleanQuery::new(field_queries));
                (Occur::Must, term_query)
            })
            .collect();
        BooleanQuery::new(subqueries)
    }

    /// Search for documents matching `query_str`.
    ///
    /// Runs the boosted full-text query first; if that yields fewer than
    /// `limit` hits, a fuzzy pass tops up the results without duplicates.
    /// Results are ordered by relevance (exact hits before fuzzy top-ups).
    pub fn search(&self, query_str: &str, limit: usize) -> Result<Vec<Hit>> {
        if limit == 0 || query_str.trim().is_empty() {
            return Ok(Vec::new());
        }
        let searcher = self.reader.searcher();
        let tokens = self.tokenize(query_str);

        let query = self.exact_query(query_str)?;
        let mut scored = self.execute_search(&searcher, &*query, limit)?;

        if scored.len() < limit && self.fuzzy_distance() > 0 && !tokens.is_empty() {
            let fuzzy = self.fuzzy_query(&tokens);
            let fuzzy_scored = self.execute_search(&searcher, &fuzzy, limit)?;

            let seen: HashSet<DocumentId> = scored.iter().map(|(_, d)| d.id.clone()).collect();
            for (score, document) in fuzzy_scored {
                if scored.len() >= limit {
                    break;
                }
                if !seen.contains(&document.id) {
                    scored.push((score, document));
                }
            }
        }

        Ok(scored
            .into_iter()
            .map(|(score, document)| {
                let matches = self.collect_matches(&document, &tokens);
                Hit {
                    document,
                    score,
                    matches,
                }
            })
            .collect())
    }

    fn execute_search(
        &self,
        searcher: &Searcher,
        query: &dyn Query,
        limit: usize,
    ) -> Result<Vec<(f32, IndexedDocument)>> {
        let top_docs = searcher
            .search(query, &TopDocs::with_limit(limit))
            .map_err(|e| ThicketError::index("search", e))?;

        let mut results = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let doc: TantivyDocument = searcher
                .doc(doc_address)
                .map_err(|e| ThicketError::index("retrieve document", e))?;
            if let Some(document) = self.read_document(&doc) {
                results.push((score, document));
            }
        }
        Ok(results)
    }

    /// Per-field tokens of `document` that equal a query token or lie within
    /// that token's edit budget.
    ///
    /// Terms are ordered by the query token they matched, then by position
    /// in the field.
    fn collect_matches(&self, document: &IndexedDocument, query_tokens: &[String]) -> Vec<MatchInfo> {
        if query_tokens.is_empty() {
            return Vec::new();
        }
        let max = self.fuzzy_distance();
        let query: Vec<(Vec<char>, usize)> = query_tokens
            .iter()
            .map(|t| (t.chars().collect(), usize::from(term_edit_distance(t, max))))
            .collect();
        let mut buffers = DistanceBuffers::new();

        SearchField::all()
            .into_iter()
            .filter_map(|field| {
                let mut matched: Vec<(usize, String)> = Vec::new();
                for token in self.tokenize(field.text(document)) {
                    let token_chars: Vec<char> = token.chars().collect();
                    let position = query.iter().position(|(q, budget)| {
                        bounded_levenshtein(&token_chars, q, *budget, &mut buffers) <= *budget
                    });
                    if let Some(position) = position {
                        matched.push((position, token));
                    }
                }
                matched.sort_by_key(|(position, _)| *position);
                let terms: Vec<String> = matched.into_iter().map(|(_, token)| token).collect();
                (!terms.is_empty()).then_some(MatchInfo { field, terms })
            })
            .collect()
    }

    /// Every live document, sorted by id.
    pub fn documents(&self) -> Result<Vec<IndexedDocument>> {
        let searcher = self.reader.searcher();
        let addresses = searcher
            .search(&AllQuery, &DocSetCollector)
            .map_err(|e| ThicketError::index("collect documents", e))?;

        let mut documents = Vec::with_capacity(addresses.len());
        for address in addresses {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| ThicketError::index("retrieve document", e))?;
            if let Some(document) = self.read_document(&doc) {
                documents.push(document);
            }
        }
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }

    /// Get the number of documents in the index.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}
