//! The search engine handle.
//!
//! `SearchEngine` owns a blob store and lazily loads the index from it on
//! first use. Mutations go through the normalizer into the index and are
//! then persisted, immediately or on `flush()` depending on
//! [`PersistMode`]. Queries clamp their limit to [`RESULT_LIMIT_MAX`] and can
//! annotate each hit with highlighted snippets.
//!
//! There is no locking across handles. Two engines writing the same store
//! race, and the last persist wins unless `check_generation` is enabled, in
//! which case the loser gets [`ThicketError::Conflict`].

use tracing::{debug, info, warn};

use crate::config::{Config, PersistMode};
use crate::core::{prepare_document, DocumentId, DocumentInput, IndexedDocument};
use crate::error::{Result, ThicketError};
use crate::highlight::build_snippet;
use crate::search::{FieldSnippets, Hit, IndexSnapshot, SearchField, SearchResult, TantivyIndex};
use crate::storage::BlobStore;

/// Hard ceiling on results per query.
pub const RESULT_LIMIT_MAX: usize = 25;

/// Resolve the effective result limit: the requested value (or `default`),
/// never above [`RESULT_LIMIT_MAX`].
pub fn clamp_limit(requested: Option<usize>, default: usize) -> usize {
    requested.unwrap_or(default).min(RESULT_LIMIT_MAX)
}

struct LoadedIndex {
    index: TantivyIndex,
    /// Generation of the blob this index was loaded from or last saved as.
    generation: u64,
}

/// Explicit handle over one index and its durable store.
pub struct SearchEngine<S: BlobStore> {
    store: S,
    config: Config,
    loaded: Option<LoadedIndex>,
    dirty: bool,
}

impl<S: BlobStore> SearchEngine<S> {
    /// Create an engine. Nothing is read from the store until first use.
    pub fn new(store: S, config: Config) -> Self {
        Self {
            store,
            config,
            loaded: None,
            dirty: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Whether there are mutations not yet persisted.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Load the index, creating an empty one if the store holds nothing.
    ///
    /// Loads at most once per handle; later calls return the same index.
    pub fn load(&mut self) -> Result<&TantivyIndex> {
        Ok(&self.loaded()?.index)
    }

    /// Drop the in-memory index (and any unpersisted changes) and load it
    /// again from the store.
    pub fn reload(&mut self) -> Result<()> {
        if self.dirty {
            warn!("discarding unpersisted index changes on reload");
        }
        self.loaded = None;
        self.dirty = false;
        self.loaded()?;
        Ok(())
    }

    fn loaded(&mut self) -> Result<&mut LoadedIndex> {
        let loaded = match self.loaded.take() {
            Some(loaded) => loaded,
            None => self.read_store()?,
        };
        Ok(self.loaded.insert(loaded))
    }

    fn read_store(&self) -> Result<LoadedIndex> {
        match self.store.load()? {
            Some(bytes) => {
                let snapshot = IndexSnapshot::decode(&bytes)?;
                let index = TantivyIndex::from_documents(&self.config, &snapshot.documents)?;
                debug!(
                    generation = snapshot.generation,
                    documents = snapshot.documents.len(),
                    "loaded index from store"
                );
                Ok(LoadedIndex {
                    index,
                    generation: snapshot.generation,
                })
            }
            None => {
                debug!("no stored index, starting empty");
                Ok(LoadedIndex {
                    index: TantivyIndex::in_memory(&self.config)?,
                    generation: 0,
                })
            }
        }
    }

    /// Serialize the current index and write it to the store.
    ///
    /// Store failures are returned unchanged and leave the handle dirty.
    pub fn persist(&mut self) -> Result<()> {
        let Some(loaded) = self.loaded.as_mut() else {
            return Ok(());
        };

        if self.config.index.check_generation {
            let found = match self.store.load()? {
                Some(bytes) => IndexSnapshot::peek_generation(&bytes)?,
                None => 0,
            };
            if found != loaded.generation {
                return Err(ThicketError::Conflict {
                    expected: loaded.generation,
                    found,
                });
            }
        }

        let generation = loaded.generation + 1;
        let snapshot = IndexSnapshot::new(generation, loaded.index.documents()?);
        self.store.save(&snapshot.encode()?)?;

        loaded.generation = generation;
        self.dirty = false;
        info!(
            generation,
            documents = snapshot.documents.len(),
            "persisted index"
        );
        Ok(())
    }

    /// Persist pending changes, if any.
    pub fn flush(&mut self) -> Result<()> {
        if self.dirty {
            self.persist()?;
        }
        Ok(())
    }

    fn after_mutation(&mut self) -> Result<()> {
        self.dirty = true;
        match self.config.index.persist {
            PersistMode::Immediate => self.persist(),
            PersistMode::Deferred => {
                debug!("persist deferred");
                Ok(())
            }
        }
    }

    /// Insert or replace a document. Returns its id.
    ///
    /// Any previous entry with the same id is removed first; its absence is
    /// not an error.
    pub fn upsert(&mut self, input: DocumentInput) -> Result<DocumentId> {
        let document = prepare_document(input)?;
        let removal = self.loaded()?.index.insert(&document)?;
        info!(id = %document.id, replaced = removal.was_present(), "upserted document");
        self.after_mutation()?;
        Ok(document.id)
    }

    /// Upsert a batch with a single persist.
    ///
    /// Every input is validated before any is applied.
    pub fn upsert_many<I>(&mut self, inputs: I) -> Result<Vec<DocumentId>>
    where
        I: IntoIterator<Item = DocumentInput>,
    {
        let documents = inputs
            .into_iter()
            .map(prepare_document)
            .collect::<Result<Vec<IndexedDocument>>>()?;
        if documents.is_empty() {
            return Ok(Vec::new());
        }

        let replaced = self.loaded()?.index.insert_many(&documents)?;
        info!(count = documents.len(), replaced, "upserted documents");
        self.after_mutation()?;
        Ok(documents.into_iter().map(|d| d.id).collect())
    }

    /// Remove a document. Returns its id.
    ///
    /// Deleting an id that is not indexed succeeds; the index is persisted
    /// either way.
    pub fn delete(&mut self, id: impl Into<DocumentId>) -> Result<DocumentId> {
        let id = id.into();
        id.validate()?;
        let removal = self.loaded()?.index.remove(&id)?;
        info!(id = %id, existed = removal.was_present(), "deleted document");
        self.after_mutation()?;
        Ok(id)
    }

    /// Run a query. `limit` defaults to the configured default and is
    /// clamped to [`RESULT_LIMIT_MAX`].
    pub fn search(&mut self, query: &str, limit: Option<usize>) -> Result<Vec<Hit>> {
        let limit = clamp_limit(limit, self.config.search.default_limit);
        let hits = self.loaded()?.index.search(query, limit)?;
        debug!(query, limit, hits = hits.len(), "search");
        Ok(hits)
    }

    /// Run a query and build a highlighted snippet for every field of every
    /// hit.
    pub fn search_with_snippets(
        &mut self,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        let hits = self.search(query, limit)?;
        Ok(hits
            .into_iter()
            .map(|hit| {
                let snippets = snippets_for(&hit, query);
                SearchResult { hit, snippets }
            })
            .collect())
    }

    /// Number of indexed documents.
    pub fn len(&mut self) -> Result<u64> {
        Ok(self.loaded()?.index.num_docs())
    }

    pub fn is_empty(&mut self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Check whether `id` is indexed.
    pub fn contains(&mut self, id: impl Into<DocumentId>) -> Result<bool> {
        self.loaded()?.index.contains(&id.into())
    }
}

/// Snippets for each field of `hit`, falling back to `query` where the
/// index reported no terms for a field.
fn snippets_for(hit: &Hit, query: &str) -> FieldSnippets {
    let mut snippets = FieldSnippets::default();
    for field in SearchField::all() {
        *snippets.slot_mut(field) =
            build_snippet(field.text(&hit.document), hit.terms_for(field), query);
    }
    snippets
}

impl<S: BlobStore> Drop for SearchEngine<S> {
    fn drop(&mut self) {
        if self.dirty && self.config.index.persist == PersistMode::Deferred {
            if let Err(e) = self.persist() {
                warn!(error = %e, "failed to flush deferred index changes");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RichNode, CONTENT_CEILING};
    use crate::storage::{FileBlobStore, MemoryBlobStore};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn engine() -> SearchEngine<Arc<MemoryBlobStore>> {
        SearchEngine::new(Arc::new(MemoryBlobStore::new()), Config::default())
    }

    fn post(id: &str, title: &str, body: &str) -> DocumentInput {
        DocumentInput::new(id, format!("slug-{}", id), title).with_text(body)
    }

    fn stored_snapshot(store: &MemoryBlobStore) -> IndexSnapshot {
        IndexSnapshot::decode(&store.load().unwrap().unwrap()).unwrap()
    }

    #[test]
    fn test_upsert_then_search_round_trip() {
        let mut engine = engine();
        let id = engine
            .upsert(post("1", "Field notes", "The quick brown fox jumps"))
            .unwrap();
        assert_eq!(id.as_str(), "1");

        let hits = engine.search("brown", None).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document.id, id);
        assert_eq!(hits[0].document.slug, "slug-1");
    }

    #[test]
    fn test_upsert_persists_immediately() {
        let mut engine = engine();
        engine.upsert(post("1", "One", "alpha")).unwrap();
        engine.upsert(post("2", "Two", "beta")).unwrap();

        assert_eq!(engine.store().save_count(), 2);
        assert!(!engine.is_dirty());
        let snapshot = stored_snapshot(engine.store());
        assert_eq!(snapshot.generation, 2);
        assert_eq!(snapshot.documents.len(), 2);
    }

    #[test]
    fn test_upsert_same_payload_is_idempotent() {
        let mut engine = engine();
        engine.upsert(post("1", "One", "alpha")).unwrap();
        let first = stored_snapshot(engine.store()).documents;
        engine.upsert(post("1", "One", "alpha")).unwrap();

        assert_eq!(engine.len().unwrap(), 1);
        assert_eq!(stored_snapshot(engine.store()).documents, first);
    }

    #[test]
    fn test_numeric_id_addresses_same_entry() {
        let mut engine = engine();
        engine.upsert(DocumentInput::new(42u64, "a", "First")).unwrap();
        engine.upsert(DocumentInput::new("42", "b", "Second")).unwrap();
        assert_eq!(engine.len().unwrap(), 1);
        assert!(engine.contains(42u64).unwrap());
    }

    #[test]
    fn test_delete_removes() {
        let mut engine = engine();
        engine.upsert(post("1", "Keep", "shared words")).unwrap();
        engine.upsert(post("2", "Drop", "shared zanzibar")).unwrap();

        assert_eq!(engine.delete("2").unwrap().as_str(), "2");

        let hits = engine.search("zanzibar", None).unwrap();
        assert!(hits.iter().all(|h| h.document.id.as_str() != "2"));
        assert!(!engine.contains("2").unwrap());
        assert!(engine.contains("1").unwrap());
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut engine = engine();
        engine.upsert(post("1", "One", "alpha")).unwrap();
        let before = stored_snapshot(engine.store()).documents;

        let id = engine.delete("never-indexed").unwrap();
        assert_eq!(id.as_str(), "never-indexed");
        assert_eq!(stored_snapshot(engine.store()).documents, before);
        // Still persisted
        assert_eq!(engine.store().save_count(), 2);
    }

    #[test]
    fn test_delete_on_empty_store() {
        let mut engine = engine();
        engine.delete("ghost").unwrap();
        assert!(engine.is_empty().unwrap());
    }

    #[test]
    fn test_missing_id_fails_fast() {
        let mut engine = engine();
        let err = engine.upsert(post("  ", "Title", "body")).unwrap_err();
        assert!(matches!(err, ThicketError::InvalidDocument { .. }));

        let err = engine.delete("").unwrap_err();
        assert!(matches!(err, ThicketError::InvalidDocument { .. }));

        assert_eq!(engine.store().save_count(), 0);
    }

    #[test]
    fn test_content_truncated_to_ceiling() {
        let mut engine = engine();
        let body = "word ".repeat(3_000);
        engine.upsert(post("long", "Long", &body)).unwrap();

        let snapshot = stored_snapshot(engine.store());
        assert_eq!(snapshot.documents[0].content.chars().count(), CONTENT_CEILING);
    }

    #[test]
    fn test_rich_content_is_flattened() {
        let mut engine = engine();
        let tree = RichNode::node(
            "doc",
            vec![
                RichNode::node("paragraph", vec![RichNode::text("Hello")]),
                RichNode::node("paragraph", vec![RichNode::text("nested world")]),
            ],
        );
        engine
            .upsert(DocumentInput::new("r", "rich", "Rich").with_rich(tree))
            .unwrap();

        let hits = engine.search("nested", None).unwrap();
        assert_eq!(hits[0].document.content, "Hello nested world");
        assert_eq!(hits[0].document.summary, "Hello nested world");
    }

    #[test]
    fn test_limit_clamped() {
        let mut engine = engine();
        let posts = (0..30).map(|i| post(&format!("p{:02}", i), "Common", "common body"));
        engine.upsert_many(posts).unwrap();

        assert_eq!(engine.search("common", Some(1000)).unwrap().len(), RESULT_LIMIT_MAX);
        assert_eq!(engine.search("common", Some(3)).unwrap().len(), 3);
        assert_eq!(engine.search("common", None).unwrap().len(), 10);
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 10), 10);
        assert_eq!(clamp_limit(Some(1000), 10), 25);
        assert_eq!(clamp_limit(None, 100), 25);
        assert_eq!(clamp_limit(Some(0), 10), 0);
    }

    #[test]
    fn test_upsert_many_single_persist() {
        let mut engine = engine();
        let ids = engine
            .upsert_many(vec![post("a", "A", "x"), post("b", "B", "y")])
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(engine.store().save_count(), 1);

        assert!(engine.upsert_many(Vec::new()).unwrap().is_empty());
        assert_eq!(engine.store().save_count(), 1);
    }

    #[test]
    fn test_upsert_many_rejects_batch_with_invalid_id() {
        let mut engine = engine();
        let err = engine
            .upsert_many(vec![post("a", "A", "x"), post("", "B", "y")])
            .unwrap_err();
        assert!(matches!(err, ThicketError::InvalidDocument { .. }));
        assert!(engine.is_empty().unwrap());
    }

    #[test]
    fn test_storage_failure_propagates() {
        let mut engine = engine();
        engine.store().set_fail_saves(true);

        let err = engine.upsert(post("1", "One", "alpha")).unwrap_err();
        assert!(matches!(err, ThicketError::Storage { .. }));
        assert!(err.is_retryable());
        assert!(engine.is_dirty());

        // Store recovers; flush writes the pending change
        engine.store().set_fail_saves(false);
        engine.flush().unwrap();
        assert_eq!(stored_snapshot(engine.store()).documents.len(), 1);
    }

    #[test]
    fn test_corrupt_blob_is_reported() {
        let store = MemoryBlobStore::with_blob(b"{not json".to_vec());
        let mut engine = SearchEngine::new(store, Config::default());
        let err = engine.search("anything", None).unwrap_err();
        assert!(matches!(err, ThicketError::Serde { .. }));
    }

    #[test]
    fn test_reload_from_persisted_blob() {
        let store = Arc::new(MemoryBlobStore::new());
        {
            let mut engine = SearchEngine::new(Arc::clone(&store), Config::default());
            engine.upsert(post("1", "Persisted", "durable text")).unwrap();
        }

        let mut engine = SearchEngine::new(Arc::clone(&store), Config::default());
        let hits = engine.search("durable", None).unwrap();
        assert_eq!(hits[0].document.id.as_str(), "1");
    }

    #[test]
    fn test_load_is_lazy_and_once() {
        let store = Arc::new(MemoryBlobStore::new());
        let mut engine = SearchEngine::new(Arc::clone(&store), Config::default());

        // Written behind the engine's back before first use: visible
        {
            let mut other = SearchEngine::new(Arc::clone(&store), Config::default());
            other.upsert(post("1", "One", "alpha")).unwrap();
        }
        assert_eq!(engine.load().unwrap().num_docs(), 1);

        // Written after load: not visible until reload
        {
            let mut other = SearchEngine::new(Arc::clone(&store), Config::default());
            other.upsert(post("2", "Two", "beta")).unwrap();
        }
        assert_eq!(engine.load().unwrap().num_docs(), 1);
        engine.reload().unwrap();
        assert_eq!(engine.len().unwrap(), 2);
    }

    #[test]
    fn test_last_write_wins_by_default() {
        let store = Arc::new(MemoryBlobStore::new());
        let mut a = SearchEngine::new(Arc::clone(&store), Config::default());
        let mut b = SearchEngine::new(Arc::clone(&store), Config::default());
        a.len().unwrap();
        b.len().unwrap();

        a.upsert(post("a", "A", "from a")).unwrap();
        b.upsert(post("b", "B", "from b")).unwrap();

        let ids: Vec<String> = stored_snapshot(&store)
            .documents
            .into_iter()
            .map(|d| String::from(d.id))
            .collect();
        assert_eq!(ids, vec!["b".to_string()]);
    }

    #[test]
    fn test_generation_check_detects_conflict() {
        let mut config = Config::default();
        config.index.check_generation = true;
        let store = Arc::new(MemoryBlobStore::new());
        let mut a = SearchEngine::new(Arc::clone(&store), config.clone());
        let mut b = SearchEngine::new(Arc::clone(&store), config);
        a.len().unwrap();
        b.len().unwrap();

        a.upsert(post("a", "A", "from a")).unwrap();
        let err = b.upsert(post("b", "B", "from b")).unwrap_err();
        assert!(matches!(
            err,
            ThicketError::Conflict {
                expected: 0,
                found: 1
            }
        ));
        assert_eq!(store.save_count(), 1);

        // Reload and retry succeeds
        b.reload().unwrap();
        b.upsert(post("b", "B", "from b")).unwrap();
        assert_eq!(stored_snapshot(&store).documents.len(), 2);
    }

    #[test]
    fn test_deferred_persist() {
        let mut config = Config::default();
        config.index.persist = PersistMode::Deferred;
        let store = Arc::new(MemoryBlobStore::new());

        let mut engine = SearchEngine::new(Arc::clone(&store), config.clone());
        engine.upsert(post("1", "One", "alpha")).unwrap();
        engine.delete("1").unwrap();
        engine.upsert(post("2", "Two", "beta")).unwrap();
        assert_eq!(store.save_count(), 0);
        assert!(engine.is_dirty());

        engine.flush().unwrap();
        assert_eq!(store.save_count(), 1);
        engine.flush().unwrap();
        assert_eq!(store.save_count(), 1);

        engine.upsert(post("3", "Three", "gamma")).unwrap();
        drop(engine);
        assert_eq!(store.save_count(), 2);
        assert_eq!(stored_snapshot(&store).documents.len(), 2);
    }

    #[test]
    fn test_search_with_snippets() {
        let mut engine = engine();
        engine
            .upsert(
                post("1", "Fox facts", "the quick brown fox <script> jumps")
                    .with_summary("All about foxes"),
            )
            .unwrap();

        let results = engine.search_with_snippets("quick", None).unwrap();
        assert_eq!(results.len(), 1);
        let snippets = &results[0].snippets;

        let content = snippets.content.as_deref().unwrap();
        assert!(content.contains("<mark>quick</mark>"));
        assert!(content.contains("&lt;script&gt;"));
        assert!(!content.contains("<script>"));

        // Fields without the term fall back to plain truncation
        assert_eq!(snippets.title.as_deref(), Some("Fox facts"));
    }

    #[test]
    fn test_content_snippet_centres_on_first_query_term() {
        let mut engine = engine();
        let filler = "meadow ".repeat(40);
        engine
            .upsert(post("1", "Field notes", &format!("quick {}fox", filler)))
            .unwrap();

        let results = engine.search_with_snippets("fox quick", None).unwrap();
        let content = results[0].snippets.content.as_deref().unwrap();
        assert!(content.contains("<mark>fox</mark>"), "{}", content);
        assert!(!content.contains("<mark>quick</mark>"), "{}", content);
    }

    #[test]
    fn test_search_with_snippets_empty_field_is_none() {
        let mut engine = engine();
        engine
            .upsert(DocumentInput::new("1", "s", "Lonely title"))
            .unwrap();

        let results = engine.search_with_snippets("lonely", None).unwrap();
        let snippets = &results[0].snippets;
        assert!(snippets.title.as_deref().unwrap().contains("<mark>Lonely</mark>"));
        assert!(snippets.summary.is_none());
        assert!(snippets.content.is_none());
    }

    #[test]
    fn test_empty_query_returns_nothing() {
        let mut engine = engine();
        engine.upsert(post("1", "One", "alpha")).unwrap();
        assert!(engine.search("   ", None).unwrap().is_empty());
    }

    #[test]
    fn test_file_store_end_to_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data").join("index.json");

        {
            let store = FileBlobStore::with_path(&path).unwrap();
            let mut engine = SearchEngine::new(store, Config::default());
            engine.upsert(post("1", "On disk", "persisted to a file")).unwrap();
        }

        let store = FileBlobStore::with_path(&path).unwrap();
        let mut engine = SearchEngine::new(store, Config::default());
        assert!(engine.contains("1").unwrap());
        assert_eq!(engine.search("file", None).unwrap().len(), 1);
    }
}
