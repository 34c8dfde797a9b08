//! Ranked, bounded retrieval of records for a query.

use crate::embedding::Embedder;
use crate::error::MemoryError;
use crate::index::EmbeddingIndex;
use crate::model::{Record, RecordFilter, RecordId};
use crate::store::RecordStore;
use log::{debug, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Recall query: free text plus optional creative tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecallQuery {
    pub text: String,
    pub themes: Vec<String>,
    pub genre: Option<String>,
    pub mood: Option<String>,
}

impl RecallQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.themes.push(theme.into());
        self
    }

    pub fn with_genre(mut self, genre: impl Into<String>) -> Self {
        self.genre = Some(genre.into());
        self
    }

    pub fn with_mood(mut self, mood: impl Into<String>) -> Self {
        self.mood = Some(mood.into());
        self
    }

    /// Flatten the query into the text that gets embedded.
    pub fn to_text(&self) -> String {
        let mut parts = Vec::new();
        if !self.text.trim().is_empty() {
            parts.push(self.text.trim().to_string());
        }
        parts.extend(
            self.themes
                .iter()
                .map(|theme| theme.trim())
                .filter(|theme| !theme.is_empty())
                .map(str::to_string),
        );
        parts.extend(
            [&self.genre, &self.mood]
                .into_iter()
                .flatten()
                .map(|tag| tag.trim().to_string())
                .filter(|tag| !tag.is_empty()),
        );
        parts.join(" ")
    }
}

impl From<&str> for RecallQuery {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecallQuery {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Recall tuning options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecallOptions {
    /// Maximum number of records returned.
    pub max_results: usize,
    /// Optional minimum similarity score.
    pub min_score: Option<f32>,
    /// Time allowed for the index scan.
    pub deadline: Option<Duration>,
    /// Whether corrected records may be returned.
    pub include_superseded: bool,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            max_results: 5,
            min_score: None,
            deadline: None,
            include_superseded: false,
        }
    }
}

/// Record paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub record: Arc<Record>,
    pub score: f32,
}

/// Retriever over a record store and its embedding index.
#[derive(Clone)]
pub struct Retriever {
    store: Arc<RecordStore>,
    index: Arc<EmbeddingIndex>,
    embedder: Arc<dyn Embedder>,
}

impl Retriever {
    /// Build a retriever that embeds queries with the index's embedder.
    pub fn new(store: Arc<RecordStore>, index: Arc<EmbeddingIndex>) -> Self {
        let embedder = Arc::clone(index.embedder());
        Self {
            store,
            index,
            embedder,
        }
    }

    /// Use a different query embedder; its model must match the index.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    /// Retrieve up to `max_results` records matching `filter`.
    pub fn retrieve(
        &self,
        query: impl Into<RecallQuery>,
        max_results: usize,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<ScoredRecord>, MemoryError> {
        let options = RecallOptions {
            max_results,
            ..RecallOptions::default()
        };
        self.retrieve_with_options(query, filter, options)
    }

    /// Retrieve with explicit options.
    ///
    /// Ids the store cannot resolve are logged and skipped. A scan that
    /// runs past the deadline yields an empty result.
    pub fn retrieve_with_options(
        &self,
        query: impl Into<RecallQuery>,
        filter: Option<&RecordFilter>,
        options: RecallOptions,
    ) -> Result<Vec<ScoredRecord>, MemoryError> {
        let query = query.into();
        let embedding = self.embedder.embed(&query.to_text());
        let deadline = options.deadline.map(|budget| Instant::now() + budget);

        let accept = |id: &RecordId| match self.store.get(id) {
            Ok(record) => {
                filter.is_none_or(|filter| filter.matches(&record))
                    && (options.include_superseded || !self.store.is_superseded(id))
            }
            Err(_) => true,
        };
        let hits = match self
            .index
            .search_filtered(&embedding, options.max_results, deadline, accept)
        {
            Ok(hits) => hits,
            Err(MemoryError::DeadlineExceeded) => {
                warn!(
                    "recall deadline exceeded, returning no records (query={}, deadline_ms={})",
                    query.text,
                    options.deadline.unwrap_or_default().as_millis()
                );
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            if options.min_score.is_some_and(|min| hit.score < min) {
                continue;
            }
            match self.store.get(&hit.record_id) {
                Ok(record) => results.push(ScoredRecord {
                    record,
                    score: hit.score,
                }),
                Err(MemoryError::NotFound(id)) => {
                    warn!("skipping indexed record missing from store (id={})", id);
                }
                Err(err) => return Err(err),
            }
        }
        debug!(
            "recalled records (query={}, returned={}, max_results={})",
            query.text,
            results.len(),
            options.max_results
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::{RecallOptions, RecallQuery, Retriever};
    use crate::embedding::HashingEmbedder;
    use crate::{EmbeddingIndex, MemoryError, NewRecord, RecordFilter, RecordKind, RecordStore};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn setup() -> (Arc<RecordStore>, Arc<EmbeddingIndex>, Retriever) {
        let store = Arc::new(RecordStore::in_memory());
        let index = Arc::new(EmbeddingIndex::in_memory(Arc::new(HashingEmbedder::new(
            128,
        ))));
        let retriever = Retriever::new(Arc::clone(&store), Arc::clone(&index));
        (store, index, retriever)
    }

    fn add(store: &RecordStore, index: &EmbeddingIndex, record: NewRecord) {
        let id = store.put(record).expect("put");
        index.index(&store.get(&id).expect("get")).expect("index");
    }

    fn song(title: &str, body: &str) -> NewRecord {
        NewRecord::new(RecordKind::Song, body)
            .with_meta("title", title)
            .with_meta("genre", "pop")
    }

    #[test]
    fn query_tags_flatten_into_text() {
        let query = RecallQuery::new("late night")
            .with_theme("heartbreak")
            .with_genre("pop/r&b")
            .with_mood(" wistful ");
        assert_eq!(query.to_text(), "late night heartbreak pop/r&b wistful");
        assert_eq!(RecallQuery::from("").to_text(), "");
    }

    #[test]
    fn superseded_records_are_hidden_by_default() {
        let (store, index, retriever) = setup();
        let original = store.put(song("One", "love at dawn")).expect("put");
        index.index(&store.get(&original).expect("get")).expect("index");
        add(&store, &index, song("One", "love at dusk").superseding(original.clone()));

        let default = retriever.retrieve("love", 5, None).expect("retrieve");
        assert_eq!(default.len(), 1);
        assert!(default[0].record.id != original);

        let options = RecallOptions {
            include_superseded: true,
            ..RecallOptions::default()
        };
        let all = retriever
            .retrieve_with_options("love", None, options)
            .expect("retrieve");
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn min_score_drops_weak_matches() {
        let (store, index, retriever) = setup();
        add(&store, &index, song("One", "love love love"));
        add(&store, &index, song("Two", "diesel tractor engine"));
        let options = RecallOptions {
            min_score: Some(0.2),
            ..RecallOptions::default()
        };
        let results = retriever
            .retrieve_with_options("love", None, options)
            .expect("retrieve");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.title(), Some("One"));
    }

    #[test]
    fn unresolved_index_entries_are_skipped() {
        let (store, index, retriever) = setup();
        add(&store, &index, song("One", "love song"));
        let orphan = crate::Record {
            id: "orphan".into(),
            kind: RecordKind::Song,
            body: "love love".to_string(),
            metadata: Default::default(),
            supersedes: None,
            created_at: chrono::Utc::now(),
        };
        index.index(&orphan).expect("index");

        let results = retriever.retrieve("love", 5, None).expect("retrieve");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.title(), Some("One"));
    }

    #[test]
    fn expired_deadline_returns_empty() {
        let (store, index, retriever) = setup();
        add(&store, &index, song("One", "love song"));
        let options = RecallOptions {
            deadline: Some(Duration::ZERO),
            ..RecallOptions::default()
        };
        let results = retriever
            .retrieve_with_options("love", None, options)
            .expect("retrieve");
        assert!(results.is_empty());
    }

    #[test]
    fn foreign_query_embedder_is_rejected() {
        let (store, index, retriever) = setup();
        add(&store, &index, song("One", "love song"));
        let retriever = retriever.with_embedder(Arc::new(HashingEmbedder::new(64)));
        let err = retriever.retrieve("love", 5, None).expect_err("mismatch");
        assert!(matches!(err, MemoryError::EmbeddingMismatch { .. }));
    }

    #[test]
    fn filter_restricts_kind() {
        let (store, index, retriever) = setup();
        add(&store, &index, song("One", "love song"));
        add(
            &store,
            &index,
            NewRecord::new(RecordKind::Feedback, "the love chorus lands")
                .with_meta("title", "One")
                .with_meta("source", "reviewer"),
        );
        let filter = RecordFilter::kind(RecordKind::Feedback);
        let results = retriever.retrieve("love", 5, Some(&filter)).expect("retrieve");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].record.kind, RecordKind::Feedback);
    }
}
