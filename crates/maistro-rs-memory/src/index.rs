//! Embedding index with deterministic similarity search.

use crate::embedding::{Embedder, Embedding, body_hash, cosine_similarity};
use crate::error::MemoryError;
use crate::journal::{Journal, JournalEvent};
use crate::model::{Record, RecordId};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Entries scanned between deadline checks.
const DEADLINE_CHECK_INTERVAL: usize = 32;

/// Vector derived from one record body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    pub record_id: RecordId,
    /// SHA-256 of the indexed body.
    pub body_hash: String,
    /// Model version tag of `vector`.
    pub model: String,
    pub vector: Vec<f32>,
    /// Creation time of the source record, used for tie-breaking.
    pub created_at: DateTime<Utc>,
}

/// Ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub record_id: RecordId,
    pub score: f32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IndexEvent {
    SchemaVersion { version: u32 },
    Entry(EmbeddingEntry),
}

impl JournalEvent for IndexEvent {
    fn schema_marker(version: u32) -> Self {
        IndexEvent::SchemaVersion { version }
    }

    fn schema_version(&self) -> Option<u32> {
        match self {
            IndexEvent::SchemaVersion { version } => Some(*version),
            IndexEvent::Entry(_) => None,
        }
    }
}

#[derive(Default)]
struct IndexState {
    entries: Vec<Arc<EmbeddingEntry>>,
    positions: HashMap<RecordId, usize>,
}

impl IndexState {
    /// Insert or replace the entry for its record id.
    fn commit(&mut self, entry: EmbeddingEntry) {
        match self.positions.get(&entry.record_id) {
            Some(position) => self.entries[*position] = Arc::new(entry),
            None => {
                self.positions
                    .insert(entry.record_id.clone(), self.entries.len());
                self.entries.push(Arc::new(entry));
            }
        }
    }

    fn is_current(&self, record_id: &RecordId, hash: &str) -> bool {
        self.positions
            .get(record_id)
            .is_some_and(|position| self.entries[*position].body_hash == hash)
    }
}

/// Index mapping record ids to vectors from a single embedding model.
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    journal: Option<Journal>,
    state: RwLock<IndexState>,
}

impl EmbeddingIndex {
    /// Open a persistent index at `path` bound to `embedder`.
    ///
    /// Entries written by a different model are skipped and must be
    /// re-indexed.
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self, MemoryError> {
        let journal = Journal::open::<IndexEvent>(path)?;
        let mut state = IndexState::default();
        let mut foreign = 0usize;
        for event in journal.load::<IndexEvent>()? {
            let IndexEvent::Entry(entry) = event else {
                continue;
            };
            if entry.model != embedder.model() {
                foreign += 1;
                continue;
            }
            state.commit(entry);
        }
        if foreign > 0 {
            warn!(
                "skipped entries from another embedding model (count={}, model={})",
                foreign,
                embedder.model()
            );
        }
        info!(
            "opened embedding index (path={}, entries={}, model={})",
            journal.path().display(),
            state.entries.len(),
            embedder.model()
        );
        Ok(Self {
            embedder,
            journal: Some(journal),
            state: RwLock::new(state),
        })
    }

    /// Create an index that lives only in memory.
    pub fn in_memory(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            journal: None,
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Model version tag this index is bound to.
    pub fn model(&self) -> &str {
        self.embedder.model()
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, record_id: &RecordId) -> bool {
        self.state.read().positions.contains_key(record_id)
    }

    /// Compute and store the vector for a record body.
    ///
    /// Returns `false` when the same body was already indexed for this id.
    pub fn index(&self, record: &Record) -> Result<bool, MemoryError> {
        let hash = body_hash(&record.body);
        if self.state.read().is_current(&record.id, &hash) {
            return Ok(false);
        }
        let Embedding { model, vector } = self.embedder.embed(&record.body);
        let entry = EmbeddingEntry {
            record_id: record.id.clone(),
            body_hash: hash,
            model,
            vector,
            created_at: record.created_at,
        };

        let mut state = self.state.write();
        if state.is_current(&entry.record_id, &entry.body_hash) {
            return Ok(false);
        }
        if let Some(journal) = &self.journal {
            journal.append(&IndexEvent::Entry(entry.clone()))?;
        }
        debug!(
            "indexed record (id={}, model={})",
            entry.record_id, entry.model
        );
        state.commit(entry);
        Ok(true)
    }

    /// Top `k` entries by similarity to `query`.
    pub fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchHit>, MemoryError> {
        self.search_filtered(query, k, None, |_| true)
    }

    /// Top `k` entries accepted by `accept`, aborting once `deadline` passes.
    ///
    /// Results are ordered by descending score, then most recent
    /// `created_at`, then ascending record id.
    pub fn search_filtered<F>(
        &self,
        query: &Embedding,
        k: usize,
        deadline: Option<Instant>,
        accept: F,
    ) -> Result<Vec<SearchHit>, MemoryError>
    where
        F: Fn(&RecordId) -> bool,
    {
        if k == 0 {
            return Err(MemoryError::InvalidArgument(
                "search k must be positive".to_string(),
            ));
        }
        if query.model != self.model() {
            return Err(MemoryError::EmbeddingMismatch {
                index: self.model().to_string(),
                query: query.model.clone(),
            });
        }
        let expired = || deadline.is_some_and(|deadline| Instant::now() >= deadline);

        let state = self.state.read();
        if state.entries.is_empty() {
            return Ok(Vec::new());
        }
        let mut hits = Vec::new();
        for (scanned, entry) in state.entries.iter().enumerate() {
            if scanned % DEADLINE_CHECK_INTERVAL == 0 && expired() {
                return Err(MemoryError::DeadlineExceeded);
            }
            if !accept(&entry.record_id) {
                continue;
            }
            hits.push(SearchHit {
                record_id: entry.record_id.clone(),
                score: cosine_similarity(&query.vector, &entry.vector),
                created_at: entry.created_at,
            });
        }
        drop(state);

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| a.record_id.cmp(&b.record_id))
        });
        hits.truncate(k);
        Ok(hits)
    }
}
