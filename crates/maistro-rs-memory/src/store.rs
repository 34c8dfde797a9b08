//! Append-only record store with JSONL persistence.

use crate::error::MemoryError;
use crate::journal::{Journal, JournalEvent};
use crate::model::{NewRecord, Record, RecordFilter, RecordId};
use chrono::Utc;
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

/// Persisted store events.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum StoreEvent {
    SchemaVersion { version: u32 },
    Record(Record),
}

impl JournalEvent for StoreEvent {
    fn schema_marker(version: u32) -> Self {
        StoreEvent::SchemaVersion { version }
    }

    fn schema_version(&self) -> Option<u32> {
        match self {
            StoreEvent::SchemaVersion { version } => Some(*version),
            StoreEvent::Record(_) => None,
        }
    }
}

#[derive(Default)]
struct StoreState {
    /// Records in insertion order.
    records: Vec<Arc<Record>>,
    /// Position of each id in `records`.
    positions: HashMap<RecordId, usize>,
    /// Ids referenced by some record's `supersedes` link.
    superseded: HashSet<RecordId>,
}

impl StoreState {
    fn commit(&mut self, record: Record) {
        if let Some(previous) = &record.supersedes {
            self.superseded.insert(previous.clone());
        }
        self.positions
            .insert(record.id.clone(), self.records.len());
        self.records.push(Arc::new(record));
    }
}

/// Store of immutable creative records.
///
/// Writers hold the write lock across the journal append and the in-memory
/// commit, so readers never observe a partially written record.
pub struct RecordStore {
    journal: Option<Journal>,
    state: RwLock<StoreState>,
}

impl RecordStore {
    /// Open a persistent store backed by the JSONL file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let journal = Journal::open::<StoreEvent>(path)?;
        let mut state = StoreState::default();
        for event in journal.load::<StoreEvent>()? {
            let StoreEvent::Record(record) = event else {
                continue;
            };
            if state.positions.contains_key(&record.id) {
                warn!("ignoring duplicate persisted record (id={})", record.id);
                continue;
            }
            state.commit(record);
        }
        info!(
            "opened record store (path={}, records={})",
            journal.path().display(),
            state.records.len()
        );
        Ok(Self {
            journal: Some(journal),
            state: RwLock::new(state),
        })
    }

    /// Create a store that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            journal: None,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Validate and persist a new record, returning its id.
    pub fn put(&self, record: NewRecord) -> Result<RecordId, MemoryError> {
        record.validate()?;
        let explicit_id = record.id.is_some();
        let mut record = Record {
            id: record.id.unwrap_or_else(RecordId::generate),
            kind: record.kind,
            body: record.body,
            metadata: record.metadata,
            supersedes: record.supersedes,
            created_at: record.created_at.unwrap_or_else(Utc::now),
        };

        let mut state = self.state.write();
        while state.positions.contains_key(&record.id) {
            if explicit_id {
                return Err(MemoryError::Duplicate(record.id));
            }
            record.id = RecordId::generate();
        }
        if let Some(previous) = &record.supersedes {
            if !state.positions.contains_key(previous) {
                debug!(
                    "record supersedes unknown id (id={}, supersedes={})",
                    record.id, previous
                );
            }
        }
        if let Some(journal) = &self.journal {
            journal.append(&StoreEvent::Record(record.clone()))?;
        }
        let id = record.id.clone();
        debug!(
            "stored record (id={}, kind={}, body_len={})",
            id,
            record.kind,
            record.body.len()
        );
        state.commit(record);
        Ok(id)
    }

    /// Fetch a record by id.
    pub fn get(&self, id: &RecordId) -> Result<Arc<Record>, MemoryError> {
        let state = self.state.read();
        state
            .positions
            .get(id)
            .map(|position| Arc::clone(&state.records[*position]))
            .ok_or_else(|| MemoryError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.state.read().positions.contains_key(id)
    }

    /// Whether a stored record lists `id` as the record it corrects.
    pub fn is_superseded(&self, id: &RecordId) -> bool {
        self.state.read().superseded.contains(id)
    }

    pub fn len(&self) -> usize {
        self.state.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lazily list records in insertion order.
    ///
    /// The listing covers the records committed when it was created and can
    /// be iterated any number of times.
    pub fn list(&self, filter: Option<RecordFilter>) -> Listing<'_> {
        Listing {
            store: self,
            end: self.len(),
            filter,
        }
    }

    fn record_at(&self, position: usize) -> Option<Arc<Record>> {
        self.state.read().records.get(position).cloned()
    }
}

/// Restartable snapshot view over the store.
pub struct Listing<'a> {
    store: &'a RecordStore,
    end: usize,
    filter: Option<RecordFilter>,
}

impl Listing<'_> {
    pub fn iter(&self) -> ListingIter<'_> {
        ListingIter {
            store: self.store,
            next: 0,
            end: self.end,
            filter: self.filter.as_ref(),
        }
    }
}

impl<'a> IntoIterator for &'a Listing<'_> {
    type Item = Arc<Record>;
    type IntoIter = ListingIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Single pass over a [`Listing`].
pub struct ListingIter<'a> {
    store: &'a RecordStore,
    next: usize,
    end: usize,
    filter: Option<&'a RecordFilter>,
}

impl Iterator for ListingIter<'_> {
    type Item = Arc<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.end {
            let record = self.store.record_at(self.next)?;
            self.next += 1;
            if self.filter.is_none_or(|filter| filter.matches(&record)) {
                return Some(record);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.end - self.next))
    }
}
