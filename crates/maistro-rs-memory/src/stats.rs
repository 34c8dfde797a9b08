//! Summary statistics over stored records.

use crate::index::EmbeddingIndex;
use crate::ingest::DOCUMENT_KEY;
use crate::model::{MetaValue, RecordKind};
use crate::store::RecordStore;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Per-document summary.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStats {
    /// Source document, falling back to the record title or id.
    pub document: String,
    pub kind: RecordKind,
    pub chunk_count: usize,
    pub total_chars: usize,
    /// Earliest record timestamp for the document.
    pub created_at: DateTime<Utc>,
}

/// Counts across the store and index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryStats {
    pub total_records: usize,
    pub by_kind: BTreeMap<RecordKind, usize>,
    /// Records with a current embedding.
    pub indexed: usize,
    /// Document summaries ordered by kind, then document name.
    pub documents: Vec<DocumentStats>,
}

impl MemoryStats {
    pub fn collect(store: &RecordStore, index: &EmbeddingIndex) -> Self {
        let mut stats = MemoryStats::default();
        let mut documents: BTreeMap<(RecordKind, String), DocumentStats> = BTreeMap::new();
        for record in store.list(None).iter() {
            stats.total_records += 1;
            *stats.by_kind.entry(record.kind).or_default() += 1;
            if index.contains(&record.id) {
                stats.indexed += 1;
            }
            let name = record
                .meta(DOCUMENT_KEY)
                .or_else(|| record.meta("title"))
                .and_then(MetaValue::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| record.id.to_string());
            let entry = documents
                .entry((record.kind, name.clone()))
                .or_insert_with(|| DocumentStats {
                    document: name,
                    kind: record.kind,
                    chunk_count: 0,
                    total_chars: 0,
                    created_at: record.created_at,
                });
            entry.chunk_count += 1;
            entry.total_chars += record.body.chars().count();
            entry.created_at = entry.created_at.min(record.created_at);
        }
        stats.documents = documents.into_values().collect();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStats;
    use crate::embedding::HashingEmbedder;
    use crate::{EmbeddingIndex, NewRecord, RecordKind, RecordStore};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    #[test]
    fn stats_group_chunks_by_document() {
        let store = RecordStore::in_memory();
        let index = EmbeddingIndex::in_memory(Arc::new(HashingEmbedder::new(32)));
        for chunk in ["first half", "second half"] {
            store
                .put(
                    NewRecord::new(RecordKind::Song, chunk)
                        .with_meta("title", "Long Song")
                        .with_meta("genre", "pop")
                        .with_meta("document", "songs/long.md"),
                )
                .expect("put");
        }
        let review = store
            .put(
                NewRecord::new(RecordKind::Feedback, "great")
                    .with_meta("title", "Long Song")
                    .with_meta("source", "blog"),
            )
            .expect("put");
        index.index(&store.get(&review).expect("get")).expect("index");

        let stats = MemoryStats::collect(&store, &index);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.by_kind.get(&RecordKind::Song), Some(&2));
        assert_eq!(stats.indexed, 1);
        assert_eq!(stats.documents.len(), 2);
        assert_eq!(stats.documents[0].document, "songs/long.md");
        assert_eq!(stats.documents[0].chunk_count, 2);
        assert_eq!(stats.documents[0].total_chars, 21);
        assert_eq!(stats.documents[1].document, "Long Song");
    }
}
