//! Artist memory: record store, embedding index and retriever wired together.

use crate::embedding::Embedder;
use crate::error::MemoryError;
use crate::index::EmbeddingIndex;
use crate::ingest::{DOCUMENT_KEY, IngestDocument, IngestFailure, IngestOptions, IngestReport};
use crate::model::{MetaValue, NewRecord, RecordFilter, RecordId, RecordKind};
use crate::recall::{RecallOptions, RecallQuery, Retriever, ScoredRecord};
use crate::stats::MemoryStats;
use crate::store::RecordStore;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Record journal file name under the memory root.
pub const RECORDS_FILE: &str = "records.jsonl";
/// Embedding journal file name under the memory root.
pub const EMBEDDINGS_FILE: &str = "embeddings.jsonl";

/// Store, index and retriever for one artist.
#[derive(Clone)]
pub struct ArtistMemory {
    store: Arc<RecordStore>,
    index: Arc<EmbeddingIndex>,
    retriever: Retriever,
}

impl ArtistMemory {
    /// Open persistent memory under `root`, indexing any record that lacks
    /// a current embedding.
    pub fn open(root: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self, MemoryError> {
        let root = root.as_ref();
        let store = Arc::new(RecordStore::open(root.join(RECORDS_FILE))?);
        let index = Arc::new(EmbeddingIndex::open(root.join(EMBEDDINGS_FILE), embedder)?);
        let memory = Self::from_parts(store, index);

        let mut reindexed = 0usize;
        for record in memory.store.list(None).iter() {
            if memory.index.index(&record)? {
                reindexed += 1;
            }
        }
        if reindexed > 0 {
            info!(
                "indexed records missing embeddings (count={}, model={})",
                reindexed,
                memory.index.model()
            );
        }
        Ok(memory)
    }

    /// Memory that is never written to disk.
    pub fn in_memory(embedder: Arc<dyn Embedder>) -> Self {
        Self::from_parts(
            Arc::new(RecordStore::in_memory()),
            Arc::new(EmbeddingIndex::in_memory(embedder)),
        )
    }

    fn from_parts(store: Arc<RecordStore>, index: Arc<EmbeddingIndex>) -> Self {
        let retriever = Retriever::new(Arc::clone(&store), Arc::clone(&index));
        Self {
            store,
            index,
            retriever,
        }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    pub fn index(&self) -> &Arc<EmbeddingIndex> {
        &self.index
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Store a record and index its body.
    pub fn ingest(&self, record: NewRecord) -> Result<RecordId, MemoryError> {
        let id = self.store.put(record)?;
        let stored = self.store.get(&id)?;
        self.index.index(&stored)?;
        Ok(id)
    }

    /// Store every record produced by a parsed document.
    ///
    /// All records are validated before any is written.
    pub fn ingest_document(
        &self,
        document: IngestDocument,
        default_kind: RecordKind,
        chunk_max_chars: Option<usize>,
    ) -> Result<Vec<RecordId>, MemoryError> {
        let records = document.into_records(default_kind, chunk_max_chars);
        let mut explicit = HashSet::new();
        for record in &records {
            record.validate()?;
            if let Some(id) = &record.id {
                if self.store.contains(id) || !explicit.insert(id.clone()) {
                    return Err(MemoryError::Duplicate(id.clone()));
                }
            }
        }
        records
            .into_iter()
            .map(|record| self.ingest(record))
            .collect()
    }

    /// Ingest one Markdown file, recording its path as the source document.
    pub fn ingest_file(
        &self,
        path: impl AsRef<Path>,
        options: &IngestOptions,
    ) -> Result<Vec<RecordId>, MemoryError> {
        let path = path.as_ref();
        let default_kind = path
            .parent()
            .and_then(|parent| parent.file_name())
            .and_then(|name| name.to_str())
            .and_then(|name| name.parse().ok())
            .unwrap_or(options.default_kind);
        self.ingest_path(path, &path.display().to_string(), default_kind, options)
    }

    /// Ingest every matching file under `root`.
    ///
    /// A top-level directory named after a kind (`songs/`, `feedback/`)
    /// sets the default kind of the files beneath it.
    pub fn ingest_dir(
        &self,
        root: impl AsRef<Path>,
        options: &IngestOptions,
    ) -> Result<IngestReport, MemoryError> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(MemoryError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("ingest directory not found: {}", root.display()),
            )));
        }

        let mut report = IngestReport::default();
        for path in discover_documents(root, options) {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let default_kind = relative
                .components()
                .next()
                .filter(|_| relative.components().count() > 1)
                .and_then(|component| component.as_os_str().to_str())
                .and_then(|name| name.parse().ok())
                .unwrap_or(options.default_kind);
            let document = relative.to_string_lossy().replace('\\', "/");

            report.attempted += 1;
            match self.ingest_path(&path, &document, default_kind, options) {
                Ok(ids) => {
                    report.succeeded += 1;
                    report.records.extend(ids);
                }
                Err(err) => {
                    warn!(
                        "failed to ingest document (path={}, error={})",
                        path.display(),
                        err
                    );
                    report.failed.push(IngestFailure {
                        path,
                        error: err.to_string(),
                    });
                }
            }
        }
        info!(
            "ingested directory (root={}, attempted={}, succeeded={}, failed={}, records={})",
            root.display(),
            report.attempted,
            report.succeeded,
            report.failed.len(),
            report.records.len()
        );
        Ok(report)
    }

    fn ingest_path(
        &self,
        path: &Path,
        document_name: &str,
        default_kind: RecordKind,
        options: &IngestOptions,
    ) -> Result<Vec<RecordId>, MemoryError> {
        let contents = std::fs::read_to_string(path)?;
        let mut document = IngestDocument::parse(&contents)?;
        document
            .metadata
            .entry(DOCUMENT_KEY.to_string())
            .or_insert_with(|| MetaValue::from(document_name));
        let ids = self.ingest_document(document, default_kind, options.chunk_max_chars)?;
        debug!(
            "ingested document (path={}, records={})",
            path.display(),
            ids.len()
        );
        Ok(ids)
    }

    /// Retrieve up to `max_results` records.
    pub fn retrieve(
        &self,
        query: impl Into<RecallQuery>,
        max_results: usize,
        filter: Option<&RecordFilter>,
    ) -> Result<Vec<ScoredRecord>, MemoryError> {
        self.retriever.retrieve(query, max_results, filter)
    }

    pub fn retrieve_with_options(
        &self,
        query: impl Into<RecallQuery>,
        filter: Option<&RecordFilter>,
        options: RecallOptions,
    ) -> Result<Vec<ScoredRecord>, MemoryError> {
        self.retriever.retrieve_with_options(query, filter, options)
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats::collect(&self.store, &self.index)
    }
}

/// Files under `root` with an accepted extension, in path order.
fn discover_documents(root: &Path, options: &IngestOptions) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|extension| extension.to_str())
                .is_some_and(|extension| options.accepts(extension))
        })
        .map(|entry| entry.into_path())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ArtistMemory, EMBEDDINGS_FILE, RECORDS_FILE};
    use crate::embedding::HashingEmbedder;
    use crate::{IngestOptions, MemoryError, MetaValue, NewRecord, RecordFilter, RecordKind};
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn embedder(dimensions: usize) -> Arc<HashingEmbedder> {
        Arc::new(HashingEmbedder::new(dimensions))
    }

    fn write(path: &std::path::Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create dir");
        }
        fs::write(path, contents).expect("write");
    }

    #[test]
    fn ingest_indexes_records() {
        let memory = ArtistMemory::in_memory(embedder(64));
        let id = memory
            .ingest(
                NewRecord::new(RecordKind::Song, "love in the rain")
                    .with_meta("title", "Rain")
                    .with_meta("genre", "pop"),
            )
            .expect("ingest");
        assert!(memory.index().contains(&id));
        let hits = memory.retrieve("love", 3, None).expect("retrieve");
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn ingest_dir_reports_each_document() {
        let temp = tempdir().expect("tempdir");
        let docs = temp.path().join("docs");
        write(
            &docs.join("songs").join("rain.md"),
            "---\ntitle: Rain\ngenre: pop/r&b\n---\nlove in the rain",
        );
        write(
            &docs.join("feedback").join("rain-review.md"),
            "---\ntitle: Rain\nsource: blog\n---\nThe chorus is huge.",
        );
        write(&docs.join("songs").join("broken.md"), "---\ntitle: Broken\n---\nno genre");
        write(&docs.join("notes.json"), "{}");

        let memory = ArtistMemory::in_memory(embedder(64));
        let report = memory
            .ingest_dir(&docs, &IngestOptions::default())
            .expect("ingest");
        assert_eq!(report.attempted, 3);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].path.ends_with("broken.md"));
        assert_eq!(report.records.len(), 2);

        let feedback = memory
            .store()
            .list(Some(RecordFilter::kind(RecordKind::Feedback)))
            .iter()
            .collect::<Vec<_>>();
        assert_eq!(feedback.len(), 1);
        assert_eq!(
            feedback[0].meta("document"),
            Some(&MetaValue::from("feedback/rain-review.md"))
        );
    }

    #[test]
    fn non_finite_frontmatter_fails_alone_and_store_reopens() {
        let temp = tempdir().expect("tempdir");
        let docs = temp.path().join("docs");
        write(
            &docs.join("songs").join("a.md"),
            "---\ntitle: A\ngenre: pop\nbpm: .nan\n---\nlove at a tempo",
        );
        write(
            &docs.join("songs").join("b.md"),
            "---\ntitle: B\ngenre: pop\nbpm: 96\n---\nlove in b minor",
        );
        let root = temp.path().join("memory");
        {
            let memory = ArtistMemory::open(&root, embedder(64)).expect("open");
            let report = memory
                .ingest_dir(&docs, &IngestOptions::default())
                .expect("ingest");
            assert_eq!(report.attempted, 2);
            assert_eq!(report.succeeded, 1);
            assert!(report.failed[0].path.ends_with("a.md"));
        }

        let memory = ArtistMemory::open(&root, embedder(64)).expect("reopen");
        let records = memory.store().list(None).iter().collect::<Vec<_>>();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title(), Some("B"));
        assert_eq!(records[0].meta("bpm"), Some(&MetaValue::Integer(96)));
    }

    #[test]
    fn missing_ingest_dir_is_an_error() {
        let memory = ArtistMemory::in_memory(embedder(64));
        let err = memory
            .ingest_dir("/nonexistent/maistro/docs", &IngestOptions::default())
            .expect_err("missing");
        assert!(matches!(err, MemoryError::Io(_)));
    }

    #[test]
    fn duplicate_document_ids_are_rejected_before_writing() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("songs").join("rain.md");
        write(&path, "---\nid: rain\ntitle: Rain\ngenre: pop\n---\nlove");
        let memory = ArtistMemory::in_memory(embedder(64));
        memory
            .ingest_file(&path, &IngestOptions::default())
            .expect("first");
        let err = memory
            .ingest_file(&path, &IngestOptions::default())
            .expect_err("duplicate");
        assert!(matches!(err, MemoryError::Duplicate(_)));
        assert_eq!(memory.store().len(), 1);
    }

    #[test]
    fn reopen_reindexes_under_new_model() {
        let temp = tempdir().expect("tempdir");
        let id = {
            let memory = ArtistMemory::open(temp.path(), embedder(64)).expect("open");
            memory
                .ingest(
                    NewRecord::new(RecordKind::Song, "love")
                        .with_meta("title", "Love")
                        .with_meta("genre", "pop"),
                )
                .expect("ingest")
        };
        assert!(temp.path().join(RECORDS_FILE).exists());
        assert!(temp.path().join(EMBEDDINGS_FILE).exists());

        let memory = ArtistMemory::open(temp.path(), embedder(128)).expect("reopen");
        assert!(memory.index().contains(&id));
        assert_eq!(memory.index().model(), "hashing-v1-128");
        assert_eq!(memory.stats().indexed, 1);
    }
}
