//! Artist memory for maistro: record store, embedding index and recall.

pub mod artist;
pub mod embedding;
pub mod error;
pub mod index;
pub mod ingest;
mod journal;
pub mod model;
pub mod recall;
pub mod stats;
pub mod store;

/// Store, index and retriever bundle.
pub use artist::{ArtistMemory, EMBEDDINGS_FILE, RECORDS_FILE};
/// Embedding interface and default embedder.
pub use embedding::{Embedder, Embedding, HashingEmbedder, cosine_similarity};
/// Memory error type.
pub use error::MemoryError;
/// Embedding index.
pub use index::{EmbeddingEntry, EmbeddingIndex, SearchHit};
/// Document ingestion.
pub use ingest::{IngestDocument, IngestFailure, IngestOptions, IngestReport};
/// Record model.
pub use model::{MetaValue, Metadata, NewRecord, Record, RecordFilter, RecordId, RecordKind};
/// Recall queries and options.
pub use recall::{RecallOptions, RecallQuery, Retriever, ScoredRecord};
/// Memory statistics.
pub use stats::{DocumentStats, MemoryStats};
/// Record store.
pub use store::{Listing, RecordStore};
