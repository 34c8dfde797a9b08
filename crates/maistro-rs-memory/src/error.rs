//! Error types for memory operations.

use crate::model::RecordId;

/// Errors returned by the record store, embedding index and helpers.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// Record failed kind or metadata validation.
    #[error("validation error: {0}")]
    Validation(String),
    /// Explicit record id is already in use.
    #[error("duplicate record id: {0}")]
    Duplicate(RecordId),
    /// Record id is unknown to the store.
    #[error("record not found: {0}")]
    NotFound(RecordId),
    /// Parameter outside its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Query embedding was produced by a different model than the index.
    #[error("embedding model mismatch (index={index}, query={query})")]
    EmbeddingMismatch { index: String, query: String },
    /// Search aborted because the caller deadline passed.
    #[error("search deadline exceeded")]
    DeadlineExceeded,
    /// Persisted file was written by a newer schema.
    #[error("unsupported schema version: {0}")]
    UnsupportedSchema(u32),
    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization error.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    /// Frontmatter parse error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
