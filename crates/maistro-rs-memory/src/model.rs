//! Creative record model shared by the store, index and retriever.

use crate::error::MemoryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Stable record identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Kind of creative artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    /// Song lyrics and notes.
    Song,
    /// Review or critique of a song.
    Feedback,
}

impl RecordKind {
    /// Metadata keys every record of this kind must carry.
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            RecordKind::Song => &["title", "genre"],
            RecordKind::Feedback => &["title", "source"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RecordKind::Song => "song",
            RecordKind::Feedback => "feedback",
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordKind {
    type Err = MemoryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "song" | "songs" => Ok(RecordKind::Song),
            "feedback" | "review" => Ok(RecordKind::Feedback),
            other => Err(MemoryError::Validation(format!(
                "unrecognized record kind: {other}"
            ))),
        }
    }
}

/// Scalar metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl MetaValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, MetaValue::Text(value) if value.trim().is_empty())
    }

    /// Equality with case-insensitive comparison for text.
    pub fn matches(&self, other: &MetaValue) -> bool {
        match (self, other) {
            (MetaValue::Text(left), MetaValue::Text(right)) => {
                left.trim().eq_ignore_ascii_case(right.trim())
            }
            (MetaValue::Integer(left), MetaValue::Float(right))
            | (MetaValue::Float(right), MetaValue::Integer(left)) => (*left as f64) == *right,
            (left, right) => left == right,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Bool(value) => write!(f, "{value}"),
            MetaValue::Integer(value) => write!(f, "{value}"),
            MetaValue::Float(value) => write!(f, "{value}"),
            MetaValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<&str> for MetaValue {
    fn from(value: &str) -> Self {
        MetaValue::Text(value.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(value: String) -> Self {
        MetaValue::Text(value)
    }
}

impl From<i64> for MetaValue {
    fn from(value: i64) -> Self {
        MetaValue::Integer(value)
    }
}

impl From<usize> for MetaValue {
    fn from(value: usize) -> Self {
        MetaValue::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for MetaValue {
    fn from(value: f64) -> Self {
        MetaValue::Float(value)
    }
}

impl From<bool> for MetaValue {
    fn from(value: bool) -> Self {
        MetaValue::Bool(value)
    }
}

/// Schema-flexible metadata attached to a record.
pub type Metadata = BTreeMap<String, MetaValue>;

/// Record submitted to the store; id and timestamp are optional.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// Explicit identifier; assigned by the store when absent.
    pub id: Option<RecordId>,
    /// Artifact kind.
    pub kind: RecordKind,
    /// Text content.
    pub body: String,
    /// Scalar metadata.
    pub metadata: Metadata,
    /// Record this one corrects.
    pub supersedes: Option<RecordId>,
    /// Creation timestamp; assigned by the store when absent.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewRecord {
    pub fn new(kind: RecordKind, body: impl Into<String>) -> Self {
        Self {
            id: None,
            kind,
            body: body.into(),
            metadata: Metadata::new(),
            supersedes: None,
            created_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn superseding(mut self, id: impl Into<RecordId>) -> Self {
        self.supersedes = Some(id.into());
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Check body and per-kind required metadata.
    pub fn validate(&self) -> Result<(), MemoryError> {
        if self
            .id
            .as_ref()
            .is_some_and(|id| id.as_str().trim().is_empty())
        {
            return Err(MemoryError::Validation("record id is blank".to_string()));
        }
        if self.body.trim().is_empty() {
            return Err(MemoryError::Validation("record body is empty".to_string()));
        }
        if let Some(key) = self
            .metadata
            .iter()
            .find(|(_, value)| matches!(value, MetaValue::Float(number) if !number.is_finite()))
            .map(|(key, _)| key)
        {
            return Err(MemoryError::Validation(format!(
                "metadata {key} must be a finite number"
            )));
        }
        let missing = self
            .kind
            .required_keys()
            .iter()
            .filter(|key| {
                self.metadata
                    .get(**key)
                    .is_none_or(|value| value.is_blank())
            })
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(MemoryError::Validation(format!(
                "{} record missing required metadata: {}",
                self.kind,
                missing.join(", ")
            )));
        }
        Ok(())
    }
}

/// Immutable stored creative artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub kind: RecordKind,
    pub body: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub supersedes: Option<RecordId>,
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn meta(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    pub fn title(&self) -> Option<&str> {
        self.meta("title").and_then(MetaValue::as_str)
    }

    pub fn genre(&self) -> Option<&str> {
        self.meta("genre").and_then(MetaValue::as_str)
    }
}

/// Filter applied when listing or retrieving records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Restrict to one kind.
    pub kind: Option<RecordKind>,
    /// Metadata entries that must match.
    pub metadata: Vec<(String, MetaValue)>,
}

impl RecordFilter {
    pub fn kind(kind: RecordKind) -> Self {
        Self {
            kind: Some(kind),
            metadata: Vec::new(),
        }
    }

    /// Require a metadata value.
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<MetaValue>) -> Self {
        self.metadata.push((key.into(), value.into()));
        self
    }

    /// Require a genre tag.
    pub fn genre(self, genre: impl Into<String>) -> Self {
        self.with_meta("genre", genre.into())
    }

    pub fn matches(&self, record: &Record) -> bool {
        if self.kind.is_some_and(|kind| kind != record.kind) {
            return false;
        }
        self.metadata.iter().all(|(key, expected)| {
            record
                .meta(key)
                .is_some_and(|value| value.matches(expected))
        })
    }
}
