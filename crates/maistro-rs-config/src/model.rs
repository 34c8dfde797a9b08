//! Configuration schema for maistro.

use maistro_rs_protocol::{BudgetUnit, ContextBudget};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root config for a maistro artist.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MaistroConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub artist: ArtistConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub context: ContextConfig,
}

impl MaistroConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> MaistroConfigBuilder {
        MaistroConfigBuilder::new()
    }

    /// Memory directory, resolved against `base` when relative.
    pub fn memory_path(&self, base: &Path) -> PathBuf {
        base.join(&self.memory.path)
    }

    /// Persona location, resolved against `base` when relative.
    pub fn persona_path(&self, base: &Path) -> Option<PathBuf> {
        self.artist
            .persona_path
            .as_ref()
            .map(|path| base.join(path))
    }
}

/// Builder for assembling a `MaistroConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct MaistroConfigBuilder {
    config: MaistroConfig,
}

impl MaistroConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: MaistroConfig::default(),
        }
    }

    pub fn artist(mut self, artist: ArtistConfig) -> Self {
        self.config.artist = artist;
        self
    }

    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    pub fn context(mut self, context: ContextConfig) -> Self {
        self.config.context = context;
        self
    }

    pub fn build(self) -> MaistroConfig {
        self.config
    }
}

/// Artist identity and persona location.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ArtistConfig {
    /// Display name; overrides the persona name when set.
    #[serde(default)]
    pub name: Option<String>,
    /// Persona JSON5 file or directory.
    #[serde(default)]
    pub persona_path: Option<PathBuf>,
}

/// Persistent memory settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryConfig {
    /// Directory holding the record and embedding journals.
    #[serde(default = "default_memory_path")]
    pub path: PathBuf,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub recall: RecallConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            path: default_memory_path(),
            embedding: EmbeddingConfig::default(),
            recall: RecallConfig::default(),
            ingest: IngestConfig::default(),
        }
    }
}

fn default_memory_path() -> PathBuf {
    PathBuf::from(".maistro/memory")
}

/// Embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmbeddingConfig {
    /// Vector width of the hashing embedder.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
        }
    }
}

fn default_dimensions() -> usize {
    256
}

/// Recall settings used when composing prompts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecallConfig {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default)]
    pub min_score: Option<f32>,
    /// Index scan deadline in milliseconds.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
    #[serde(default)]
    pub include_superseded: bool,
}

impl RecallConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
            min_score: None,
            deadline_ms: None,
            include_superseded: false,
        }
    }
}

fn default_max_results() -> usize {
    5
}

/// Document ingestion settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestConfig {
    /// Chunk size limit; `null` disables chunking.
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: Option<usize>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_max_chars: default_chunk_max_chars(),
            extensions: default_extensions(),
        }
    }
}

fn default_chunk_max_chars() -> Option<usize> {
    Some(2000)
}

fn default_extensions() -> Vec<String> {
    vec!["md".to_string(), "txt".to_string()]
}

/// Prompt context size settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContextConfig {
    #[serde(default = "default_budget")]
    pub budget: usize,
    #[serde(default)]
    pub unit: BudgetUnit,
}

impl ContextConfig {
    pub fn budget(&self) -> ContextBudget {
        ContextBudget {
            limit: self.budget,
            unit: self.unit,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            budget: default_budget(),
            unit: BudgetUnit::default(),
        }
    }
}

fn default_budget() -> usize {
    6000
}
