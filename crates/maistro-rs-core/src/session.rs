//! Artist session: memory, persona and assembly wired from config.

use crate::assembler::ContextAssembler;
use crate::error::CoreError;
use crate::persona::PersonaConfig;
use crate::task::GenerationTask;
use log::{debug, info, warn};
use maistro_rs_config::{LayeredConfig, MaistroConfig};
use maistro_rs_memory::{
    ArtistMemory, HashingEmbedder, IngestOptions, IngestReport, MemoryStats, RecallOptions,
    RecallQuery, RecordFilter, RecordKind, ScoredRecord,
};
use maistro_rs_protocol::{CollaboratorError, ContextBudget, Generator, PromptContext, Publisher};
use std::path::Path;
use std::sync::Arc;

/// Prompt context together with the records it was built from.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    pub context: PromptContext,
    /// Retrieved records in rank order, including any dropped by the budget.
    pub records: Vec<ScoredRecord>,
}

/// Recall settings taken from config.
pub fn recall_options_from_config(config: &MaistroConfig) -> RecallOptions {
    let recall = &config.memory.recall;
    RecallOptions {
        max_results: recall.max_results,
        min_score: recall.min_score,
        deadline: recall.deadline(),
        include_superseded: recall.include_superseded,
    }
}

/// Ingestion settings taken from config.
pub fn ingest_options_from_config(config: &MaistroConfig) -> IngestOptions {
    IngestOptions {
        chunk_max_chars: config.memory.ingest.chunk_max_chars,
        extensions: config.memory.ingest.extensions.clone(),
        default_kind: RecordKind::Song,
    }
}

/// One artist's memory, persona and collaborators.
#[derive(Clone)]
pub struct ArtistSession {
    memory: ArtistMemory,
    persona: Arc<PersonaConfig>,
    recall: RecallOptions,
    ingest: IngestOptions,
    budget: ContextBudget,
    generator: Option<Arc<dyn Generator>>,
    publisher: Option<Arc<dyn Publisher>>,
}

impl ArtistSession {
    /// Open persistent memory and load the persona named by `config`.
    ///
    /// Relative paths resolve against `base_dir`.
    pub fn open(config: &MaistroConfig, base_dir: impl AsRef<Path>) -> Result<Self, CoreError> {
        let base_dir = base_dir.as_ref();
        let Some(persona_path) = config.persona_path(base_dir) else {
            return Err(CoreError::Persona(
                "artist.persona_path is not configured".to_string(),
            ));
        };
        let mut persona = PersonaConfig::load_from_path(&persona_path)?;
        if let Some(name) = config.artist.name.as_ref() {
            persona.name = name.clone();
        }
        let memory_path = config.memory_path(base_dir);
        let embedder = Arc::new(HashingEmbedder::new(config.memory.embedding.dimensions));
        let memory = ArtistMemory::open(&memory_path, embedder)?;
        info!(
            "opened artist session (artist={}, memory={}, records={})",
            persona.name,
            memory_path.display(),
            memory.store().len()
        );
        Ok(Self::new(memory, persona, config))
    }

    /// Open from a layered config, resolving paths against its base directory.
    pub fn from_layered(layered: &LayeredConfig) -> Result<Self, CoreError> {
        Self::open(&layered.config, &layered.base_dir)
    }

    /// Build a session from parts.
    pub fn new(memory: ArtistMemory, persona: PersonaConfig, config: &MaistroConfig) -> Self {
        Self {
            memory,
            persona: Arc::new(persona),
            recall: recall_options_from_config(config),
            ingest: ingest_options_from_config(config),
            budget: config.context.budget(),
            generator: None,
            publisher: None,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_publisher(mut self, publisher: Arc<dyn Publisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn memory(&self) -> &ArtistMemory {
        &self.memory
    }

    pub fn persona(&self) -> &PersonaConfig {
        &self.persona
    }

    pub fn budget(&self) -> ContextBudget {
        self.budget
    }

    pub fn recall_options(&self) -> RecallOptions {
        self.recall
    }

    /// Retrieve records for `query` and assemble them under the budget.
    pub fn compose(
        &self,
        query: impl Into<RecallQuery>,
        task: Option<GenerationTask>,
    ) -> Result<Composition, CoreError> {
        self.compose_filtered(query, task, None)
    }

    /// Like [`compose`](Self::compose), restricted to records matching `filter`.
    pub fn compose_filtered(
        &self,
        query: impl Into<RecallQuery>,
        task: Option<GenerationTask>,
        filter: Option<&RecordFilter>,
    ) -> Result<Composition, CoreError> {
        let records = self
            .memory
            .retrieve_with_options(query, filter, self.recall)?;
        let assembler = match task {
            Some(task) => ContextAssembler::with_task(task),
            None => ContextAssembler::new(),
        };
        let context = assembler.assemble(
            &self.persona,
            records.iter().map(|scored| scored.record.as_ref()),
            self.budget,
        )?;
        if context.truncated() {
            warn!(
                "context truncated (kept={}, dropped={}, budget={})",
                context.record_blocks().count(),
                context.dropped,
                self.budget.limit
            );
        }
        Ok(Composition { context, records })
    }

    /// Compose a context and hand it to the generator.
    pub async fn generate(
        &self,
        query: impl Into<RecallQuery>,
        task: GenerationTask,
    ) -> Result<String, CoreError> {
        let Some(generator) = self.generator.as_ref() else {
            return Err(CollaboratorError::Unavailable("no generator configured".to_string()).into());
        };
        let composition = self.compose(query, Some(task))?;
        let output = generator.generate(&composition.context).await?;
        debug!(
            "generated output (task={}, output_len={})",
            task,
            output.len()
        );
        Ok(output)
    }

    /// Hand finished text to the publisher, returning the post id.
    pub async fn publish(&self, text: &str) -> Result<String, CoreError> {
        let Some(publisher) = self.publisher.as_ref() else {
            return Err(CollaboratorError::Unavailable("no publisher configured".to_string()).into());
        };
        if text.trim().is_empty() {
            return Err(CollaboratorError::Rejected("post text is empty".to_string()).into());
        }
        let post_id = publisher.post(text).await?;
        info!("published post (post_id={}, text_len={})", post_id, text.len());
        Ok(post_id)
    }

    /// Ingest documents under `dir` using the configured ingest settings.
    pub fn ingest_dir(&self, dir: impl AsRef<Path>) -> Result<IngestReport, CoreError> {
        Ok(self.memory.ingest_dir(dir, &self.ingest)?)
    }

    pub fn stats(&self) -> MemoryStats {
        self.memory.stats()
    }
}
