//! Persona configuration, context assembly and artist sessions for maistro.
//!
//! Sessions retrieve records from artist memory and compose them with the
//! persona into budget-bounded prompt contexts for external generators.

pub mod assembler;
pub mod error;
pub mod persona;
pub mod session;
pub mod task;

/// Context assembly.
pub use assembler::{ContextAssembler, persona_block, record_block};
/// Core error type.
pub use error::CoreError;
/// Persona configuration.
pub use persona::{MusicalProfile, PersonaConfig, Release, StyleRules};
/// Session facade.
pub use session::{
    ArtistSession, Composition, ingest_options_from_config, recall_options_from_config,
};
/// Generation tasks.
pub use task::GenerationTask;
