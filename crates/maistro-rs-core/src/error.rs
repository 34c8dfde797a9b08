//! Error types for the core session crate.

use maistro_rs_config::ConfigError;
use maistro_rs_memory::MemoryError;
use maistro_rs_protocol::CollaboratorError;
use thiserror::Error;

/// Errors returned by persona loading, assembly and session operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Record store, index or retrieval error.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
    /// Config loading or validation error.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Persona file missing, malformed or incomplete.
    #[error("persona error: {0}")]
    Persona(String),
    /// Non-truncatable blocks alone exceed the context budget.
    #[error("context budget exceeded (required={required}, budget={budget})")]
    BudgetExceeded { required: usize, budget: usize },
    /// Generator or publisher failure.
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),
}
