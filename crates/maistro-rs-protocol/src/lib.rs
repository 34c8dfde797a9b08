//! Shared payload types and collaborator interfaces for Maistro.

mod collaborator;
mod context;

pub use collaborator::{CollaboratorError, Generator, Publisher};
pub use context::{
    BLOCK_SEPARATOR, BlockRole, BudgetUnit, ContextBudget, PromptBlock, PromptContext,
};
