//! Interfaces to external generation and posting collaborators.

use crate::context::PromptContext;
use async_trait::async_trait;

/// Errors returned by external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    /// Collaborator is not configured for this session.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    /// Collaborator rejected the request.
    #[error("request rejected: {0}")]
    Rejected(String),
    /// Collaborator failed while handling the request.
    #[error("collaborator failed: {0}")]
    Failed(String),
}

/// Text or audio generation backend fed with assembled prompt contexts.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce output for a prompt context.
    async fn generate(&self, context: &PromptContext) -> Result<String, CollaboratorError>;
}

/// Social posting collaborator.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Post finished text, returning the platform identifier of the post.
    async fn post(&self, text: &str) -> Result<String, CollaboratorError>;
}
