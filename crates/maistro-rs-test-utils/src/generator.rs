use async_trait::async_trait;
use maistro_rs_protocol::{CollaboratorError, Generator, PromptContext};
use parking_lot::Mutex;
use std::sync::Arc;

/// Generator that always returns the same text.
#[derive(Debug, Clone)]
pub struct FixedGenerator {
    response: String,
}

impl FixedGenerator {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Generator for FixedGenerator {
    async fn generate(&self, _context: &PromptContext) -> Result<String, CollaboratorError> {
        Ok(self.response.clone())
    }
}

/// Generator that records every context it receives.
#[derive(Debug, Clone)]
pub struct RecordingGenerator {
    response: String,
    seen: Arc<Mutex<Vec<PromptContext>>>,
}

impl RecordingGenerator {
    pub fn new(response: impl Into<String>) -> (Self, Arc<Mutex<Vec<PromptContext>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                response: response.into(),
                seen: seen.clone(),
            },
            seen,
        )
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    async fn generate(&self, context: &PromptContext) -> Result<String, CollaboratorError> {
        self.seen.lock().push(context.clone());
        Ok(self.response.clone())
    }
}

/// Generator that always fails.
#[derive(Debug, Clone, Default)]
pub struct FailingGenerator;

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, _context: &PromptContext) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Failed("generator offline".to_string()))
    }
}
