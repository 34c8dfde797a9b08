use async_trait::async_trait;
use maistro_rs_protocol::{CollaboratorError, Publisher};
use parking_lot::Mutex;
use std::sync::Arc;

/// Publisher that keeps posted text in memory and returns sequential ids.
#[derive(Debug, Clone)]
pub struct RecordingPublisher {
    posts: Arc<Mutex<Vec<String>>>,
}

impl RecordingPublisher {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let posts = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                posts: posts.clone(),
            },
            posts,
        )
    }
}

#[async_trait]
impl Publisher for RecordingPublisher {
    async fn post(&self, text: &str) -> Result<String, CollaboratorError> {
        let mut posts = self.posts.lock();
        posts.push(text.to_string());
        Ok(format!("post-{}", posts.len()))
    }
}

/// Publisher that rejects every post.
#[derive(Debug, Clone, Default)]
pub struct RejectingPublisher;

#[async_trait]
impl Publisher for RejectingPublisher {
    async fn post(&self, _text: &str) -> Result<String, CollaboratorError> {
        Err(CollaboratorError::Rejected("posting disabled".to_string()))
    }
}
