//! Generation tasks and their instruction blocks.

use crate::persona::{PersonaConfig, push_list};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of output requested from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationTask {
    /// Casual conversation with a listener.
    Chat,
    /// Lyrics for a new song.
    Song,
    /// Short social media post.
    Post,
}

impl GenerationTask {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationTask::Chat => "chat",
            GenerationTask::Song => "song",
            GenerationTask::Post => "post",
        }
    }

    /// Fixed instruction text for the task.
    pub fn instruction(self) -> &'static str {
        match self {
            GenerationTask::Chat => {
                "CURRENT TASK: You're chatting with a user. Don't reference background details \
or memories unless directly relevant. Talk like a normal person would in a casual \
conversation. Be CONCISE. ALWAYS ensure you're following the rules before replying."
            }
            GenerationTask::Song => {
                "CURRENT TASK: You're writing lyrics for a new song. Use the songs and feedback \
below as reference for your voice and avoid repeating earlier lyrics. ALWAYS ensure you're \
following the rules before replying."
            }
            GenerationTask::Post => {
                "CURRENT TASK: You're writing a single social media post in your own voice. Keep \
it under 280 characters with no hashtags unless the rules ask for them. ALWAYS ensure you're \
following the rules before replying."
            }
        }
    }

    /// Task block text: instruction plus the persona's task-specific style.
    pub fn render(self, persona: &PersonaConfig) -> String {
        let mut sections = vec![self.instruction().to_string()];
        push_list(&mut sections, "Style for this task", persona.style.for_task(self));
        sections.join("\n\n")
    }
}

impl fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
