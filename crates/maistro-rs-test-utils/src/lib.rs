//! Test helpers shared across maistro crates.

pub mod fixtures;
pub mod generator;
pub mod publisher;

pub use fixtures::{base_time, feedback, song, write_persona_dir};
pub use generator::{FailingGenerator, FixedGenerator, RecordingGenerator};
pub use publisher::{RecordingPublisher, RejectingPublisher};
