//! Public SDK surface for maistro.
//!
//! Re-exports the memory, config and assembly crates and provides a small
//! logging helper so binaries wire output up the same way.

/// Re-export for convenience.
pub use maistro_rs_config as config;
pub use maistro_rs_core as core;
/// Re-export for convenience.
pub use maistro_rs_memory as memory;
/// Re-export for convenience.
pub use maistro_rs_protocol as protocol;

pub use maistro_rs_config::{LayeredConfig, MaistroConfig};
pub use maistro_rs_core::{
    ArtistSession, Composition, ContextAssembler, CoreError, GenerationTask, PersonaConfig,
};
pub use maistro_rs_memory::{ArtistMemory, HashingEmbedder, RecallQuery, RecordFilter, RecordKind};
pub use maistro_rs_protocol::{ContextBudget, Generator, PromptContext, Publisher};

#[inline]
/// Initialize logging using env_logger if the "logging" feature is enabled.
///
/// No-op without the feature. Safe to call more than once.
pub fn init_logging() {
    #[cfg(feature = "logging")]
    {
        let _ = env_logger::try_init();
    }
}

/// Load layered config from `cwd` and open the artist session it names.
pub fn open_session(cwd: impl AsRef<std::path::Path>) -> Result<ArtistSession, CoreError> {
    let layered = MaistroConfig::load_layered(cwd)?;
    log::debug!(
        "loaded layered config (layers={}, base_dir={})",
        layered.layers.len(),
        layered.base_dir.display()
    );
    ArtistSession::from_layered(&layered)
}
