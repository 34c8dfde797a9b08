//! Layered configuration loader.
//!
//! Discovers configuration layers (user, project, cwd, repo, runtime),
//! validates each against the schema, merges them and produces the
//! effective `MaistroConfig`.

mod layer_io;
mod merge;
mod schema;
mod utils;


use crate::{ConfigError, MaistroConfig};
use log::{debug, info};
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Default config filename in local layers.
const DEFAULT_CONFIG_FILE: &str = "maistro.json5";
/// Default config directory under user or repo roots.
const DEFAULT_CONFIG_DIR: &str = ".maistro";
/// Marker files/dirs that identify a project root.
const DEFAULT_PROJECT_ROOT_MARKERS: &[&str] = &[".git"];

/// Effective config plus metadata about which layers were loaded.
#[derive(Debug, Clone)]
pub struct LayeredConfig {
    /// The merged, validated config.
    pub config: MaistroConfig,
    /// Layers that contributed, lowest precedence first.
    pub layers: Vec<ConfigLayer>,
    /// Directory relative config paths resolve against.
    pub base_dir: PathBuf,
}

/// Origin for a single config layer in the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayerSource {
    /// User-specific configuration.
    User,
    /// Project root configuration.
    Project,
    /// Current working directory configuration.
    Cwd,
    /// Repo-local `.maistro` configuration.
    Repo,
    /// Runtime overrides (highest precedence).
    Runtime,
}

/// Metadata about a loaded config layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLayer {
    pub source: ConfigLayerSource,
    pub path: PathBuf,
}

/// Options controlling layered config discovery and overrides.
#[derive(Debug, Clone)]
pub struct LayeredConfigOptions {
    /// Working directory used to resolve local layers.
    pub cwd: PathBuf,
    /// Optional user config path (defaults to `~/.maistro/maistro.json5`).
    pub user_config_path: Option<PathBuf>,
    /// Runtime override config paths applied last.
    pub runtime_paths: Vec<PathBuf>,
    /// Marker files/dirs used to detect the project root.
    pub project_root_markers: Vec<String>,
}

impl LayeredConfigOptions {
    /// Create options with default layer locations for the provided cwd.
    pub fn new(cwd: impl AsRef<Path>) -> Self {
        Self {
            cwd: cwd.as_ref().to_path_buf(),
            user_config_path: layer_io::default_user_config_path(),
            runtime_paths: Vec::new(),
            project_root_markers: DEFAULT_PROJECT_ROOT_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
        }
    }

    /// Add a runtime override config path that is applied last.
    pub fn with_runtime_path(mut self, path: impl AsRef<Path>) -> Self {
        self.runtime_paths.push(path.as_ref().to_path_buf());
        self
    }
}

impl MaistroConfig {
    /// Load a single config from a path (no layering).
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        info!("loading config from path: {}", path.as_ref().display());
        let contents = fs::read_to_string(path)?;
        let value: Value = json5::from_str(&contents)?;
        config_from_value(value, "config")
    }

    /// Load a single config from JSON5 contents (no layering).
    pub fn load_from_str(contents: &str) -> Result<Self, ConfigError> {
        debug!("loading config from raw contents (len={})", contents.len());
        let value: Value = json5::from_str(contents)?;
        config_from_value(value, "config")
    }

    /// Load a layered config stack using the default layer locations.
    pub fn load_layered(cwd: impl AsRef<Path>) -> Result<LayeredConfig, ConfigError> {
        info!(
            "loading layered config with defaults (cwd={})",
            cwd.as_ref().display()
        );
        Self::load_layered_with_options(LayeredConfigOptions::new(cwd))
    }

    /// Load a layered config stack using explicit layer locations and overrides.
    ///
    /// Layer precedence (low -> high): user, project, cwd, repo, runtime.
    pub fn load_layered_with_options(
        options: LayeredConfigOptions,
    ) -> Result<LayeredConfig, ConfigError> {
        let cwd = utils::resolve_cwd(&options.cwd)?;
        debug!("resolved config cwd (cwd={})", cwd.display());
        let project_root = utils::project_root(&cwd, &options.project_root_markers);
        match project_root.as_ref() {
            Some(root) => debug!("resolved project root (root={})", root.display()),
            None => debug!("no project root found, skipping project and repo layers"),
        }

        let mut candidates = Vec::new();
        if let Some(path) = options.user_config_path.clone() {
            candidates.push((ConfigLayerSource::User, path));
        }
        if let Some(root) = project_root.as_ref() {
            candidates.push((ConfigLayerSource::Project, root.join(DEFAULT_CONFIG_FILE)));
        }
        candidates.push((ConfigLayerSource::Cwd, cwd.join(DEFAULT_CONFIG_FILE)));
        if let Some(root) = project_root.as_ref() {
            candidates.push((
                ConfigLayerSource::Repo,
                root.join(DEFAULT_CONFIG_DIR).join(DEFAULT_CONFIG_FILE),
            ));
        }

        let mut layers = Vec::new();
        let mut merged = Value::Object(serde_json::Map::new());
        let mut seen_paths = HashSet::new();
        for (source, path) in candidates {
            if !seen_paths.insert(utils::layer_key(&path)) {
                debug!(
                    "skipping duplicate layer (source={:?}, path={})",
                    source,
                    path.display()
                );
                continue;
            }
            let Some(layer) = layer_io::load_optional_layer(source, &path)? else {
                continue;
            };
            merge::merge_layer(&mut merged, layer.value);
            layers.push(layer.meta);
        }

        for runtime_path in &options.runtime_paths {
            let layer = layer_io::load_required_layer(ConfigLayerSource::Runtime, runtime_path)?;
            debug!("loaded runtime layer (path={})", runtime_path.display());
            merge::merge_layer(&mut merged, layer.value);
            layers.push(layer.meta);
        }

        let config = config_from_value(merged, "effective")?;
        info!("layered config loaded (layers={})", layers.len());
        Ok(LayeredConfig {
            config,
            layers,
            base_dir: project_root.unwrap_or(cwd),
        })
    }

    /// Validate configuration invariants that cannot be expressed in serde.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.context.budget == 0 {
            return Err(ConfigError::Invalid(
                "context.budget must be greater than zero".to_string(),
            ));
        }
        if self.memory.embedding.dimensions == 0 {
            return Err(ConfigError::Invalid(
                "memory.embedding.dimensions must be greater than zero".to_string(),
            ));
        }
        if self.memory.recall.max_results == 0 {
            return Err(ConfigError::Invalid(
                "memory.recall.max_results must be greater than zero".to_string(),
            ));
        }
        if self.memory.ingest.chunk_max_chars == Some(0) {
            return Err(ConfigError::Invalid(
                "memory.ingest.chunk_max_chars must be greater than zero".to_string(),
            ));
        }
        if self
            .artist
            .name
            .as_ref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(ConfigError::Invalid("artist.name is blank".to_string()));
        }
        Ok(())
    }
}

/// Internal representation of a loaded config layer.
#[derive(Debug, Clone)]
struct LoadedLayer {
    meta: ConfigLayer,
    value: Value,
}

fn config_from_value(value: Value, label: &str) -> Result<MaistroConfig, ConfigError> {
    schema::validate_layer_schema(&value, label)?;
    let config: MaistroConfig = serde_json::from_value(value)?;
    config.validate()?;
    Ok(config)
}
