//! Error types for config loading and validation.

use thiserror::Error;

/// Errors returned while loading or validating `maistro.json5` layers.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config layer could not be read from disk.
    #[error("failed to read config: {0}")]
    ReadFailed(#[from] std::io::Error),
    /// A config layer is not valid JSON5.
    #[error("failed to parse config: {0}")]
    ParseFailed(#[from] json5::Error),
    /// The merged value does not decode into `MaistroConfig`.
    #[error("failed to decode config: {0}")]
    DecodeFailed(#[from] serde_json::Error),
    /// A field failed schema validation; `path` is `layer:dotted.field`.
    #[error("invalid config at {path}: {message}")]
    InvalidField { path: String, message: String },
    /// A cross-field or range check failed.
    #[error("invalid config: {0}")]
    Invalid(String),
}
