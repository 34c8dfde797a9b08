//! Path resolution for layer discovery.

use crate::ConfigError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Resolve the directory layers are discovered from.
///
/// A directory that does not exist yet is used as given, so a fresh artist
/// workspace can still load user and runtime layers.
pub(super) fn resolve_cwd(cwd: &Path) -> Result<PathBuf, ConfigError> {
    match cwd.canonicalize() {
        Ok(resolved) => Ok(resolved),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(cwd.to_path_buf()),
        Err(err) => Err(ConfigError::ReadFailed(err)),
    }
}

/// Identity of a layer file, shared by every spelling of the same path.
pub(super) fn layer_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Nearest ancestor of `cwd` (itself included) holding one of `markers`.
pub(super) fn project_root(cwd: &Path, markers: &[String]) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|dir| markers.iter().any(|marker| dir.join(marker).exists()))
        .map(Path::to_path_buf)
}
