//! Append-only JSONL journal backing the record store and embedding index.

use crate::error::MemoryError;
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Current on-disk schema version.
pub(crate) const SCHEMA_VERSION: u32 = 1;

/// Event type persisted as one JSON line.
pub(crate) trait JournalEvent: Serialize + DeserializeOwned {
    /// Build the schema marker event.
    fn schema_marker(version: u32) -> Self;
    /// Version carried by a schema marker event.
    fn schema_version(&self) -> Option<u32>;
}

/// JSONL file with a leading schema marker.
#[derive(Debug, Clone)]
pub(crate) struct Journal {
    path: PathBuf,
}

impl Journal {
    /// Open a journal, writing the schema marker when the file is new.
    pub(crate) fn open<E: JournalEvent>(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let journal = Self { path };
        let len = match fs::metadata(&journal.path) {
            Ok(meta) => meta.len(),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => 0,
            Err(err) => return Err(err.into()),
        };
        let len = if len > 0 {
            journal.truncate_torn_tail()?
        } else {
            0
        };
        if len == 0 {
            journal.append(&E::schema_marker(SCHEMA_VERSION))?;
            debug!("created journal (path={})", journal.path.display());
        }
        Ok(journal)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Read every non-marker event in file order.
    ///
    /// A torn final line is skipped; corruption anywhere else is an error.
    pub(crate) fn load<E: JournalEvent>(&self) -> Result<Vec<E>, MemoryError> {
        let file = OpenOptions::new().read(true).open(&self.path)?;
        let lines = BufReader::new(file)
            .lines()
            .collect::<Result<Vec<_>, _>>()?;
        let last_index = lines.iter().rposition(|line| !line.trim().is_empty());

        let mut events = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let event: E = match serde_json::from_str(line) {
                Ok(event) => event,
                Err(err) if Some(index) == last_index => {
                    warn!(
                        "skipping torn journal line (path={}, line={}, error={})",
                        self.path.display(),
                        index + 1,
                        err
                    );
                    continue;
                }
                Err(err) => return Err(err.into()),
            };
            match event.schema_version() {
                Some(version) if version > SCHEMA_VERSION => {
                    return Err(MemoryError::UnsupportedSchema(version));
                }
                Some(_) => {}
                None => events.push(event),
            }
        }
        Ok(events)
    }

    /// Append one event and flush it to disk.
    ///
    /// A failed write is cut back off so later appends never follow a
    /// partial line.
    pub(crate) fn append<E: JournalEvent>(&self, event: &E) -> Result<(), MemoryError> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let committed = file.metadata()?.len();
        let written = file
            .write_all(line.as_bytes())
            .and_then(|()| file.flush())
            .and_then(|()| file.sync_data());
        if let Err(err) = written {
            warn!(
                "journal append failed, truncating (path={}, len={}, error={})",
                self.path.display(),
                committed,
                err
            );
            file.set_len(committed)?;
            return Err(err.into());
        }
        Ok(())
    }

    /// Drop a partial final line left by an interrupted append.
    ///
    /// Returns the length of the file afterwards.
    fn truncate_torn_tail(&self) -> Result<u64, MemoryError> {
        let contents = fs::read(&self.path)?;
        if contents.ends_with(b"\n") {
            return Ok(contents.len() as u64);
        }
        let keep = contents
            .iter()
            .rposition(|byte| *byte == b'\n')
            .map_or(0, |index| index + 1) as u64;
        warn!(
            "truncating torn journal tail (path={}, dropped_bytes={})",
            self.path.display(),
            contents.len() as u64 - keep
        );
        let file = OpenOptions::new().write(true).open(&self.path)?;
        file.set_len(keep)?;
        file.sync_data()?;
        Ok(keep)
    }
}
