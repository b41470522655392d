use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;

use crate::error::StorageError;
use crate::types::TrackedState;

/// File-backed store for the tracked series.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the baseline. A missing file is an error: there is nothing to
    /// compare against.
    pub fn load(&self) -> Result<TrackedState, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::Missing { path: self.path.clone() });
        }

        let content = fs::read_to_string(&self.path).map_err(|source| StorageError::Read {
            path: self.path.clone(),
            source,
        })?;

        let state: TrackedState =
            serde_json::from_str(&content).map_err(|source| StorageError::Malformed {
                path: self.path.clone(),
                source,
            })?;

        log::info!("Read comic history: {} series from {:?}", state.len(), self.path);
        Ok(state)
    }

    /// Like `load`, but a missing file yields an empty state. Used when
    /// adding the first series.
    pub fn load_or_default(&self) -> Result<TrackedState, StorageError> {
        match self.load() {
            Err(StorageError::Missing { .. }) => Ok(TrackedState::new()),
            other => other,
        }
    }

    /// Replaces the state file. The new content goes to a temp file in the
    /// same directory first and is renamed over the old one.
    pub fn save(&self, state: &TrackedState) -> Result<(), StorageError> {
        let content = to_pretty_json(state).map_err(StorageError::Serialize)?;
        write_atomic(&self.path, content.as_bytes())?;
        log::info!("Recorded latest comic information to {:?}", self.path);
        Ok(())
    }
}

/// Moves the baseline forward for every series that had a new chapter and
/// marks that chapter as acknowledged. Series without one keep their
/// previous number.
pub fn advance(state: &mut TrackedState) {
    for series in state.iter_mut() {
        if let (true, Some(latest)) = (series.has_new_chapter, series.latest_chapter_num) {
            series.prev_chapter_num = latest;
            series.has_new_chapter = false;
        }
    }
}

/// Writes the last notification text next to the state file.
pub fn save_message(path: &Path, message: &str) -> Result<(), StorageError> {
    write_atomic(path, message.as_bytes())
}

/// Two-space indented JSON with non-ASCII text left as is.
fn to_pretty_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"  ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    // serde_json only ever emits UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let write_err = |source: std::io::Error| StorageError::Write { path: path.to_path_buf(), source };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(write_err)?;

    let mut temp_file = NamedTempFile::new_in(&parent).map_err(write_err)?;
    temp_file.write_all(bytes).map_err(write_err)?;
    temp_file.flush().map_err(write_err)?;
    temp_file.as_file().sync_all().map_err(write_err)?;

    temp_file.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
