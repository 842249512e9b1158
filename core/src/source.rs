//! Snapshot-first dictionary loading.
//!
//! Callers keep a human-edited text dictionary and a generated snapshot next
//! to it. The first process start parses the text and writes the snapshot;
//! later starts read the snapshot. A snapshot that fails validation is
//! replaced from the text source.
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;
use crate::trie::PrefixDictionary;

/// True when a snapshot file exists at `path`.
pub fn snapshot_exists<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref().is_file()
}

/// Where a dictionary's text source and snapshot live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictSource {
    pub text_path: PathBuf,
    pub binary_path: PathBuf,
    /// Expected entry count, forwarded to the text loader.
    #[serde(default)]
    pub capacity_hint: usize,
}

/// Which path produced a [`Loaded`] dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOrigin {
    /// Read from an existing snapshot.
    Snapshot,
    /// No snapshot existed; parsed the text source.
    Text,
    /// The snapshot was corrupt; parsed the text source instead.
    Rebuilt,
}

#[derive(Debug)]
pub struct Loaded {
    pub dictionary: PrefixDictionary,
    pub origin: LoadOrigin,
    pub elapsed: Duration,
    /// False when the snapshot should have been (re)written but the write failed.
    pub snapshot_saved: bool,
}

impl DictSource {
    pub fn new(text_path: impl Into<PathBuf>, binary_path: impl Into<PathBuf>) -> Self {
        Self {
            text_path: text_path.into(),
            binary_path: binary_path.into(),
            capacity_hint: 0,
        }
    }

    pub fn with_capacity_hint(mut self, capacity_hint: usize) -> Self {
        self.capacity_hint = capacity_hint;
        self
    }

    /// Load from the snapshot when one exists, otherwise from text.
    ///
    /// After a text load the snapshot is written so the next start takes the
    /// fast path. Failing to write it is logged and reported through
    /// [`Loaded::snapshot_saved`] but does not fail the load. Errors from the
    /// text loader (typically a missing text file) are returned.
    pub fn load(&self) -> Result<Loaded> {
        let started = Instant::now();

        let origin = if snapshot_exists(&self.binary_path) {
            match PrefixDictionary::load_binary_file(&self.binary_path) {
                Ok(dictionary) => {
                    return Ok(Loaded {
                        dictionary,
                        origin: LoadOrigin::Snapshot,
                        elapsed: started.elapsed(),
                        snapshot_saved: true,
                    });
                }
                Err(err) if err.is_corrupt() => {
                    warn!(
                        path = %self.binary_path.display(),
                        error = %err,
                        "dictionary snapshot rejected, rebuilding from text"
                    );
                    LoadOrigin::Rebuilt
                }
                Err(err) => return Err(err),
            }
        } else {
            LoadOrigin::Text
        };

        let dictionary = PrefixDictionary::load_text_file(&self.text_path, self.capacity_hint)?;
        let snapshot_saved = match dictionary.save_to_binary_file(&self.binary_path) {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    path = %self.binary_path.display(),
                    error = %err,
                    "could not write dictionary snapshot"
                );
                false
            }
        };

        let elapsed = started.elapsed();
        info!(
            origin = ?origin,
            entries = dictionary.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "dictionary ready"
        );
        Ok(Loaded {
            dictionary,
            origin,
            elapsed,
            snapshot_saved,
        })
    }
}
