//! Error types for dictionary loading and persistence.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by the dictionary engine.
///
/// Malformed text lines and absent keys are not errors: the text loader skips
/// the former and queries return `None` / an empty result for the latter.
#[derive(Debug, Error)]
pub enum DictError {
    /// A file could not be opened, read, created or renamed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Reading from a caller-supplied stream failed.
    #[error("I/O error while reading dictionary stream: {0}")]
    Stream(#[from] io::Error),

    /// The snapshot does not start with the expected magic bytes.
    #[error("invalid magic number in snapshot header")]
    InvalidMagic,

    /// The snapshot was written by an incompatible format version.
    #[error("unsupported snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// The snapshot ends before the sizes announced by its header.
    #[error("snapshot truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: u64, actual: u64 },

    /// The snapshot decoded but its node/edge/payload tables are inconsistent.
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),

    /// A configuration file could not be parsed or rendered.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DictError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        DictError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for every structural snapshot failure.
    ///
    /// Callers treat these as a signal to rebuild the snapshot from the text
    /// source rather than as a fatal error.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            DictError::InvalidMagic
                | DictError::UnsupportedVersion { .. }
                | DictError::Truncated { .. }
                | DictError::Corrupt(_)
        )
    }

    /// True when the failure came from the filesystem or a reader.
    pub fn is_io(&self) -> bool {
        matches!(self, DictError::Io { .. } | DictError::Stream(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DictError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_variants_are_grouped() {
        assert!(DictError::InvalidMagic.is_corrupt());
        assert!(DictError::Corrupt("x".into()).is_corrupt());
        assert!(DictError::Truncated {
            expected: 10,
            actual: 2
        }
        .is_corrupt());
        assert!(DictError::UnsupportedVersion {
            found: 9,
            expected: 1
        }
        .is_corrupt());

        let io = DictError::io("missing.txt", io::Error::from(io::ErrorKind::NotFound));
        assert!(io.is_io());
        assert!(!io.is_corrupt());
    }

    #[test]
    fn io_error_mentions_path() {
        let err = DictError::io("data/ecdict.txt", io::Error::from(io::ErrorKind::NotFound));
        assert!(err.to_string().contains("data/ecdict.txt"));
    }
}
