//! Store error types.

use std::fmt;
use std::io;
use thiserror::Error;

/// Semantic error categories shared by all store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// Entry does not exist.
    NotFound,
    /// Entry exists but cannot be read.
    PermissionDenied,
    /// Path is not a valid relative store path.
    InvalidPath,
    /// Entry is a directory where a file was required.
    NotAFile,
    /// Any other I/O failure.
    Other,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreErrorKind::NotFound => "not found",
            StoreErrorKind::PermissionDenied => "permission denied",
            StoreErrorKind::InvalidPath => "invalid path",
            StoreErrorKind::NotAFile => "not a file",
            StoreErrorKind::Other => "I/O error",
        };
        f.write_str(s)
    }
}

/// Error returned by a [`FileStore`](super::FileStore) operation.
#[derive(Debug, Error)]
#[error("{kind} (path: {path:?})")]
pub struct StoreError {
    pub kind: StoreErrorKind,
    /// Relative path the operation was about.
    pub path: String,
    #[source]
    source: Option<io::Error>,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, path: impl Into<String>) -> Self {
        Self {
            kind,
            path: path.into(),
            source: None,
        }
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound, path)
    }

    /// Classify an I/O error.
    pub fn io(err: io::Error, path: impl Into<String>) -> Self {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => StoreErrorKind::NotFound,
            io::ErrorKind::PermissionDenied => StoreErrorKind::PermissionDenied,
            _ => StoreErrorKind::Other,
        };
        Self {
            kind,
            path: path.into(),
            source: Some(err),
        }
    }

    /// True when the entry simply is not there to be served.
    ///
    /// Invalid paths count as absent: they are never looked up.
    pub fn is_miss(&self) -> bool {
        matches!(self.kind, StoreErrorKind::NotFound | StoreErrorKind::InvalidPath)
    }
}
