//! Read-only file store subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     FileStore::walk()  → every entry, relative `/` paths, pre-order
//!     → routing::table (route compilation)
//!
//! Per request:
//!     FileStore::stat()  → exact static lookup
//!     FileStore::open()  → Read + Seek handle for the chosen file
//! ```
//!
//! # Design Decisions
//! - Paths are always relative, `/`-separated, with no empty, `.` or `..`
//!   segments; anything else is rejected as `InvalidPath` before any lookup
//! - Opened handles are seekable by contract (range requests need it)
//! - Backends are synchronous; callers on async tasks use the blocking pool

pub mod dir;
pub mod error;
pub mod memory;

use std::io::{Read, Seek};

pub use dir::DirStore;
pub use error::{StoreError, StoreErrorKind};
pub use memory::MemoryStore;

/// An open, readable and seekable file.
pub trait FileHandle: Read + Seek + Send {}

impl<T: Read + Seek + Send> FileHandle for T {}

/// Type of a store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file with its size in bytes.
    File { len: u64 },
    /// Directory.
    Dir,
}

impl EntryKind {
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File { .. })
    }
}

/// One entry produced by [`FileStore::walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Relative path, `/`-separated.
    pub path: String,
    pub kind: EntryKind,
}

/// Read-only tree of files backing a site.
pub trait FileStore: Send + Sync + std::fmt::Debug {
    /// Enumerate every entry recursively.
    ///
    /// Entries come in pre-order with siblings sorted by name, so the
    /// result is identical across calls on an unchanged store.
    fn walk(&self) -> Result<Vec<Entry>, StoreError>;

    /// Look up a single entry.
    fn stat(&self, path: &str) -> Result<EntryKind, StoreError>;

    /// Open a file for reading.
    fn open(&self, path: &str) -> Result<Box<dyn FileHandle>, StoreError>;
}

/// Reject paths that could escape the store root or alias another entry.
pub fn check_path(path: &str) -> Result<(), StoreError> {
    let valid = !path.is_empty()
        && !path.contains(['\\', '\0'])
        && path
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");

    if valid {
        Ok(())
    } else {
        Err(StoreError::new(StoreErrorKind::InvalidPath, path))
    }
}
