//! In-memory store for embedded sites.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Cursor;
use std::sync::Arc;

use crate::store::{check_path, Entry, EntryKind, FileHandle, FileStore, StoreError, StoreErrorKind};

/// A fixed set of files held in memory.
///
/// Directories are implied by the file paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: BTreeMap<String, Arc<[u8]>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file, replacing any previous content at `path`.
    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Result<(), StoreError> {
        let path = path.into();
        check_path(&path)?;
        let contents: Vec<u8> = contents.into();
        self.files.insert(path, Arc::from(contents));
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert) for fixed path literals.
    ///
    /// # Panics
    /// Panics if `path` is not a valid store path.
    pub fn with_file(mut self, path: &str, contents: impl Into<Vec<u8>>) -> Self {
        if let Err(e) = self.insert(path, contents) {
            panic!("invalid store path: {}", e);
        }
        self
    }

    fn is_dir(&self, path: &str) -> bool {
        let prefix = format!("{}/", path);
        self.files
            .range(prefix.clone()..)
            .next()
            .is_some_and(|(k, _)| k.starts_with(&prefix))
    }

    fn directories(&self) -> BTreeSet<&str> {
        let mut dirs = BTreeSet::new();
        for path in self.files.keys() {
            let mut end = 0;
            while let Some(i) = path[end..].find('/') {
                end += i;
                dirs.insert(&path[..end]);
                end += 1;
            }
        }
        dirs
    }
}

impl FileStore for MemoryStore {
    fn walk(&self) -> Result<Vec<Entry>, StoreError> {
        let mut entries: Vec<Entry> = self
            .directories()
            .into_iter()
            .map(|dir| Entry {
                path: dir.to_string(),
                kind: EntryKind::Dir,
            })
            .chain(self.files.iter().map(|(path, data)| Entry {
                path: path.clone(),
                kind: EntryKind::File { len: data.len() as u64 },
            }))
            .collect();

        // Segment-wise ordering gives the same pre-order a directory walk does.
        entries.sort_by(|a, b| a.path.split('/').cmp(b.path.split('/')));
        Ok(entries)
    }

    fn stat(&self, path: &str) -> Result<EntryKind, StoreError> {
        check_path(path)?;
        if let Some(data) = self.files.get(path) {
            return Ok(EntryKind::File { len: data.len() as u64 });
        }
        if self.is_dir(path) {
            return Ok(EntryKind::Dir);
        }
        Err(StoreError::not_found(path))
    }

    fn open(&self, path: &str) -> Result<Box<dyn FileHandle>, StoreError> {
        match self.stat(path)? {
            EntryKind::Dir => Err(StoreError::new(StoreErrorKind::NotAFile, path)),
            EntryKind::File { .. } => {
                let data = Arc::clone(&self.files[path]);
                Ok(Box::new(Cursor::new(data)))
            }
        }
    }
}
