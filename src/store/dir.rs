//! Filesystem-backed store rooted at a site export directory.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::store::{check_path, Entry, EntryKind, FileHandle, FileStore, StoreError, StoreErrorKind};

/// A directory on disk served read-only.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open a store rooted at `root`, which must be an existing directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        let display = root.display().to_string();
        let meta = fs::metadata(&root).map_err(|e| StoreError::io(e, display.clone()))?;
        if !meta.is_dir() {
            return Err(StoreError::new(StoreErrorKind::NotFound, display));
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        check_path(path)?;
        Ok(self.root.join(path))
    }

    fn relative(&self, full: &Path) -> Result<String, StoreError> {
        let rel = full
            .strip_prefix(&self.root)
            .map_err(|_| StoreError::new(StoreErrorKind::InvalidPath, full.display().to_string()))?;

        let mut segments = Vec::new();
        for component in rel.components() {
            let segment = component.as_os_str().to_str().ok_or_else(|| {
                StoreError::new(StoreErrorKind::InvalidPath, full.display().to_string())
            })?;
            segments.push(segment);
        }
        Ok(segments.join("/"))
    }
}

impl FileStore for DirStore {
    fn walk(&self) -> Result<Vec<Entry>, StoreError> {
        WalkDir::new(&self.root)
            .min_depth(1)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .map(|entry| -> Result<Entry, StoreError> {
                let entry = entry.map_err(|e| {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default();
                    StoreError::io(e.into(), path)
                })?;
                let path = self.relative(entry.path())?;
                let kind = if entry.file_type().is_dir() {
                    EntryKind::Dir
                } else {
                    let len = entry
                        .metadata()
                        .map_err(|e| StoreError::io(e.into(), path.clone()))?
                        .len();
                    EntryKind::File { len }
                };
                Ok(Entry { path, kind })
            })
            .collect()
    }

    fn stat(&self, path: &str) -> Result<EntryKind, StoreError> {
        let full = self.resolve(path)?;
        let meta = fs::metadata(&full).map_err(|e| StoreError::io(e, path))?;
        if meta.is_dir() {
            Ok(EntryKind::Dir)
        } else {
            Ok(EntryKind::File { len: meta.len() })
        }
    }

    fn open(&self, path: &str) -> Result<Box<dyn FileHandle>, StoreError> {
        let full = self.resolve(path)?;
        let file = File::open(&full).map_err(|e| StoreError::io(e, path))?;
        let meta = file.metadata().map_err(|e| StoreError::io(e, path))?;
        if meta.is_dir() {
            return Err(StoreError::new(StoreErrorKind::NotAFile, path));
        }
        Ok(Box::new(file))
    }
}
