//! File-backed index with a lock file.
//!
//! The index lives in a single file (conventionally `<metadata>/index`). The
//! lock is a sibling file with a `.lock` suffix, created with `create_new` so
//! that exactly one writer can hold it. A commit writes the new contents into
//! the lock file and renames it over the index, which publishes the update
//! and releases the lock in one step.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::backend::IndexBackend;
use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};

/// On-disk format version.
pub const INDEX_VERSION: u32 = 1;

#[derive(Deserialize)]
struct IndexFile {
    version: u32,
    entries: Vec<IndexEntry>,
}

#[derive(Serialize)]
struct IndexFileRef<'e> {
    version: u32,
    entries: &'e [IndexEntry],
}

/// An index stored in a file, guarded by a `.lock` file.
#[derive(Debug)]
pub struct FileIndex {
    path: PathBuf,
    lock_path: PathBuf,
    held: Mutex<Option<File>>,
}

impl FileIndex {
    /// Open the index at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().unwrap_or_default().to_os_string();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self {
            path,
            lock_path,
            held: Mutex::new(None),
        }
    }

    /// Path of the index file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the lock file.
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    fn held(&self) -> MutexGuard<'_, Option<File>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IndexBackend for FileIndex {
    fn try_lock(&self) -> IndexResult<()> {
        let mut held = self.held();
        if held.is_some() {
            return Err(IndexError::LockFailed(self.lock_path.clone()));
        }
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.lock_path)
        {
            Ok(file) => {
                *held = Some(file);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                Err(IndexError::LockFailed(self.lock_path.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read(&self) -> IndexResult<Vec<IndexEntry>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let file: IndexFile = bincode::deserialize(&bytes)
            .map_err(|e| IndexError::Serialization(e.to_string()))?;
        if file.version != INDEX_VERSION {
            return Err(IndexError::Serialization(format!(
                "unsupported index version {} in {}",
                file.version,
                self.path.display()
            )));
        }
        Ok(file.entries)
    }

    fn commit(&self, entries: &[IndexEntry]) -> IndexResult<()> {
        let mut held = self.held();
        let Some(mut file) = held.take() else {
            return Err(IndexError::NotLocked);
        };
        let data = bincode::serialize(&IndexFileRef {
            version: INDEX_VERSION,
            entries,
        })
        .map_err(|e| IndexError::Serialization(e.to_string()));
        let data = match data {
            Ok(data) => data,
            Err(e) => {
                *held = Some(file);
                return Err(e);
            }
        };

        let written = file
            .write_all(&data)
            .and_then(|()| file.sync_all())
            .and_then(|()| fs::rename(&self.lock_path, &self.path));
        if let Err(e) = written {
            *held = Some(file);
            return Err(IndexError::CommitFailed(format!(
                "{}: {e}",
                self.path.display()
            )));
        }
        debug!(path = %self.path.display(), entries = entries.len(), "index written");
        Ok(())
    }

    fn unlock(&self) {
        let mut held = self.held();
        if held.take().is_some() {
            if let Err(e) = fs::remove_file(&self.lock_path) {
                warn!(path = %self.lock_path.display(), error = %e, "failed to remove index lock");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{EntryMode, ObjectId};
    use crate::lock::LockedIndex;

    fn entry(path: &str) -> IndexEntry {
        IndexEntry::new(path, ObjectId::for_content(path.as_bytes()), EntryMode::Regular, 3)
    }

    #[test]
    fn missing_index_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let index = FileIndex::new(dir.path().join("index"));
        assert!(index.read().unwrap().is_empty());
        assert_eq!(index.lock_path(), dir.path().join("index.lock"));
    }

    #[test]
    fn commit_persists_and_removes_lock() {
        let dir = tempfile::tempdir().unwrap();
        let index = FileIndex::new(dir.path().join("index"));

        let mut locked = LockedIndex::acquire(&index).unwrap();
        assert!(index.lock_path().exists());
        let mut builder = locked.builder();
        builder.add(entry("b.txt")).add(entry("a.txt"));
        builder.commit().unwrap();
        drop(locked);

        assert!(!index.lock_path().exists());
        let reopened = FileIndex::new(dir.path().join("index"));
        let paths: Vec<String> = reopened.read().unwrap().into_iter().map(|e| e.path).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn foreign_lock_file_blocks_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let index = FileIndex::new(dir.path().join("index"));
        fs::write(index.lock_path(), b"").unwrap();

        let result = LockedIndex::acquire(&index);
        assert!(matches!(result, Err(IndexError::LockFailed(_))));
        // Someone else's lock must survive our failed attempt.
        assert!(index.lock_path().exists());
    }

    #[test]
    fn unlock_without_commit_keeps_contents() {
        let dir = tempfile::tempdir().unwrap();
        let index = FileIndex::new(dir.path().join("index"));
        {
            let mut locked = LockedIndex::acquire(&index).unwrap();
            let mut builder = locked.builder();
            builder.add(entry("a.txt"));
            builder.commit().unwrap();
        }
        {
            let locked = LockedIndex::acquire(&index).unwrap();
            locked.unlock();
        }
        assert!(!index.lock_path().exists());
        assert_eq!(index.read().unwrap().len(), 1);
    }

    #[test]
    fn version_mismatch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index");
        let bytes = bincode::serialize(&IndexFileRef {
            version: 99,
            entries: &[],
        })
        .unwrap();
        fs::write(&path, bytes).unwrap();
        let index = FileIndex::new(path);
        assert!(matches!(index.read(), Err(IndexError::Serialization(_))));
    }
}
