//! In-memory index for testing and embedding.
//!
//! [`InMemoryIndex`] keeps its entries and lock flag behind a `Mutex`. The
//! flag follows the same rules as the file lock: acquisition never waits,
//! and a commit publishes and releases in one step.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::IndexBackend;
use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};

#[derive(Debug, Default)]
struct MemoryState {
    entries: Vec<IndexEntry>,
    locked: bool,
}

/// An in-memory implementation of [`IndexBackend`].
#[derive(Debug, Default)]
pub struct InMemoryIndex {
    state: Mutex<MemoryState>,
}

impl InMemoryIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an index holding `entries`.
    pub fn with_entries(mut entries: Vec<IndexEntry>) -> Self {
        entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        Self {
            state: Mutex::new(MemoryState {
                entries,
                locked: false,
            }),
        }
    }

    /// A copy of the committed entries.
    pub fn snapshot(&self) -> Vec<IndexEntry> {
        self.state().entries.clone()
    }

    /// Returns `true` while some handle holds the lock.
    pub fn is_locked(&self) -> bool {
        self.state().locked
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IndexBackend for InMemoryIndex {
    fn try_lock(&self) -> IndexResult<()> {
        let mut state = self.state();
        if state.locked {
            return Err(IndexError::LockFailed(PathBuf::from("<memory>")));
        }
        state.locked = true;
        Ok(())
    }

    fn read(&self) -> IndexResult<Vec<IndexEntry>> {
        Ok(self.snapshot())
    }

    fn commit(&self, entries: &[IndexEntry]) -> IndexResult<()> {
        let mut state = self.state();
        if !state.locked {
            return Err(IndexError::NotLocked);
        }
        state.entries = entries.to_vec();
        state.locked = false;
        Ok(())
    }

    fn unlock(&self) {
        self.state().locked = false;
    }
}
