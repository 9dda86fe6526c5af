//! Locked access to an index: lookups, range scans, and atomic edits.
//!
//! [`LockedIndex`] is the only way this crate hands out mutable access. It
//! owns the backend's lock from [`LockedIndex::acquire`] until it commits,
//! is unlocked, or is dropped, so no exit path can leave the index locked.
//!
//! Two edit styles are offered:
//!
//! - [`IndexBuilder`] rebuilds the entry list from kept ranges and added
//!   entries ("keep everything before, keep everything after").
//! - [`IndexEditor`] applies declarative [`Edit`]s to the current entries.

use std::ops::Range;

use tracing::debug;

use crate::backend::IndexBackend;
use crate::entry::IndexEntry;
use crate::error::{IndexError, IndexResult};
use crate::path;

/// A declarative mutation applied by [`IndexEditor`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit {
    /// Remove every stage of exactly this path.
    DeletePath(String),
    /// Remove every entry inside this directory prefix. The empty prefix
    /// removes everything.
    DeleteTree(String),
    /// Write a merged entry at `path` whose content metadata is copied
    /// verbatim from `source`, replacing whatever was at `path`.
    PathEdit { path: String, source: IndexEntry },
}

/// An index whose lock is held by this handle.
pub struct LockedIndex<'a> {
    backend: &'a dyn IndexBackend,
    entries: Vec<IndexEntry>,
    held: bool,
}

impl std::fmt::Debug for LockedIndex<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockedIndex")
            .field("entries", &self.entries.len())
            .field("held", &self.held)
            .finish()
    }
}

impl<'a> LockedIndex<'a> {
    /// Lock the index and load its entries.
    ///
    /// Fails fast with [`IndexError::LockFailed`] if the lock is held
    /// elsewhere. If reading fails after the lock was taken, the lock is
    /// released before the error is returned.
    pub fn acquire(backend: &'a dyn IndexBackend) -> IndexResult<Self> {
        backend.try_lock()?;
        let mut locked = Self {
            backend,
            entries: Vec::new(),
            held: true,
        };
        let mut entries = locked.backend.read()?;
        sort_entries(&mut entries);
        locked.entries = entries;
        Ok(locked)
    }

    /// Number of entries, counting each conflict stage separately.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// All entries, sorted by path and stage.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Position of the first stage recorded for `path`.
    pub fn find_entry(&self, path: &str) -> Option<usize> {
        let pos = self.entries.partition_point(|e| e.path.as_str() < path);
        match self.entries.get(pos) {
            Some(e) if e.path == path => Some(pos),
            _ => None,
        }
    }

    /// The first stage recorded for `path`.
    pub fn entry(&self, path: &str) -> Option<&IndexEntry> {
        self.find_entry(path).map(|pos| &self.entries[pos])
    }

    /// Position just past every stage of the path found at `position`.
    pub fn next_entry(&self, position: usize) -> usize {
        let Some(current) = self.entries.get(position) else {
            return self.entries.len();
        };
        position
            + self.entries[position..]
                .iter()
                .take_while(|e| e.path == current.path)
                .count()
    }

    /// Every entry inside directory `prefix` (all entries for the empty
    /// prefix). Sorting makes this a contiguous range.
    pub fn entries_within(&self, prefix: &str) -> &[IndexEntry] {
        if prefix.is_empty() {
            return &self.entries;
        }
        let dir = format!("{prefix}/");
        let start = self.entries.partition_point(|e| e.path.as_str() < dir.as_str());
        let len = self.entries[start..]
            .iter()
            .take_while(|e| e.path.starts_with(&dir))
            .count();
        &self.entries[start..start + len]
    }

    /// Conflict-stage entries inside directory `prefix`.
    pub fn unmerged_within(&self, prefix: &str) -> Vec<&IndexEntry> {
        self.entries_within(prefix)
            .iter()
            .filter(|e| !e.is_merged())
            .collect()
    }

    /// Start rebuilding the entry list from kept ranges.
    pub fn builder(&mut self) -> IndexBuilder<'_, 'a> {
        IndexBuilder {
            index: self,
            entries: Vec::new(),
        }
    }

    /// Start a set of declarative edits against the current entries.
    pub fn editor(&mut self) -> IndexEditor<'_, 'a> {
        IndexEditor {
            index: self,
            edits: Vec::new(),
        }
    }

    /// Release the lock without writing anything.
    pub fn unlock(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.held {
            self.backend.unlock();
            self.held = false;
        }
    }

    fn publish(&mut self, entries: Vec<IndexEntry>) -> IndexResult<()> {
        if !self.held {
            return Err(IndexError::NotLocked);
        }
        self.backend.commit(&entries)?;
        self.held = false;
        debug!(
            before = self.entries.len(),
            after = entries.len(),
            "index committed"
        );
        self.entries = entries;
        Ok(())
    }
}

impl Drop for LockedIndex<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Rebuilds an index from ranges of the current entries plus new entries.
pub struct IndexBuilder<'l, 'a> {
    index: &'l mut LockedIndex<'a>,
    entries: Vec<IndexEntry>,
}

impl IndexBuilder<'_, '_> {
    /// Keep `range` of the current entries.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds of the locked entries.
    pub fn keep(&mut self, range: Range<usize>) -> &mut Self {
        self.entries.extend_from_slice(&self.index.entries[range]);
        self
    }

    /// Add a new entry.
    pub fn add(&mut self, entry: IndexEntry) -> &mut Self {
        self.entries.push(entry);
        self
    }

    /// Publish the rebuilt index and release the lock.
    pub fn commit(self) -> IndexResult<()> {
        let mut entries = self.entries;
        for entry in &entries {
            path::validate(&entry.path)?;
        }
        sort_entries(&mut entries);
        if let Some(dup) = entries
            .windows(2)
            .find(|w| w[0].sort_key() == w[1].sort_key())
        {
            return Err(IndexError::DuplicateEntry(dup[0].path.clone()));
        }
        self.index.publish(entries)
    }
}

/// Applies [`Edit`]s to the current entries and publishes the result.
pub struct IndexEditor<'l, 'a> {
    index: &'l mut LockedIndex<'a>,
    edits: Vec<Edit>,
}

impl IndexEditor<'_, '_> {
    /// Queue an edit. Edits apply in the order they were added.
    pub fn add(&mut self, edit: Edit) -> &mut Self {
        self.edits.push(edit);
        self
    }

    /// Apply the queued edits, publish the result, and release the lock.
    pub fn commit(self) -> IndexResult<()> {
        let mut entries = self.index.entries.clone();
        for edit in &self.edits {
            match edit {
                Edit::DeletePath(target) => entries.retain(|e| &e.path != target),
                Edit::DeleteTree(prefix) => entries.retain(|e| !path::is_within(&e.path, prefix)),
                Edit::PathEdit { path: target, source } => {
                    path::validate(target)?;
                    // A file and a directory cannot share a name.
                    entries.retain(|e| {
                        &e.path != target
                            && !path::is_within(target, &e.path)
                            && !path::is_within(&e.path, target)
                    });
                    entries.push(source.relocated(target.as_str()));
                }
            }
        }
        sort_entries(&mut entries);
        self.index.publish(entries)
    }
}

fn sort_entries(entries: &mut [IndexEntry]) {
    entries.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}
