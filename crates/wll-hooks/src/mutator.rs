//! Index reconciliation: lock, inspect, edit, commit, unlock.
//!
//! Every operation takes the index lock through [`LockedIndex`], so the lock
//! is released on every return path, including errors raised mid-edit. A
//! mutation is only committed when every affected entry is merged: a
//! half-moved conflict is worse than an unmoved one, because later rename
//! detection would pair the wrong stages.

use tracing::{debug, warn};
use wll_index::{path, Edit, IndexBackend, IndexEntry, IndexResult, LockedIndex};

use crate::outcome::MoveOutcome;

/// Applies move and delete reconciliation to one repository's index.
pub struct IndexMutator<'a> {
    index: &'a dyn IndexBackend,
}

impl<'a> IndexMutator<'a> {
    pub fn new(index: &'a dyn IndexBackend) -> Self {
        Self { index }
    }

    /// Remove every stage of `path`.
    ///
    /// Returns `Ok(false)` without writing if the path is not in the index.
    /// Lock contention surfaces as [`IndexError::LockFailed`](wll_index::IndexError::LockFailed).
    pub fn delete_entry(&self, path: &str) -> IndexResult<bool> {
        let mut locked = LockedIndex::acquire(self.index)?;
        let Some(first) = locked.find_entry(path) else {
            debug!(path, "delete: path not in index");
            return Ok(false);
        };
        let next = locked.next_entry(first);
        let total = locked.entry_count();

        let mut builder = locked.builder();
        builder.keep(0..first).keep(next..total);
        builder.commit()?;
        debug!(path, "delete: index entry removed");
        Ok(true)
    }

    /// Inspect `src` without changing anything: `Untracked` if absent,
    /// `Unmerged` if conflicted, `Success` otherwise.
    pub fn check_entry(&self, src: &str) -> IndexResult<MoveOutcome> {
        let locked = LockedIndex::acquire(self.index)?;
        Ok(classify_entry(locked.entry(src)))
    }

    /// Move the entry at `src` to `dst`.
    ///
    /// With `dst == None` the source entry is only removed; this is how a
    /// move into another repository is recorded on the source side.
    pub fn move_entry(&self, src: &str, dst: Option<&str>) -> IndexResult<MoveOutcome> {
        let mut locked = LockedIndex::acquire(self.index)?;
        let entry = match locked.entry(src) {
            Some(entry) if entry.is_merged() => entry.clone(),
            other => return Ok(classify_entry(other)),
        };

        let mut editor = locked.editor();
        editor.add(Edit::DeletePath(src.to_string()));
        if let Some(dst) = dst {
            editor.add(Edit::PathEdit {
                path: dst.to_string(),
                source: entry,
            });
        }
        editor.commit()?;
        debug!(src, dst = dst.unwrap_or("<removed>"), "move: index entry relocated");
        Ok(MoveOutcome::Success)
    }

    /// Re-parent every entry inside `src_prefix` under `dst_prefix`.
    ///
    /// The empty prefix denotes the repository root. Either every entry is
    /// moved with its content identity unchanged, or nothing is written.
    pub fn move_subtree(&self, src_prefix: &str, dst_prefix: &str) -> MoveOutcome {
        match self.try_move_subtree(src_prefix, dst_prefix) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(src = src_prefix, dst = dst_prefix, error = %e, "move: index update failed");
                MoveOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    fn try_move_subtree(&self, src_prefix: &str, dst_prefix: &str) -> IndexResult<MoveOutcome> {
        let mut locked = LockedIndex::acquire(self.index)?;
        let moved: Vec<IndexEntry> = locked.entries_within(src_prefix).to_vec();
        if moved.is_empty() {
            debug!(src = src_prefix, "move: nothing tracked under source");
            return Ok(MoveOutcome::Untracked);
        }
        if let Some(conflict) = moved.iter().find(|e| !e.is_merged()) {
            warn!(src = src_prefix, path = %conflict.path, "move: unresolved conflict under source");
            return Ok(MoveOutcome::Unmerged);
        }

        let count = moved.len();
        let mut editor = locked.editor();
        editor.add(Edit::DeleteTree(src_prefix.to_string()));
        for entry in moved {
            let Some(suffix) = path::strip_dir_prefix(&entry.path, src_prefix) else {
                continue;
            };
            editor.add(Edit::PathEdit {
                path: path::join(dst_prefix, suffix),
                source: entry.clone(),
            });
        }
        editor.commit()?;
        debug!(src = src_prefix, dst = dst_prefix, count, "move: subtree relocated");
        Ok(MoveOutcome::Success)
    }

    /// Paths inside `prefix` with unresolved conflicts. Read-only: the lock
    /// is taken for a consistent view and released without writing.
    pub fn scan_unmerged(&self, prefix: &str) -> IndexResult<Vec<String>> {
        let locked = LockedIndex::acquire(self.index)?;
        let mut paths: Vec<String> = locked
            .unmerged_within(prefix)
            .into_iter()
            .map(|e| e.path.clone())
            .collect();
        paths.dedup();
        Ok(paths)
    }
}

fn classify_entry(entry: Option<&IndexEntry>) -> MoveOutcome {
    match entry {
        None => MoveOutcome::Untracked,
        Some(e) if !e.is_merged() => MoveOutcome::Unmerged,
        Some(_) => MoveOutcome::Success,
    }
}
