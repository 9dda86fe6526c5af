//! The [`IndexBackend`] trait defining the lockable index storage interface.

use crate::entry::IndexEntry;
use crate::error::IndexResult;

/// Storage for a repository's staging index.
///
/// The lock is the only synchronization primitive between independent
/// writers (this process, background jobs, other tools). Implementations must
/// satisfy:
///
/// - `try_lock` never blocks: if the lock is held it fails immediately with
///   [`IndexError::LockFailed`](crate::IndexError::LockFailed).
/// - `commit` is atomic. On success the new entries are published and the
///   lock is released in the same step; on failure the previous contents are
///   intact and the lock is still held.
/// - `unlock` is idempotent and only releases a lock this backend acquired.
///
/// Callers should go through [`LockedIndex`](crate::LockedIndex), which pairs
/// every acquisition with a release.
pub trait IndexBackend: Send + Sync {
    /// Acquire the index lock without waiting.
    fn try_lock(&self) -> IndexResult<()>;

    /// Read the committed entries, sorted by path and stage.
    fn read(&self) -> IndexResult<Vec<IndexEntry>>;

    /// Replace the committed entries and release the lock.
    fn commit(&self, entries: &[IndexEntry]) -> IndexResult<()>;

    /// Release the lock without publishing anything.
    fn unlock(&self);
}
