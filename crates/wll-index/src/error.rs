//! Error types for the index crate.

use std::path::PathBuf;

/// Errors that can occur during index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The index lock is held by someone else (another process, a background
    /// job, or an earlier handle that has not been released).
    #[error("index is locked: {0}")]
    LockFailed(PathBuf),

    /// The handle no longer owns the lock (already committed or unlocked).
    #[error("index lock is not held")]
    NotLocked,

    /// Writing the new index contents failed; the previous contents remain.
    #[error("index commit failed: {0}")]
    CommitFailed(String),

    /// Two entries with the same path and stage were staged in one commit.
    #[error("duplicate index entry: {0}")]
    DuplicateEntry(String),

    /// An invalid path was provided.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Returns `true` if the error is lock contention rather than a real failure.
    pub fn is_lock_contention(&self) -> bool {
        matches!(self, Self::LockFailed(_))
    }
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
