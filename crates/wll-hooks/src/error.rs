//! Error types for the hook crate.

use std::path::PathBuf;

/// Errors raised inside the hook or by its collaborators.
///
/// These never cross the hook boundary: entry points turn them into a
/// [`Status`](crate::Status) reported through the host.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// The project could not be disconnected from version control.
    #[error("failed to disconnect {project}: {reason}")]
    Unmap { project: PathBuf, reason: String },

    /// The project could not be reconnected after a move.
    #[error("failed to reconnect {project}: {reason}")]
    Remap { project: PathBuf, reason: String },

    /// The hook configuration is malformed.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error while loading configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for hook results.
pub type HookResult<T> = Result<T, HookError>;
