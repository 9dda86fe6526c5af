//! Outcomes of index reconciliation and the decision handed back to the host.

use std::fmt;

use tracing::{error, warn};

use crate::host::HostCommands;

/// Result of reconciling the index with a move.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The index was updated.
    Success,
    /// The index could not be locked, read, or written.
    Failed { reason: String },
    /// Nothing under the source path is tracked.
    Untracked,
    /// An affected path has an unresolved conflict; nothing was changed.
    Unmerged,
}

/// Whether the hook handled an operation or leaves it to the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HookDecision {
    /// The hook handled the operation (including refusing it). The host
    /// must do nothing further for this resource.
    Claimed,
    /// The host should run its own default behavior.
    Delegate,
}

impl HookDecision {
    pub fn is_claimed(self) -> bool {
        self == Self::Claimed
    }
}

impl From<HookDecision> for bool {
    fn from(decision: HookDecision) -> Self {
        decision.is_claimed()
    }
}

/// Severity of a reported failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A failure reported to the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub severity: Severity,
    pub message: String,
}

impl Status {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Log `status` and hand it to the host's failure channel.
pub(crate) fn report<T: HostCommands + ?Sized>(tree: &T, status: Status) {
    match status.severity {
        Severity::Warning => warn!(message = %status.message, "operation refused"),
        Severity::Error => error!(message = %status.message, "operation failed"),
    }
    tree.failed(status);
}

impl MoveOutcome {
    /// Turn a reconciliation outcome into the host-visible decision.
    ///
    /// `proceed` runs the host's default move and is only called on
    /// [`MoveOutcome::Success`], after the index has been committed.
    pub fn into_decision<T: HostCommands + ?Sized>(
        self,
        tree: &T,
        subject: &str,
        proceed: impl FnOnce(),
    ) -> HookDecision {
        match self {
            Self::Success => {
                proceed();
                HookDecision::Claimed
            }
            Self::Failed { reason } => {
                report(
                    tree,
                    Status::error(format!("failed to update the index for {subject}: {reason}")),
                );
                HookDecision::Claimed
            }
            Self::Untracked => HookDecision::Delegate,
            Self::Unmerged => {
                report(
                    tree,
                    Status::warning(format!(
                        "{subject} contains files with unresolved conflicts; resolve them before moving"
                    )),
                );
                HookDecision::Claimed
            }
        }
    }
}
