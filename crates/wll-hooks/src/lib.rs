//! Move/delete hook for the WorldLine Ledger.
//!
//! When a host workspace deletes or moves a resource inside a repository's
//! work tree, the hook updates the repository's staging index in the same
//! step, so the change is staged as a deletion or a rename instead of
//! appearing as missing and untracked files.
//!
//! Every entry point answers with a [`HookDecision`]: `Claimed` means the hook
//! handled the operation (or refused it and reported why), `Delegate` means
//! the host should run its own default behavior.
//!
//! # Key Types
//!
//! - [`MoveDeleteHook`] -- The six entry points
//! - [`ResourceTree`] -- What the hook needs from the host ([`HostQuery`] + [`HostCommands`])
//! - [`MappingResolver`] -- Finds the repository for a workspace location
//! - [`IndexMutator`] -- Lock-scoped index reconciliation returning a [`MoveOutcome`]
//! - [`ProjectRemapper`] -- Disconnect, move, and reconnect a project
//! - [`HookConfig`] -- Feature toggles loaded from `hooks.toml`

pub mod config;
pub mod error;
pub mod hook;
pub mod host;
pub mod mapping;
pub mod mutator;
pub mod outcome;
pub mod remapper;
pub mod resource;

#[cfg(test)]
mod testing;

pub use config::HookConfig;
pub use error::{HookError, HookResult};
pub use hook::MoveDeleteHook;
pub use host::{HostCommands, HostQuery, ResourceTree};
pub use mapping::{
    DiscoveredProjects, MappingResolver, NoHints, PathHint, ProjectConnector, Repository,
    RepositoryMapping, StaticMappings, UntrackedOracle,
};
pub use mutator::IndexMutator;
pub use outcome::{HookDecision, MoveOutcome, Severity, Status};
pub use remapper::{classify, ProjectMove, ProjectRemapper};
pub use resource::{Depth, ProjectDescription, Resource, ResourceKind, UpdateFlags};
