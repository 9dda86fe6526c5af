//! The host's resource tree, split into queries and commands.
//!
//! Queries never change anything and may be called any number of times.
//! Commands are the host's own default behavior; the hook calls at most one
//! of them per claimed operation, and only after the index is up to date.

use std::path::PathBuf;

use crate::outcome::Status;
use crate::resource::{Depth, ProjectDescription, Resource, UpdateFlags};

/// Read-only questions about the host's resource tree.
pub trait HostQuery {
    /// Returns `true` if the host's view of `resource` matches the disk.
    fn is_synchronized(&self, resource: &Resource, depth: Depth) -> bool;

    /// Returns `true` if the resource exists.
    fn exists(&self, resource: &Resource) -> bool;

    /// Root directory under which projects live by default.
    fn workspace_root(&self) -> PathBuf;
}

/// The host's default primitives and its failure channel.
pub trait HostCommands {
    fn standard_delete_file(&self, file: &Resource, flags: UpdateFlags);

    fn standard_delete_folder(&self, folder: &Resource, flags: UpdateFlags);

    fn standard_delete_project(&self, project: &Resource, flags: UpdateFlags);

    fn standard_move_file(&self, src: &Resource, dst: &Resource, flags: UpdateFlags);

    fn standard_move_folder(&self, src: &Resource, dst: &Resource, flags: UpdateFlags);

    fn standard_move_project(
        &self,
        project: &Resource,
        description: &ProjectDescription,
        flags: UpdateFlags,
    );

    /// Record that the requested operation failed or was refused.
    fn failed(&self, status: Status);
}

/// A host that answers queries and executes commands.
pub trait ResourceTree: HostQuery + HostCommands {}

impl<T: HostQuery + HostCommands + ?Sized> ResourceTree for T {}
