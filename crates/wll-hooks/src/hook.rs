//! The six move/delete entry points.
//!
//! Each entry point either claims the operation (the index is reconciled and
//! the host's default primitive has already run, or the operation has been
//! refused) or delegates it to the host untouched. Failures are reported
//! through [`HostCommands::failed`](crate::HostCommands::failed) and never
//! returned: the host's contract is the decision alone.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::HookConfig;
use crate::host::ResourceTree;
use crate::mapping::{MappingResolver, NoHints, ProjectConnector, UntrackedOracle};
use crate::mutator::IndexMutator;
use crate::outcome::{report, HookDecision, Status};
use crate::remapper::{classify, ProjectRemapper};
use crate::resource::{Depth, ProjectDescription, Resource, UpdateFlags};

/// Keeps repository indexes in step with workspace moves and deletions.
pub struct MoveDeleteHook {
    config: HookConfig,
    resolver: Arc<dyn MappingResolver>,
    connector: Arc<dyn ProjectConnector>,
    oracle: Arc<dyn UntrackedOracle>,
}

impl MoveDeleteHook {
    pub fn new(
        config: HookConfig,
        resolver: Arc<dyn MappingResolver>,
        connector: Arc<dyn ProjectConnector>,
    ) -> Self {
        Self {
            config,
            resolver,
            connector,
            oracle: Arc::new(NoHints),
        }
    }

    /// Use `oracle` to skip index locking for paths known to be untracked.
    pub fn with_oracle(mut self, oracle: Arc<dyn UntrackedOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    /// Reason the host should handle `resource` itself, if any.
    fn precondition_failure(
        &self,
        tree: &dyn ResourceTree,
        resource: &Resource,
        flags: UpdateFlags,
        depth: Depth,
    ) -> Option<&'static str> {
        if resource.linked {
            Some("linked resource")
        } else if !flags.force && !tree.is_synchronized(resource, depth) {
            Some("out of sync with disk")
        } else if !tree.exists(resource) {
            Some("does not exist")
        } else if resource.derived {
            Some("derived resource")
        } else {
            None
        }
    }

    pub fn delete_file(
        &self,
        tree: &dyn ResourceTree,
        file: &Resource,
        flags: UpdateFlags,
    ) -> HookDecision {
        if !self.config.auto_stage_deletion {
            return HookDecision::Delegate;
        }
        if let Some(reason) = self.precondition_failure(tree, file, flags, Depth::Zero) {
            debug!(file = %file.location.display(), reason, "delete: delegated");
            return HookDecision::Delegate;
        }
        let Some(mapping) = self.resolver.resolve(&file.location) else {
            return HookDecision::Delegate;
        };
        let path = mapping.relative_path.as_str();
        if self.oracle.classify(&mapping.repository, path).is_untracked() {
            debug!(path, "delete: untracked, delegated");
            return HookDecision::Delegate;
        }

        match IndexMutator::new(mapping.repository.index()).delete_entry(path) {
            Ok(true) => {
                tree.standard_delete_file(file, flags);
                HookDecision::Claimed
            }
            Ok(false) => HookDecision::Delegate,
            Err(e) if e.is_lock_contention() => {
                // Typically a rebase or another background job. The host's
                // plain delete still runs; the deletion stays unstaged.
                warn!(path, error = %e, "delete: index locked, leaving it unstaged");
                HookDecision::Delegate
            }
            Err(e) => {
                report(
                    tree,
                    Status::error(format!("failed to remove {path} from the index: {e}")),
                );
                HookDecision::Claimed
            }
        }
    }

    /// Only refuses deletion of a repository metadata directory. Other
    /// folders are delegated: each contained file goes through
    /// [`delete_file`](Self::delete_file) as the host removes it.
    pub fn delete_folder(
        &self,
        tree: &dyn ResourceTree,
        folder: &Resource,
        _flags: UpdateFlags,
    ) -> HookDecision {
        if self.is_metadata_dir(folder) {
            report(
                tree,
                Status::error(format!(
                    "cannot delete repository metadata folder {}; disconnect the project first",
                    folder.location.display()
                )),
            );
            return HookDecision::Claimed;
        }
        HookDecision::Delegate
    }

    pub fn delete_project(
        &self,
        _tree: &dyn ResourceTree,
        project: &Resource,
        _flags: UpdateFlags,
    ) -> HookDecision {
        debug!(project = %project.location.display(), "delete project: delegated");
        HookDecision::Delegate
    }

    pub fn move_file(
        &self,
        tree: &dyn ResourceTree,
        src: &Resource,
        dst: &Resource,
        flags: UpdateFlags,
    ) -> HookDecision {
        if let Some(reason) = self.precondition_failure(tree, src, flags, Depth::Zero) {
            debug!(src = %src.location.display(), reason, "move file: delegated");
            return HookDecision::Delegate;
        }
        let Some(src_mapping) = self.resolver.resolve(&src.location) else {
            return HookDecision::Delegate;
        };
        // Only a destination in the same repository gets an entry; a move
        // into another repository just drops the source entry.
        let dst_path = self
            .resolver
            .resolve(&dst.location)
            .filter(|m| m.same_repository(&src_mapping))
            .map(|m| m.relative_path);

        let src_path = src_mapping.relative_path.as_str();
        let mutator = IndexMutator::new(src_mapping.repository.index());
        let result = if self.config.auto_stage_moves {
            mutator.move_entry(src_path, dst_path.as_deref())
        } else {
            mutator.check_entry(src_path)
        };

        match result {
            Ok(outcome) => outcome.into_decision(tree, src_path, || {
                tree.standard_move_file(src, dst, flags)
            }),
            Err(e) => {
                report(
                    tree,
                    Status::error(format!("failed to update the index for {src_path}: {e}")),
                );
                HookDecision::Claimed
            }
        }
    }

    pub fn move_folder(
        &self,
        tree: &dyn ResourceTree,
        src: &Resource,
        dst: &Resource,
        flags: UpdateFlags,
    ) -> HookDecision {
        if !self.config.auto_stage_moves {
            return HookDecision::Delegate;
        }
        if let Some(reason) = self.precondition_failure(tree, src, flags, Depth::Infinite) {
            debug!(src = %src.location.display(), reason, "move folder: delegated");
            return HookDecision::Delegate;
        }
        let Some(src_mapping) = self.resolver.resolve(&src.location) else {
            return HookDecision::Delegate;
        };
        let Some(dst_mapping) = self
            .resolver
            .resolve(&dst.location)
            .filter(|m| m.same_repository(&src_mapping))
        else {
            debug!(
                src = %src.location.display(),
                dst = %dst.location.display(),
                "move folder: crosses repository boundary, delegated"
            );
            return HookDecision::Delegate;
        };

        let src_path = src_mapping.relative_path.as_str();
        let outcome = IndexMutator::new(src_mapping.repository.index())
            .move_subtree(src_path, &dst_mapping.relative_path);
        outcome.into_decision(tree, src_path, || tree.standard_move_folder(src, dst, flags))
    }

    pub fn move_project(
        &self,
        tree: &dyn ResourceTree,
        project: &Resource,
        description: &ProjectDescription,
        flags: UpdateFlags,
    ) -> HookDecision {
        let Some(mapping) = self.resolver.resolve(&project.location) else {
            return HookDecision::Delegate;
        };
        let dst = description.target_location(&tree.workspace_root());
        let plan = classify(
            &mapping,
            &project.location,
            &dst,
            self.config.allow_nested_project_move,
        );
        debug!(project = %project.location.display(), dst = %dst.display(), ?plan, "move project");
        ProjectRemapper::new(self.connector.as_ref()).run(tree, project, description, flags, &mapping, plan)
    }

    fn is_metadata_dir(&self, folder: &Resource) -> bool {
        if folder.name() == Some(self.config.metadata_dir_name.as_str()) {
            return true;
        }
        self.resolver
            .resolve(&folder.location)
            .is_some_and(|m| m.repository.metadata_dir() == folder.location)
    }
}
