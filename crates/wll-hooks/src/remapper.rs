//! Project moves: disconnect, reconcile, move, reconnect.
//!
//! A project is connected to its repository by the host's provider. Before
//! the host moves a project, the project must be disconnected, otherwise the
//! provider would try to run its own version-controlled move on top of ours.
//! After the move, the project is reconnected at its new location.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::host::ResourceTree;
use crate::mapping::{ProjectConnector, RepositoryMapping};
use crate::mutator::IndexMutator;
use crate::outcome::{report, HookDecision, MoveOutcome, Status};
use crate::resource::{ProjectDescription, Resource, UpdateFlags};

/// How a project move relates to its repository.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectMove {
    /// The target lies inside the project itself.
    IntoItself,
    /// The target stays inside the same work tree; index entries move from
    /// `src_prefix` to `dst_prefix` (empty for the work tree root).
    WithinWorkTree { src_prefix: String, dst_prefix: String },
    /// The repository metadata lives inside the project and travels with it,
    /// found at `metadata_offset` below the project before and after.
    CarriesRepository { metadata_offset: PathBuf },
    /// The project leaves version control.
    LeavesRepository,
}

/// Decide what kind of project move `src -> dst` is.
pub fn classify(
    mapping: &RepositoryMapping,
    src: &Path,
    dst: &Path,
    allow_nested: bool,
) -> ProjectMove {
    if !allow_nested && dst.starts_with(src) && depth(dst) != depth(src) {
        return ProjectMove::IntoItself;
    }

    let repository = &mapping.repository;
    if dst.starts_with(repository.work_tree()) {
        if let Some(dst_prefix) = repository.relative_path(dst) {
            return ProjectMove::WithinWorkTree {
                src_prefix: mapping.relative_path.clone(),
                dst_prefix,
            };
        }
    }

    let metadata_dir = repository.metadata_dir();
    if let Ok(offset) = metadata_dir.strip_prefix(src) {
        return ProjectMove::CarriesRepository {
            metadata_offset: offset.to_path_buf(),
        };
    }

    ProjectMove::LeavesRepository
}

fn depth(path: &Path) -> usize {
    path.components()
        .filter(|c| matches!(c, Component::Normal(_)))
        .count()
}

/// Runs a classified project move against the host.
pub struct ProjectRemapper<'h> {
    connector: &'h dyn ProjectConnector,
}

impl<'h> ProjectRemapper<'h> {
    pub fn new(connector: &'h dyn ProjectConnector) -> Self {
        Self { connector }
    }

    /// Execute `plan`. Returns `Delegate` only for
    /// [`ProjectMove::LeavesRepository`]; every other plan is claimed once
    /// it starts, since a disconnected project must not get the host's
    /// version-controlled default move.
    pub fn run(
        &self,
        tree: &dyn ResourceTree,
        project: &Resource,
        description: &ProjectDescription,
        flags: UpdateFlags,
        mapping: &RepositoryMapping,
        plan: ProjectMove,
    ) -> HookDecision {
        let dst = description.target_location(&tree.workspace_root());
        match plan {
            ProjectMove::IntoItself => {
                report(
                    tree,
                    Status::error(format!(
                        "cannot move project {} into its own subfolder {}",
                        project.location.display(),
                        dst.display()
                    )),
                );
                HookDecision::Claimed
            }
            ProjectMove::WithinWorkTree {
                src_prefix,
                dst_prefix,
            } => {
                if !self.unmap(tree, project) {
                    return HookDecision::Claimed;
                }
                let metadata_dir = mapping.repository.metadata_dir();
                let mutator = IndexMutator::new(mapping.repository.index());
                let outcome = mutator.move_subtree(&src_prefix, &dst_prefix);
                debug!(?outcome, src = %src_prefix, dst = %dst_prefix, "project index move");
                match outcome {
                    MoveOutcome::Success | MoveOutcome::Untracked => {
                        tree.standard_move_project(project, description, flags);
                        self.remap(tree, &Resource::project(&dst), metadata_dir);
                    }
                    MoveOutcome::Unmerged => {
                        let conflicts = mutator.scan_unmerged(&src_prefix).unwrap_or_default();
                        report(
                            tree,
                            Status::warning(format!(
                                "project {} has unresolved conflicts in {}; resolve them before moving",
                                project.location.display(),
                                conflicts.join(", ")
                            )),
                        );
                        self.remap(tree, project, metadata_dir);
                    }
                    failed => {
                        // Leave the project where it was, connected as before.
                        let subject = project.location.display().to_string();
                        failed.into_decision(tree, &subject, || {});
                        self.remap(tree, project, metadata_dir);
                    }
                }
                HookDecision::Claimed
            }
            ProjectMove::CarriesRepository { metadata_offset } => {
                if !self.unmap(tree, project) {
                    return HookDecision::Claimed;
                }
                tree.standard_move_project(project, description, flags);
                let metadata_dir = dst.join(&metadata_offset);
                info!(
                    project = %dst.display(),
                    metadata = %metadata_dir.display(),
                    "repository moved with project"
                );
                self.remap(tree, &Resource::project(&dst), &metadata_dir);
                HookDecision::Claimed
            }
            ProjectMove::LeavesRepository => HookDecision::Delegate,
        }
    }

    fn unmap(&self, tree: &dyn ResourceTree, project: &Resource) -> bool {
        match self.connector.unmap(project) {
            Ok(()) => true,
            Err(e) => {
                report(tree, Status::error(e.to_string()));
                false
            }
        }
    }

    fn remap(&self, tree: &dyn ResourceTree, project: &Resource, metadata_dir: &Path) {
        if let Err(e) = self.connector.remap(project, metadata_dir) {
            report(tree, Status::error(e.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use wll_index::InMemoryIndex;

    use crate::mapping::Repository;

    fn mapping(work_tree: &str, metadata_dir: &str, location: &str) -> RepositoryMapping {
        let repo = Arc::new(Repository::new(
            work_tree,
            metadata_dir,
            Arc::new(InMemoryIndex::new()),
        ));
        RepositoryMapping::of(repo, Path::new(location)).unwrap()
    }

    #[test]
    fn nested_target_is_refused() {
        let m = mapping("/ws/repo", "/ws/repo/.wll", "/ws/repo/proj");
        let plan = classify(&m, Path::new("/ws/repo/proj"), Path::new("/ws/repo/proj/sub"), false);
        assert_eq!(plan, ProjectMove::IntoItself);
    }

    #[test]
    fn nested_target_allowed_with_override() {
        let m = mapping("/ws/repo", "/ws/repo/.wll", "/ws/repo/proj");
        let plan = classify(&m, Path::new("/ws/repo/proj"), Path::new("/ws/repo/proj/sub"), true);
        assert_eq!(
            plan,
            ProjectMove::WithinWorkTree {
                src_prefix: "proj".into(),
                dst_prefix: "proj/sub".into(),
            }
        );
    }

    #[test]
    fn move_inside_work_tree() {
        let m = mapping("/ws/repo", "/ws/repo/.wll", "/ws/repo/a");
        let plan = classify(&m, Path::new("/ws/repo/a"), Path::new("/ws/repo/b/c"), false);
        assert_eq!(
            plan,
            ProjectMove::WithinWorkTree {
                src_prefix: "a".into(),
                dst_prefix: "b/c".into(),
            }
        );
    }

    #[test]
    fn project_carrying_its_repository() {
        let m = mapping("/home/u/proj", "/home/u/proj/.wll", "/home/u/proj");
        let plan = classify(&m, Path::new("/home/u/proj"), Path::new("/home/u/moved"), false);
        assert_eq!(
            plan,
            ProjectMove::CarriesRepository {
                metadata_offset: PathBuf::from(".wll"),
            }
        );
    }

    #[test]
    fn project_leaving_the_repository() {
        let m = mapping("/home/u/repo", "/home/u/repo/.wll", "/home/u/repo/proj");
        let plan = classify(&m, Path::new("/home/u/repo/proj"), Path::new("/home/u/elsewhere"), false);
        assert_eq!(plan, ProjectMove::LeavesRepository);
    }

    #[test]
    fn carried_repository_to_another_tree_still_travels() {
        let m = mapping("/home/u/proj", "/home/u/proj/.wll", "/home/u/proj");
        let plan = classify(&m, Path::new("/home/u/proj"), Path::new("/mnt/proj"), false);
        assert_eq!(
            plan,
            ProjectMove::CarriesRepository {
                metadata_offset: PathBuf::from(".wll"),
            }
        );
    }

    #[test]
    fn same_depth_rename_is_not_nesting() {
        let m = mapping("/ws/repo", "/ws/repo/.wll", "/ws/repo/proj");
        let plan = classify(&m, Path::new("/ws/repo/proj"), Path::new("/ws/repo/proj"), false);
        assert!(matches!(plan, ProjectMove::WithinWorkTree { .. }));
    }
}
