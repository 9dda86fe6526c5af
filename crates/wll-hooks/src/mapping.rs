//! Repository mappings and the collaborators that provide them.
//!
//! A [`RepositoryMapping`] ties a workspace location to a repository and the
//! location's path relative to the repository's work tree. The hook resolves
//! mappings on every call through a [`MappingResolver`] and never caches them.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use wll_index::IndexBackend;

use crate::error::HookResult;
use crate::resource::Resource;

/// A repository: its work tree, its metadata directory, and its index.
pub struct Repository {
    work_tree: PathBuf,
    metadata_dir: PathBuf,
    index: Arc<dyn IndexBackend>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("work_tree", &self.work_tree)
            .field("metadata_dir", &self.metadata_dir)
            .finish()
    }
}

impl Repository {
    pub fn new(
        work_tree: impl Into<PathBuf>,
        metadata_dir: impl Into<PathBuf>,
        index: Arc<dyn IndexBackend>,
    ) -> Self {
        Self {
            work_tree: work_tree.into(),
            metadata_dir: metadata_dir.into(),
            index,
        }
    }

    pub fn work_tree(&self) -> &Path {
        &self.work_tree
    }

    pub fn metadata_dir(&self) -> &Path {
        &self.metadata_dir
    }

    pub fn index(&self) -> &dyn IndexBackend {
        self.index.as_ref()
    }

    /// Two handles denote the same repository iff they share a metadata
    /// directory.
    pub fn is_same(&self, other: &Repository) -> bool {
        self.metadata_dir == other.metadata_dir
    }

    /// `location` relative to the work tree as an index path. The work tree
    /// itself maps to the empty path. `None` if `location` is outside the
    /// work tree or not representable as an index path.
    pub fn relative_path(&self, location: &Path) -> Option<String> {
        let rest = location.strip_prefix(&self.work_tree).ok()?;
        let mut parts = Vec::new();
        for component in rest.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_str()?),
                _ => return None,
            }
        }
        Some(parts.join("/"))
    }
}

/// A location resolved to its repository.
#[derive(Clone, Debug)]
pub struct RepositoryMapping {
    pub repository: Arc<Repository>,
    /// Path relative to the work tree; empty for the work tree root.
    pub relative_path: String,
}

impl RepositoryMapping {
    /// Resolve `location` against `repository`.
    pub fn of(repository: Arc<Repository>, location: &Path) -> Option<Self> {
        let relative_path = repository.relative_path(location)?;
        Some(Self {
            repository,
            relative_path,
        })
    }

    /// Returns `true` if `other` maps into the same repository.
    pub fn same_repository(&self, other: &RepositoryMapping) -> bool {
        self.repository.is_same(&other.repository)
    }
}

/// Finds the repository, if any, that a workspace location belongs to.
pub trait MappingResolver: Send + Sync {
    fn resolve(&self, location: &Path) -> Option<RepositoryMapping>;
}

/// A fixed set of repositories. The deepest work tree containing a location
/// wins, so nested repositories shadow their parents.
#[derive(Debug, Default)]
pub struct StaticMappings {
    repositories: Vec<Arc<Repository>>,
}

impl StaticMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, repository: Arc<Repository>) -> Self {
        self.repositories.push(repository);
        self
    }
}

impl MappingResolver for StaticMappings {
    fn resolve(&self, location: &Path) -> Option<RepositoryMapping> {
        self.repositories
            .iter()
            .filter(|r| location.starts_with(r.work_tree()))
            .max_by_key(|r| r.work_tree().components().count())
            .and_then(|r| RepositoryMapping::of(Arc::clone(r), location))
    }
}

/// Connects and disconnects projects from version control.
pub trait ProjectConnector: Send + Sync {
    /// Stop treating `project` as version controlled.
    fn unmap(&self, project: &Resource) -> HookResult<()>;

    /// Connect `project` to the repository whose metadata lives at
    /// `metadata_dir`.
    fn remap(&self, project: &Resource, metadata_dir: &Path) -> HookResult<()>;
}

/// A connector for hosts without a project-to-repository registry: mappings
/// are discovered from the disk, so there is nothing to update.
#[derive(Clone, Copy, Debug, Default)]
pub struct DiscoveredProjects;

impl ProjectConnector for DiscoveredProjects {
    fn unmap(&self, _project: &Resource) -> HookResult<()> {
        Ok(())
    }

    fn remap(&self, _project: &Resource, _metadata_dir: &Path) -> HookResult<()> {
        Ok(())
    }
}

/// Advisory knowledge about a path's tracking state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathHint {
    /// Present in the work tree, not in the index.
    Untracked,
    /// Matched by an ignore rule and not in the index.
    IgnoredNotInIndex,
    /// No cached knowledge; the index must be consulted.
    Unknown,
}

impl PathHint {
    /// Returns `true` if the index certainly has nothing for this path.
    pub fn is_untracked(self) -> bool {
        matches!(self, Self::Untracked | Self::IgnoredNotInIndex)
    }
}

/// Cached "is this path untracked or ignored" answers.
pub trait UntrackedOracle: Send + Sync {
    fn classify(&self, repository: &Repository, path: &str) -> PathHint;
}

/// An oracle that knows nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHints;

impl UntrackedOracle for NoHints {
    fn classify(&self, _repository: &Repository, _path: &str) -> PathHint {
        PathHint::Unknown
    }
}
