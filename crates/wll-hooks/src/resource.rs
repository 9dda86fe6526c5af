//! Workspace resources as seen by the hook.

use std::path::{Path, PathBuf};

/// Kind of workspace resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    File,
    Folder,
    Project,
}

/// A file, folder, or project in the host's resource tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    /// What kind of resource this is.
    pub kind: ResourceKind,
    /// Absolute location on disk.
    pub location: PathBuf,
    /// Linked (virtual) resources point outside the tree and are never
    /// tracked by a repository.
    pub linked: bool,
    /// Derived resources are build outputs and never tracked.
    pub derived: bool,
}

impl Resource {
    fn new(kind: ResourceKind, location: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            location: location.into(),
            linked: false,
            derived: false,
        }
    }

    pub fn file(location: impl Into<PathBuf>) -> Self {
        Self::new(ResourceKind::File, location)
    }

    pub fn folder(location: impl Into<PathBuf>) -> Self {
        Self::new(ResourceKind::Folder, location)
    }

    pub fn project(location: impl Into<PathBuf>) -> Self {
        Self::new(ResourceKind::Project, location)
    }

    /// Mark as a linked resource.
    pub fn linked(mut self) -> Self {
        self.linked = true;
        self
    }

    /// Mark as a derived resource.
    pub fn derived(mut self) -> Self {
        self.derived = true;
        self
    }

    /// Last path component, if it is valid UTF-8.
    pub fn name(&self) -> Option<&str> {
        self.location.file_name()?.to_str()
    }
}

/// How deep a synchronization check reaches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Depth {
    /// Only the resource itself.
    Zero,
    /// The resource and everything below it.
    Infinite,
}

/// Flags the host passes along with a move or delete request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UpdateFlags {
    /// Proceed even if the resource tree is out of sync with the disk.
    pub force: bool,
}

impl UpdateFlags {
    pub const NONE: Self = Self { force: false };
    pub const FORCE: Self = Self { force: true };
}

/// Where a project is being moved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectDescription {
    /// Project name after the move.
    pub name: String,
    /// Explicit target location. `None` means the default location under
    /// the workspace root, named after the project.
    pub location: Option<PathBuf>,
}

impl ProjectDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: None,
        }
    }

    pub fn at(name: impl Into<String>, location: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            location: Some(location.into()),
        }
    }

    /// Absolute target location given the workspace root.
    pub fn target_location(&self, workspace_root: &Path) -> PathBuf {
        match &self.location {
            Some(location) => location.clone(),
            None => workspace_root.join(&self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_flags() {
        let r = Resource::file("/ws/a.txt").linked().derived();
        assert_eq!(r.kind, ResourceKind::File);
        assert!(r.linked && r.derived);
        assert_eq!(r.name(), Some("a.txt"));
    }

    #[test]
    fn project_target_defaults_under_workspace_root() {
        let root = Path::new("/ws");
        assert_eq!(ProjectDescription::new("p2").target_location(root), PathBuf::from("/ws/p2"));
        assert_eq!(
            ProjectDescription::at("p2", "/elsewhere/p2").target_location(root),
            PathBuf::from("/elsewhere/p2")
        );
    }
}
