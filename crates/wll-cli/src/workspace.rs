//! The filesystem as a hook host.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, warn};
use wll_hooks::{
    Depth, HostCommands, HostQuery, MappingResolver, PathHint, ProjectDescription, Repository,
    RepositoryMapping, Resource, Status, UntrackedOracle, UpdateFlags,
};
use wll_index::FileIndex;

pub const INDEX_FILE: &str = "index";
pub const CONFIG_FILE: &str = "hooks.toml";
pub const IGNORE_FILE: &str = ".wllignore";

/// Runs the host's default primitives directly on disk and collects the
/// failures the hook reports.
pub struct FsHost {
    root: PathBuf,
    failures: Mutex<Vec<Status>>,
}

impl FsHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Drain the failures reported so far.
    pub fn take_failures(&self) -> Vec<Status> {
        std::mem::take(&mut *self.lock_failures())
    }

    fn lock_failures(&self) -> std::sync::MutexGuard<'_, Vec<Status>> {
        self.failures.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check(&self, what: &str, location: &Path, result: io::Result<()>) {
        if let Err(e) = result {
            warn!(location = %location.display(), error = %e, "{what} failed");
            self.lock_failures()
                .push(Status::error(format!("{what} {}: {e}", location.display())));
        }
    }
}

fn rename(src: &Path, dst: &Path) -> io::Result<()> {
    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::rename(src, dst)
}

impl HostQuery for FsHost {
    // The disk is the only view there is.
    fn is_synchronized(&self, _resource: &Resource, _depth: Depth) -> bool {
        true
    }

    fn exists(&self, resource: &Resource) -> bool {
        fs::symlink_metadata(&resource.location).is_ok()
    }

    fn workspace_root(&self) -> PathBuf {
        self.root.clone()
    }
}

impl HostCommands for FsHost {
    fn standard_delete_file(&self, file: &Resource, _flags: UpdateFlags) {
        self.check("delete", &file.location, fs::remove_file(&file.location));
    }

    fn standard_delete_folder(&self, folder: &Resource, _flags: UpdateFlags) {
        self.check("delete", &folder.location, fs::remove_dir_all(&folder.location));
    }

    fn standard_delete_project(&self, project: &Resource, _flags: UpdateFlags) {
        self.check("delete", &project.location, fs::remove_dir_all(&project.location));
    }

    fn standard_move_file(&self, src: &Resource, dst: &Resource, _flags: UpdateFlags) {
        self.check("move", &src.location, rename(&src.location, &dst.location));
    }

    fn standard_move_folder(&self, src: &Resource, dst: &Resource, _flags: UpdateFlags) {
        self.check("move", &src.location, rename(&src.location, &dst.location));
    }

    fn standard_move_project(
        &self,
        project: &Resource,
        description: &ProjectDescription,
        _flags: UpdateFlags,
    ) {
        let dst = description.target_location(&self.root);
        self.check("move", &project.location, rename(&project.location, &dst));
    }

    fn failed(&self, status: Status) {
        self.lock_failures().push(status);
    }
}

/// Finds repositories by walking up from a location to the nearest directory
/// holding a metadata directory.
pub struct DiscoveredMappings {
    metadata_dir_name: String,
    repositories: Mutex<HashMap<PathBuf, Arc<Repository>>>,
}

impl DiscoveredMappings {
    pub fn new(metadata_dir_name: impl Into<String>) -> Self {
        Self {
            metadata_dir_name: metadata_dir_name.into(),
            repositories: Mutex::new(HashMap::new()),
        }
    }

    /// The work tree containing `location`, if any.
    pub fn find_work_tree(&self, location: &Path) -> Option<PathBuf> {
        location
            .ancestors()
            .find(|dir| dir.join(&self.metadata_dir_name).is_dir())
            .map(Path::to_path_buf)
    }

    pub fn repository(&self, work_tree: &Path) -> Arc<Repository> {
        let mut repositories = self
            .repositories
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let metadata_dir = work_tree.join(&self.metadata_dir_name);
        Arc::clone(repositories.entry(work_tree.to_path_buf()).or_insert_with(|| {
            debug!(work_tree = %work_tree.display(), "repository discovered");
            let index = Arc::new(FileIndex::new(metadata_dir.join(INDEX_FILE)));
            Arc::new(Repository::new(work_tree, metadata_dir, index))
        }))
    }
}

impl MappingResolver for DiscoveredMappings {
    fn resolve(&self, location: &Path) -> Option<RepositoryMapping> {
        // A path inside a metadata directory belongs to no repository.
        if location
            .components()
            .any(|c| c.as_os_str() == self.metadata_dir_name.as_str())
            && location.file_name().map_or(true, |n| n != self.metadata_dir_name.as_str())
        {
            return None;
        }
        let work_tree = self.find_work_tree(location)?;
        RepositoryMapping::of(self.repository(&work_tree), location)
    }
}

/// Answers "untracked" for paths matched by the work tree's `.wllignore`
/// that the index does not contain.
#[derive(Default)]
pub struct IgnoreOracle {
    matchers: Mutex<HashMap<PathBuf, Arc<Gitignore>>>,
}

impl IgnoreOracle {
    pub fn new() -> Self {
        Self::default()
    }

    fn matcher(&self, work_tree: &Path) -> Arc<Gitignore> {
        let mut matchers = self
            .matchers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(
            matchers
                .entry(work_tree.to_path_buf())
                .or_insert_with(|| Arc::new(load_ignore(work_tree))),
        )
    }

    /// Returns `true` if `path` (relative to `work_tree`) is ignored.
    pub fn is_ignored(&self, work_tree: &Path, path: &str, is_dir: bool) -> bool {
        if path.is_empty() {
            return false;
        }
        self.matcher(work_tree)
            .matched_path_or_any_parents(Path::new(path), is_dir)
            .is_ignore()
    }
}

fn load_ignore(work_tree: &Path) -> Gitignore {
    let mut builder = GitignoreBuilder::new(work_tree);
    let file = work_tree.join(IGNORE_FILE);
    if file.is_file() {
        if let Some(e) = builder.add(&file) {
            warn!(file = %file.display(), error = %e, "ignoring malformed ignore rules");
        }
    }
    builder.build().unwrap_or_else(|e| {
        warn!(error = %e, "ignore rules unusable");
        Gitignore::empty()
    })
}

impl UntrackedOracle for IgnoreOracle {
    fn classify(&self, repository: &Repository, path: &str) -> PathHint {
        if !self.is_ignored(repository.work_tree(), path, false) {
            return PathHint::Unknown;
        }
        // An ignored path may still have been staged explicitly.
        match repository.index().read() {
            Ok(entries) if entries.iter().all(|e| e.path != path) => PathHint::IgnoredNotInIndex,
            _ => PathHint::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join(".wll")).unwrap();
        dir
    }

    #[test]
    fn resolves_nearest_work_tree() {
        let dir = repo_dir();
        fs::create_dir_all(dir.path().join("src/deep")).unwrap();
        let mappings = DiscoveredMappings::new(".wll");

        let mapping = mappings.resolve(&dir.path().join("src/deep/a.txt")).unwrap();
        assert_eq!(mapping.relative_path, "src/deep/a.txt");
        assert_eq!(mapping.repository.work_tree(), dir.path());

        let root = mappings.resolve(dir.path()).unwrap();
        assert_eq!(root.relative_path, "");
    }

    #[test]
    fn nested_repository_shadows_parent() {
        let dir = repo_dir();
        fs::create_dir_all(dir.path().join("vendor/lib/.wll")).unwrap();
        let mappings = DiscoveredMappings::new(".wll");

        let inner = mappings.resolve(&dir.path().join("vendor/lib/x.rs")).unwrap();
        let outer = mappings.resolve(&dir.path().join("vendor/y.rs")).unwrap();
        assert_eq!(inner.relative_path, "x.rs");
        assert!(!inner.same_repository(&outer));
    }

    #[test]
    fn metadata_contents_are_unmapped() {
        let dir = repo_dir();
        let mappings = DiscoveredMappings::new(".wll");
        assert!(mappings.resolve(&dir.path().join(".wll/index")).is_none());
        let meta = mappings.resolve(&dir.path().join(".wll")).unwrap();
        assert_eq!(meta.repository.metadata_dir(), dir.path().join(".wll"));
    }

    #[test]
    fn outside_any_repository() {
        let dir = tempfile::tempdir().unwrap();
        let mappings = DiscoveredMappings::new(".wll");
        assert!(mappings.resolve(&dir.path().join("a.txt")).is_none());
    }

    #[test]
    fn ignore_oracle_respects_index_membership() {
        let dir = repo_dir();
        fs::write(dir.path().join(IGNORE_FILE), "*.log\nbuild/\n").unwrap();
        let mappings = DiscoveredMappings::new(".wll");
        let repo = mappings.repository(dir.path());
        let oracle = IgnoreOracle::new();

        assert_eq!(oracle.classify(&repo, "debug.log"), PathHint::IgnoredNotInIndex);
        assert_eq!(oracle.classify(&repo, "build/out.o"), PathHint::IgnoredNotInIndex);
        assert_eq!(oracle.classify(&repo, "src/main.rs"), PathHint::Unknown);

        let index = repo.index();
        index.try_lock().unwrap();
        let staged = wll_index::IndexEntry::new(
            "debug.log",
            wll_index::ObjectId::for_content(b"x"),
            wll_index::EntryMode::Regular,
            1,
        );
        index.commit(&[staged]).unwrap();
        assert_eq!(oracle.classify(&repo, "debug.log"), PathHint::Unknown);
    }

    #[test]
    fn fs_host_moves_into_new_directories() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "hello").unwrap();
        let dst = dir.path().join("nested/dir/b.txt");
        let host = FsHost::new(dir.path());

        host.standard_move_file(&Resource::file(&src), &Resource::file(&dst), UpdateFlags::NONE);
        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "hello");
        assert!(host.take_failures().is_empty());
    }

    #[test]
    fn fs_host_collects_io_failures() {
        let dir = tempfile::tempdir().unwrap();
        let host = FsHost::new(dir.path());
        host.standard_delete_file(&Resource::file(dir.path().join("missing")), UpdateFlags::NONE);
        let failures = host.take_failures();
        assert_eq!(failures.len(), 1);
        assert!(host.take_failures().is_empty());
    }
}
