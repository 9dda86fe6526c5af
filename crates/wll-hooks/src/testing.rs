//! Recording fakes for the hook's collaborators.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use wll_index::{
    EntryMode, IndexBackend, IndexEntry, IndexError, IndexResult, InMemoryIndex, ObjectId, Stage,
};

use crate::error::{HookError, HookResult};
use crate::host::{HostCommands, HostQuery};
use crate::mapping::{PathHint, ProjectConnector, Repository, UntrackedOracle};
use crate::outcome::Status;
use crate::resource::{Depth, ProjectDescription, Resource, UpdateFlags};

pub fn merged(path: &str) -> IndexEntry {
    IndexEntry::new(path, ObjectId::for_content(path.as_bytes()), EntryMode::Regular, path.len() as u64)
}

pub fn conflict(path: &str, stage: Stage) -> IndexEntry {
    IndexEntry::conflicted(path, stage, ObjectId::for_content(b"conflict"), EntryMode::Regular, 8)
}

/// Wraps an in-memory index whose commits always fail.
pub struct FailingCommit {
    inner: InMemoryIndex,
}

impl FailingCommit {
    pub fn new(entries: Vec<IndexEntry>) -> Self {
        Self {
            inner: InMemoryIndex::with_entries(entries),
        }
    }

    pub fn inner(&self) -> &InMemoryIndex {
        &self.inner
    }
}

impl IndexBackend for FailingCommit {
    fn try_lock(&self) -> IndexResult<()> {
        self.inner.try_lock()
    }

    fn read(&self) -> IndexResult<Vec<IndexEntry>> {
        self.inner.read()
    }

    fn commit(&self, _entries: &[IndexEntry]) -> IndexResult<()> {
        Err(IndexError::CommitFailed("injected failure".into()))
    }

    fn unlock(&self) {
        self.inner.unlock()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostCall {
    DeleteFile(PathBuf),
    DeleteFolder(PathBuf),
    DeleteProject(PathBuf),
    MoveFile(PathBuf, PathBuf),
    MoveFolder(PathBuf, PathBuf),
    MoveProject(PathBuf, PathBuf),
}

/// A host that records every command. Optionally observes an index at the
/// moment each command runs, to check ordering against index commits.
pub struct RecordingHost {
    root: PathBuf,
    out_of_sync: Mutex<HashSet<PathBuf>>,
    missing: Mutex<HashSet<PathBuf>>,
    calls: Mutex<Vec<HostCall>>,
    failures: Mutex<Vec<Status>>,
    observed: Mutex<Vec<Vec<IndexEntry>>>,
    watch: Option<Arc<InMemoryIndex>>,
}

impl RecordingHost {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            out_of_sync: Mutex::new(HashSet::new()),
            missing: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
            observed: Mutex::new(Vec::new()),
            watch: None,
        }
    }

    pub fn watching(mut self, index: Arc<InMemoryIndex>) -> Self {
        self.watch = Some(index);
        self
    }

    pub fn mark_out_of_sync(&self, location: impl Into<PathBuf>) {
        self.out_of_sync.lock().unwrap().insert(location.into());
    }

    pub fn mark_missing(&self, location: impl Into<PathBuf>) {
        self.missing.lock().unwrap().insert(location.into());
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<Status> {
        self.failures.lock().unwrap().clone()
    }

    /// Index snapshots taken as each command ran.
    pub fn observed(&self) -> Vec<Vec<IndexEntry>> {
        self.observed.lock().unwrap().clone()
    }

    fn record(&self, call: HostCall) {
        if let Some(index) = &self.watch {
            assert!(!index.is_locked(), "host command ran while the index was locked");
            self.observed.lock().unwrap().push(index.snapshot());
        }
        self.calls.lock().unwrap().push(call);
    }
}

impl HostQuery for RecordingHost {
    fn is_synchronized(&self, resource: &Resource, _depth: Depth) -> bool {
        !self.out_of_sync.lock().unwrap().contains(&resource.location)
    }

    fn exists(&self, resource: &Resource) -> bool {
        !self.missing.lock().unwrap().contains(&resource.location)
    }

    fn workspace_root(&self) -> PathBuf {
        self.root.clone()
    }
}

impl HostCommands for RecordingHost {
    fn standard_delete_file(&self, file: &Resource, _flags: UpdateFlags) {
        self.record(HostCall::DeleteFile(file.location.clone()));
    }

    fn standard_delete_folder(&self, folder: &Resource, _flags: UpdateFlags) {
        self.record(HostCall::DeleteFolder(folder.location.clone()));
    }

    fn standard_delete_project(&self, project: &Resource, _flags: UpdateFlags) {
        self.record(HostCall::DeleteProject(project.location.clone()));
    }

    fn standard_move_file(&self, src: &Resource, dst: &Resource, _flags: UpdateFlags) {
        self.record(HostCall::MoveFile(src.location.clone(), dst.location.clone()));
    }

    fn standard_move_folder(&self, src: &Resource, dst: &Resource, _flags: UpdateFlags) {
        self.record(HostCall::MoveFolder(src.location.clone(), dst.location.clone()));
    }

    fn standard_move_project(
        &self,
        project: &Resource,
        description: &ProjectDescription,
        _flags: UpdateFlags,
    ) {
        let dst = description.target_location(&self.root);
        self.record(HostCall::MoveProject(project.location.clone(), dst));
    }

    fn failed(&self, status: Status) {
        self.failures.lock().unwrap().push(status);
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectorCall {
    Unmap(PathBuf),
    Remap(PathBuf, PathBuf),
}

/// A project connector that records calls and can be told to fail.
#[derive(Default)]
pub struct RecordingConnector {
    calls: Mutex<Vec<ConnectorCall>>,
    fail_unmap: bool,
    fail_remap: bool,
}

impl RecordingConnector {
    pub fn failing_unmap() -> Self {
        Self {
            fail_unmap: true,
            ..Self::default()
        }
    }

    pub fn failing_remap() -> Self {
        Self {
            fail_remap: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<ConnectorCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl ProjectConnector for RecordingConnector {
    fn unmap(&self, project: &Resource) -> HookResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(ConnectorCall::Unmap(project.location.clone()));
        if self.fail_unmap {
            return Err(HookError::Unmap {
                project: project.location.clone(),
                reason: "provider busy".into(),
            });
        }
        Ok(())
    }

    fn remap(&self, project: &Resource, metadata_dir: &Path) -> HookResult<()> {
        self.calls.lock().unwrap().push(ConnectorCall::Remap(
            project.location.clone(),
            metadata_dir.to_path_buf(),
        ));
        if self.fail_remap {
            return Err(HookError::Remap {
                project: project.location.clone(),
                reason: "provider busy".into(),
            });
        }
        Ok(())
    }
}

/// An oracle that gives the same answer for every path.
pub struct FixedOracle(pub PathHint);

impl UntrackedOracle for FixedOracle {
    fn classify(&self, _repository: &Repository, _path: &str) -> PathHint {
        self.0
    }
}
