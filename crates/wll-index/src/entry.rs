//! Index entry types: content identity, file mode, and merge stage.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Content identity of a staged blob (BLAKE3 of the file contents).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId([u8; 32]);

impl ObjectId {
    /// Compute the identity of a blob's content.
    pub fn for_content(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_hex())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// File mode recorded for an index entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
}

impl EntryMode {
    /// Octal mode value.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => 0o100644,
            Self::Executable => 0o100755,
            Self::Symlink => 0o120000,
        }
    }
}

impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06o}", self.mode_bits())
    }
}

/// Merge stage of an entry.
///
/// A merged path has exactly one entry at [`Stage::Merged`]. An unresolved
/// conflict is recorded as up to three entries for the same path, one per
/// conflict stage. Variant order is the on-disk sort order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Merged,
    Base,
    Ours,
    Theirs,
}

impl Stage {
    /// Numeric stage as shown by `ls-files --stage`.
    pub fn number(&self) -> u8 {
        match self {
            Self::Merged => 0,
            Self::Base => 1,
            Self::Ours => 2,
            Self::Theirs => 3,
        }
    }
}

/// An entry in the staging index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Path relative to the repository root, `/`-separated.
    pub path: String,
    /// Merge stage of this entry.
    pub stage: Stage,
    /// File mode.
    pub mode: EntryMode,
    /// File size in bytes.
    pub size: u64,
    /// Last modification time (used for quick dirty checks).
    pub mtime: SystemTime,
    /// Identity of the staged content.
    pub object_id: ObjectId,
}

impl IndexEntry {
    /// Create a merged entry.
    pub fn new(path: impl Into<String>, object_id: ObjectId, mode: EntryMode, size: u64) -> Self {
        Self {
            path: path.into(),
            stage: Stage::Merged,
            mode,
            size,
            mtime: SystemTime::now(),
            object_id,
        }
    }

    /// Create a conflict-stage entry.
    pub fn conflicted(
        path: impl Into<String>,
        stage: Stage,
        object_id: ObjectId,
        mode: EntryMode,
        size: u64,
    ) -> Self {
        Self {
            stage,
            ..Self::new(path, object_id, mode, size)
        }
    }

    /// Returns `true` unless this entry is one stage of an unresolved conflict.
    pub fn is_merged(&self) -> bool {
        self.stage == Stage::Merged
    }

    /// A merged entry at `path` carrying this entry's content metadata
    /// (mode, size, mtime, object identity) unchanged.
    pub fn relocated(&self, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            stage: Stage::Merged,
            mode: self.mode,
            size: self.size,
            mtime: self.mtime,
            object_id: self.object_id,
        }
    }

    pub(crate) fn sort_key(&self) -> (&str, Stage) {
        (self.path.as_str(), self.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_identity_is_deterministic() {
        assert_eq!(ObjectId::for_content(b"hello"), ObjectId::for_content(b"hello"));
        assert_ne!(ObjectId::for_content(b"hello"), ObjectId::for_content(b"world"));
    }

    #[test]
    fn display_is_full_hex() {
        let id = ObjectId::for_content(b"test");
        assert_eq!(format!("{id}").len(), 64);
        assert_eq!(id.short_hex().len(), 8);
    }

    #[test]
    fn new_entry_is_merged() {
        let entry = IndexEntry::new("a.txt", ObjectId::for_content(b"a"), EntryMode::Regular, 1);
        assert!(entry.is_merged());
        assert_eq!(entry.stage.number(), 0);
    }

    #[test]
    fn conflicted_entry_is_unmerged() {
        let entry = IndexEntry::conflicted(
            "a.txt",
            Stage::Ours,
            ObjectId::for_content(b"a"),
            EntryMode::Regular,
            1,
        );
        assert!(!entry.is_merged());
        assert_eq!(entry.stage.number(), 2);
    }

    #[test]
    fn relocated_copies_metadata_verbatim() {
        let entry = IndexEntry::new("src/a.txt", ObjectId::for_content(b"a"), EntryMode::Executable, 7);
        let moved = entry.relocated("dst/a.txt");
        assert_eq!(moved.path, "dst/a.txt");
        assert_eq!(moved.object_id, entry.object_id);
        assert_eq!(moved.mode, entry.mode);
        assert_eq!(moved.size, entry.size);
        assert_eq!(moved.mtime, entry.mtime);
    }

    #[test]
    fn stages_sort_merged_first() {
        assert!(Stage::Merged < Stage::Base);
        assert!(Stage::Ours < Stage::Theirs);
    }

    #[test]
    fn entry_mode_display_is_octal() {
        assert_eq!(EntryMode::Regular.to_string(), "100644");
        assert_eq!(EntryMode::Executable.to_string(), "100755");
    }

    #[test]
    fn entry_serde_roundtrip() {
        let entry = IndexEntry::new("a.txt", ObjectId::for_content(b"a"), EntryMode::Regular, 1);
        let json = serde_json::to_string(&entry).unwrap();
        let parsed: IndexEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entry);
    }
}
