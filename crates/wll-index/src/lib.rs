//! Staging index for the WorldLine Ledger.
//!
//! The index records, for every tracked path, the content that would go into
//! the next commitment. Entries are kept sorted by path and merge stage, so a
//! directory's entries always form one contiguous range.
//!
//! All mutation happens through a [`LockedIndex`], which owns the backend's
//! lock for its lifetime and releases it on every exit path.
//!
//! # Key Types
//!
//! - [`IndexEntry`] -- A tracked path with mode, size, mtime, and content identity
//! - [`Stage`] -- Merged, or one stage of an unresolved conflict
//! - [`IndexBackend`] -- Lockable storage ([`InMemoryIndex`], [`FileIndex`])
//! - [`LockedIndex`] -- Lookups, range scans, [`IndexBuilder`] and [`IndexEditor`]
//! - [`Edit`] -- Declarative edits: delete a path, delete a tree, relocate an entry

pub mod backend;
pub mod entry;
pub mod error;
pub mod file;
pub mod lock;
pub mod memory;
pub mod path;

pub use backend::IndexBackend;
pub use entry::{EntryMode, IndexEntry, ObjectId, Stage};
pub use error::{IndexError, IndexResult};
pub use file::FileIndex;
pub use lock::{Edit, IndexBuilder, IndexEditor, LockedIndex};
pub use memory::InMemoryIndex;
