//! The `Backend` contract every concrete remote and every wrapper layer satisfies.

use std::fmt;
use std::io::{Read, Seek, Write};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::BackendResult;
use crate::types::{FileInfo, ListDirOptions, OpenMode};

/// An open stream against a single physical path on a [`Backend`].
///
/// Combines the standard `Read`/`Write`/`Seek` traits (so a stream can be
/// driven with ordinary `std::io` code) with the two operations the core
/// needs that those traits don't offer: an authoritative byte length and an
/// idempotent close.
pub trait BackendStream: Read + Write + Seek + fmt::Debug {
    /// Total byte length of the underlying content.
    fn size(&self) -> BackendResult<u64>;

    /// Flushes and releases the stream. Calling this more than once is a no-op.
    fn close(&mut self) -> BackendResult<()>;
}

/// A named store capable of holding files and directories under POSIX-style paths.
///
/// Implemented directly by concrete remotes ([`crate::LocalBackend`],
/// [`crate::MemoryBackend`]) and by every wrapper layer built on top of a
/// backend ([`crate::SizedBackend`], and, in the crates above this one, the
/// parted and composite filesystems) so that the whole stack can be composed
/// out of trait objects.
pub trait Backend: fmt::Debug {
    /// Human-readable name used in diagnostics and in writer-selection logs.
    fn name(&self) -> &str;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Whether `path` names an existing file.
    fn isfile(&self, path: &str) -> bool;

    /// Whether `path` names an existing directory.
    fn isdir(&self, path: &str) -> bool;

    /// Lists the entries directly under `path`, filtered by `opts`.
    fn listdir(&self, path: &str, opts: &ListDirOptions) -> BackendResult<Vec<String>>;

    /// Creates a directory at `path`.
    fn makedir(&self, path: &str, recursive: bool, allow_recreate: bool) -> BackendResult<()>;

    /// Removes a directory at `path`.
    fn removedir(&self, path: &str, recursive: bool, force: bool) -> BackendResult<()>;

    /// Removes the file at `path`.
    fn remove(&self, path: &str) -> BackendResult<()>;

    /// Renames `src` to `dst`, which must not already exist.
    fn rename(&self, src: &str, dst: &str) -> BackendResult<()>;

    /// Copies the file at `src` to `dst`.
    fn copy(&self, src: &str, dst: &str) -> BackendResult<()>;

    /// Total byte length of the file at `path`.
    fn getsize(&self, path: &str) -> BackendResult<u64>;

    /// Metadata for the entry at `path`.
    fn getinfo(&self, path: &str) -> BackendResult<FileInfo>;

    /// Updates access/modification times for the entry at `path`.
    fn settimes(
        &self,
        path: &str,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> BackendResult<()>;

    /// Remaining capacity in bytes, or `NoMeta` if this backend cannot report it.
    fn free_space(&self) -> BackendResult<u64>;

    /// Opens `path` in the given mode.
    fn open(&self, path: &str, mode: OpenMode) -> BackendResult<Box<dyn BackendStream>>;
}

/// A backend shared across the layers that need to hold a reference to it
/// (principally the fan-out composite, which owns one per member). Trait
/// objects, not generics, are the seam here because the stack is composed at
/// runtime from a list of remotes parsed off the command line.
pub type SharedBackend = Arc<dyn Backend + Send + Sync>;
