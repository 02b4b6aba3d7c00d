//! Rebases a destination path under a fixed prefix.
//!
//! Lets `cuckoodrive sync <src> <dst>` reconcile against a subtree of the
//! composite store instead of always writing to its root, without teaching
//! [`SyncDriver`](cuckoo_sync::SyncDriver) anything about path prefixes.

use std::time::SystemTime;

use cuckoo_backend::{Backend, BackendResult, BackendStream, FileInfo, ListDirOptions, OpenMode, SharedBackend};

#[derive(Debug)]
pub struct PrefixedBackend {
    inner: SharedBackend,
    prefix: String,
}

impl PrefixedBackend {
    pub fn new(inner: SharedBackend, prefix: &str) -> Self {
        let trimmed = prefix.trim_start_matches('/').trim_end_matches('/');
        Self { inner, prefix: trimmed.to_string() }
    }

    fn rebase(&self, path: &str) -> String {
        let trimmed = path.trim_start_matches('/');
        if self.prefix.is_empty() {
            format!("/{trimmed}")
        } else if trimmed.is_empty() {
            format!("/{}", self.prefix)
        } else {
            format!("/{}/{trimmed}", self.prefix)
        }
    }
}

impl Backend for PrefixedBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn exists(&self, path: &str) -> bool {
        self.inner.exists(&self.rebase(path))
    }

    fn isfile(&self, path: &str) -> bool {
        self.inner.isfile(&self.rebase(path))
    }

    fn isdir(&self, path: &str) -> bool {
        self.inner.isdir(&self.rebase(path))
    }

    fn listdir(&self, path: &str, opts: &ListDirOptions) -> BackendResult<Vec<String>> {
        self.inner.listdir(&self.rebase(path), opts)
    }

    fn makedir(&self, path: &str, recursive: bool, allow_recreate: bool) -> BackendResult<()> {
        self.inner.makedir(&self.rebase(path), recursive, allow_recreate)
    }

    fn removedir(&self, path: &str, recursive: bool, force: bool) -> BackendResult<()> {
        self.inner.removedir(&self.rebase(path), recursive, force)
    }

    fn remove(&self, path: &str) -> BackendResult<()> {
        self.inner.remove(&self.rebase(path))
    }

    fn rename(&self, src: &str, dst: &str) -> BackendResult<()> {
        self.inner.rename(&self.rebase(src), &self.rebase(dst))
    }

    fn copy(&self, src: &str, dst: &str) -> BackendResult<()> {
        self.inner.copy(&self.rebase(src), &self.rebase(dst))
    }

    fn getsize(&self, path: &str) -> BackendResult<u64> {
        self.inner.getsize(&self.rebase(path))
    }

    fn getinfo(&self, path: &str) -> BackendResult<FileInfo> {
        self.inner.getinfo(&self.rebase(path))
    }

    fn settimes(&self, path: &str, accessed: Option<SystemTime>, modified: Option<SystemTime>) -> BackendResult<()> {
        self.inner.settimes(&self.rebase(path), accessed, modified)
    }

    fn free_space(&self) -> BackendResult<u64> {
        self.inner.free_space()
    }

    fn open(&self, path: &str, mode: OpenMode) -> BackendResult<Box<dyn BackendStream>> {
        self.inner.open(&self.rebase(path), mode)
    }
}
