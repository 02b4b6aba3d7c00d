//! Fan-out over a fixed set of backends, picking the best writer per call.

use std::time::SystemTime;

use cuckoo_backend::{
    Backend, BackendError, BackendResult, BackendStream, FileInfo, ListDirOptions, OpenMode, SharedBackend,
};
use tracing::debug;

struct Member {
    backend: SharedBackend,
    closed: bool,
}

impl std::fmt::Debug for Member {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.backend.name())
            .field("closed", &self.closed)
            .finish()
    }
}

/// Aggregates N backends into one namespace.
///
/// Writer selection (`best_writer_name`) is a derived property recomputed on
/// every call, not cached state: there is deliberately no setter, because
/// caching a writer would either hoard one backend or require a rebalancing
/// pass neither this type nor its callers want to own.
#[derive(Debug)]
pub struct CompositeFs {
    name: String,
    members: Vec<Member>,
}

impl CompositeFs {
    /// Builds a composite named `name` over `backends`, all initially open for writes.
    #[must_use]
    pub fn new(name: impl Into<String>, backends: Vec<SharedBackend>) -> Self {
        Self {
            name: name.into(),
            members: backends
                .into_iter()
                .map(|backend| Member { backend, closed: false })
                .collect(),
        }
    }

    /// Excludes `backend_name` from future writer selection. No-op if unknown.
    pub fn close_backend(&mut self, backend_name: &str) -> bool {
        if let Some(member) = self.members.iter_mut().find(|m| m.backend.name() == backend_name) {
            member.closed = true;
            true
        } else {
            false
        }
    }

    fn best_writer_index(&self) -> Option<usize> {
        let mut best: Option<(usize, u64)> = None;
        for (i, member) in self.members.iter().enumerate() {
            if member.closed {
                continue;
            }
            let Ok(free) = member.backend.free_space() else {
                continue;
            };
            if best.is_none_or(|(_, best_free)| free > best_free) {
                best = Some((i, free));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Name of the backend a write would currently land on.
    #[must_use]
    pub fn best_writer_name(&self) -> Option<&str> {
        self.best_writer_index().map(|i| self.members[i].backend.name())
    }

    fn member_for(&self, path: &str) -> Option<&SharedBackend> {
        self.members
            .iter()
            .find(|m| m.backend.isfile(path))
            .map(|m| &m.backend)
    }
}

impl Backend for CompositeFs {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, path: &str) -> bool {
        self.members.iter().any(|m| m.backend.exists(path))
    }

    fn isfile(&self, path: &str) -> bool {
        self.members.iter().any(|m| m.backend.isfile(path))
    }

    fn isdir(&self, path: &str) -> bool {
        self.members.iter().any(|m| m.backend.isdir(path))
    }

    fn listdir(&self, path: &str, opts: &ListDirOptions) -> BackendResult<Vec<String>> {
        if !self.exists(path) {
            return Err(BackendError::NotFound(path.to_string()));
        }
        if !self.isdir(path) {
            return Err(BackendError::InvalidResource(path.to_string()));
        }
        let mut names = Vec::new();
        for member in &self.members {
            if member.backend.isdir(path) {
                names.extend(member.backend.listdir(path, opts)?);
            }
        }
        names.sort_unstable();
        names.dedup();
        Ok(names)
    }

    fn makedir(&self, path: &str, recursive: bool, allow_recreate: bool) -> BackendResult<()> {
        let _ = allow_recreate;
        for member in &self.members {
            member.backend.makedir(path, recursive, true)?;
        }
        Ok(())
    }

    fn removedir(&self, path: &str, recursive: bool, force: bool) -> BackendResult<()> {
        if path.is_empty() || path == "/" {
            return Err(BackendError::InvalidPath("cannot remove the root directory".to_string()));
        }
        let mut touched = false;
        for member in &self.members {
            if member.backend.isdir(path) {
                touched = true;
                member.backend.removedir(path, recursive, force)?;
            }
        }
        if touched {
            Ok(())
        } else {
            Err(BackendError::NotFound(path.to_string()))
        }
    }

    fn remove(&self, path: &str) -> BackendResult<()> {
        if self.isdir(path) {
            return Err(BackendError::InvalidResource(path.to_string()));
        }
        let mut touched = false;
        for member in &self.members {
            if member.backend.isfile(path) {
                touched = true;
                member.backend.remove(path)?;
            }
        }
        if touched {
            Ok(())
        } else {
            Err(BackendError::NotFound(path.to_string()))
        }
    }

    fn rename(&self, src: &str, dst: &str) -> BackendResult<()> {
        let mut touched = false;
        for member in &self.members {
            if member.backend.exists(src) {
                touched = true;
                member.backend.rename(src, dst)?;
            }
        }
        if touched {
            Ok(())
        } else {
            Err(BackendError::NotFound(src.to_string()))
        }
    }

    fn copy(&self, src: &str, dst: &str) -> BackendResult<()> {
        for member in &self.members {
            if member.backend.exists(src) {
                return member.backend.copy(src, dst);
            }
        }
        Err(BackendError::NotFound(src.to_string()))
    }

    fn getsize(&self, path: &str) -> BackendResult<u64> {
        self.member_for(path)
            .ok_or_else(|| BackendError::NotFound(path.to_string()))?
            .getsize(path)
    }

    fn getinfo(&self, path: &str) -> BackendResult<FileInfo> {
        for member in &self.members {
            if member.backend.exists(path) {
                return member.backend.getinfo(path);
            }
        }
        Err(BackendError::NotFound(path.to_string()))
    }

    fn settimes(
        &self,
        path: &str,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> BackendResult<()> {
        let mut touched = false;
        for member in &self.members {
            if member.backend.exists(path) {
                touched = true;
                member.backend.settimes(path, accessed, modified)?;
            }
        }
        if touched {
            Ok(())
        } else {
            Err(BackendError::NotFound(path.to_string()))
        }
    }

    fn free_space(&self) -> BackendResult<u64> {
        let mut total = 0u64;
        let mut any = false;
        for member in &self.members {
            if let Ok(free) = member.backend.free_space() {
                total += free;
                any = true;
            }
        }
        if any {
            Ok(total)
        } else {
            Err(BackendError::NoMeta("free_space"))
        }
    }

    fn open(&self, path: &str, mode: OpenMode) -> BackendResult<Box<dyn BackendStream>> {
        if self.isdir(path) {
            return Err(BackendError::InvalidResource(path.to_string()));
        }
        match mode {
            OpenMode::Read => {
                if let Some(backend) = self.member_for(path) {
                    return backend.open(path, OpenMode::Read);
                }
                let idx = self
                    .best_writer_index()
                    .ok_or_else(|| BackendError::NotFound(path.to_string()))?;
                self.members[idx].backend.open(path, OpenMode::Read)
            }
            OpenMode::Write => {
                for member in &self.members {
                    if member.backend.isfile(path) {
                        member.backend.remove(path)?;
                    }
                }
                let idx = self.best_writer_index().ok_or(BackendError::Capacity {
                    requested: 0,
                    available: 0,
                })?;
                debug!(backend = self.members[idx].backend.name(), path, "selected writer");
                self.members[idx].backend.open(path, OpenMode::Write)
            }
            OpenMode::ReadWrite => {
                if let Some(backend) = self.member_for(path) {
                    return backend.open(path, OpenMode::ReadWrite);
                }
                let idx = self.best_writer_index().ok_or(BackendError::Capacity {
                    requested: 0,
                    available: 0,
                })?;
                debug!(backend = self.members[idx].backend.name(), path, "selected writer");
                self.members[idx].backend.open(path, OpenMode::ReadWrite)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuckoo_backend::{MemoryBackend, SizedBackend};
    use std::io::Write;
    use std::sync::Arc;

    fn two_backends(a_cap: u64, b_cap: u64) -> CompositeFs {
        let a: SharedBackend = Arc::new(SizedBackend::new(MemoryBackend::new("a"), a_cap, 0));
        let b: SharedBackend = Arc::new(SizedBackend::new(MemoryBackend::new("b"), b_cap, 0));
        CompositeFs::new("composite", vec![a, b])
    }

    #[test]
    fn writer_selection_prefers_more_free_space() {
        let composite = two_backends(300, 240);
        assert_eq!(composite.best_writer_name(), Some("a"));
    }

    #[test]
    fn writer_selection_rebalances_after_writes() {
        let composite = two_backends(300, 240);
        composite
            .open("/f1.bin", OpenMode::Write)
            .unwrap()
            .write_all(&vec![0u8; 100])
            .unwrap();
        // a now has 200 free, b still has 240 free.
        assert_eq!(composite.best_writer_name(), Some("b"));
    }

    #[test]
    fn closed_backend_is_excluded() {
        let mut composite = two_backends(300, 240);
        composite.close_backend("a");
        assert_eq!(composite.best_writer_name(), Some("b"));
    }

    #[test]
    fn remove_mirrors_across_backends_holding_the_path() {
        let composite = two_backends(300, 240);
        composite
            .open("/shared.bin", OpenMode::Write)
            .unwrap()
            .write_all(b"x")
            .unwrap();
        composite.remove("/shared.bin").unwrap();
        assert!(!composite.exists("/shared.bin"));
    }

    #[test]
    fn removedir_refuses_root() {
        let composite = two_backends(300, 240);
        let err = composite.removedir("/", false, true).unwrap_err();
        assert!(matches!(err, BackendError::InvalidPath(_)));
    }
}
