//! The parted virtual filesystem: presents `.part{N}` physical files as one logical namespace.

use std::time::SystemTime;

use cuckoo_backend::{
    Backend, BackendError, BackendResult, BackendStream, FilePart, FileInfo, ListDirOptions, OpenMode,
    SharedBackend,
};

use crate::naming::{basename, decode_part, encode_part, join, parent_dir};
use crate::stream::PartedFileStream;

/// Sits above a single backend (which may itself be a fan-out composite) and
/// splits every logical file into parts no larger than `max_part_size`.
#[derive(Debug)]
pub struct PartedFs {
    inner: SharedBackend,
    max_part_size: u64,
}

impl PartedFs {
    /// Wraps `inner`, capping every part at `max_part_size` bytes.
    #[must_use]
    pub fn new(inner: SharedBackend, max_part_size: u64) -> Self {
        Self { inner, max_part_size }
    }

    /// The configured per-part cap.
    #[must_use]
    pub const fn max_part_size(&self) -> u64 {
        self.max_part_size
    }

    /// Physical `(index, path)` pairs for every part of `path`, ascending by index.
    fn listparts(&self, path: &str) -> BackendResult<Vec<(u64, String)>> {
        let dir = parent_dir(path);
        let base = basename(path);
        let opts = ListDirOptions {
            files_only: true,
            wildcard: Some(format!("{base}.part*")),
            ..ListDirOptions::default()
        };
        let names = self.inner.listdir(&dir, &opts)?;
        let mut parts: Vec<(u64, String)> = names
            .into_iter()
            .filter_map(|name| {
                decode_part(&name).and_then(|(decoded_base, idx)| {
                    (decoded_base == base).then(|| (idx, join(&dir, &name)))
                })
            })
            .collect();
        parts.sort_unstable_by_key(|(idx, _)| *idx);
        Ok(parts)
    }

    fn open_existing_parts(&self, parts: &[(u64, String)], mode: OpenMode) -> BackendResult<Vec<FilePart>> {
        parts
            .iter()
            .map(|(_, physical)| {
                let stream = self.inner.open(physical, mode)?;
                FilePart::new(stream, self.max_part_size)
            })
            .collect()
    }
}

impl Backend for PartedFs {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn free_space(&self) -> BackendResult<u64> {
        self.inner.free_space()
    }

    /// `exists(P)` iff a directory P or `P.part0` is present.
    fn exists(&self, path: &str) -> bool {
        self.inner.isdir(path) || self.inner.isfile(&encode_part(path, 0))
    }

    /// Whether `path` is a logical file (`P.part0` present).
    fn isfile(&self, path: &str) -> bool {
        self.inner.isfile(&encode_part(path, 0))
    }

    /// Whether `path` is a plain (unencoded) directory.
    fn isdir(&self, path: &str) -> bool {
        self.inner.isdir(path)
    }

    /// Lists logical entries under `path`: subdirectories as-is, files decoded from `*.part0`.
    fn listdir(&self, path: &str, opts: &ListDirOptions) -> BackendResult<Vec<String>> {
        let mut out = Vec::new();
        if !opts.files_only {
            let dir_opts = ListDirOptions {
                dirs_only: true,
                ..ListDirOptions::default()
            };
            out.extend(self.inner.listdir(path, &dir_opts)?);
        }
        if !opts.dirs_only {
            let file_opts = ListDirOptions {
                files_only: true,
                ..ListDirOptions::default()
            };
            for name in self.inner.listdir(path, &file_opts)? {
                if let Some((base, 0)) = decode_part(&name) {
                    out.push(base.to_string());
                }
            }
        }
        out.retain(|name| opts.matches(name));
        out.sort_unstable();
        out.dedup();
        Ok(out)
    }

    /// Creates a directory; directories are never part-encoded.
    fn makedir(&self, path: &str, recursive: bool, allow_recreate: bool) -> BackendResult<()> {
        self.inner.makedir(path, recursive, allow_recreate)
    }

    /// Removes a directory.
    fn removedir(&self, path: &str, recursive: bool, force: bool) -> BackendResult<()> {
        self.inner.removedir(path, recursive, force)
    }

    /// Removes every part of the logical file at `path`.
    fn remove(&self, path: &str) -> BackendResult<()> {
        if self.inner.isdir(path) {
            return Err(BackendError::InvalidResource(path.to_string()));
        }
        let parts = self.listparts(path)?;
        if parts.is_empty() {
            return Err(BackendError::NotFound(path.to_string()));
        }
        for (_, physical) in parts {
            self.inner.remove(&physical)?;
        }
        Ok(())
    }

    /// Renames every part of `src` to the matching part index of `dst`.
    fn rename(&self, src: &str, dst: &str) -> BackendResult<()> {
        if self.inner.isdir(src) {
            return self.inner.rename(src, dst);
        }
        let parts = self.listparts(src)?;
        if parts.is_empty() {
            return Err(BackendError::NotFound(src.to_string()));
        }
        for (idx, physical) in parts {
            self.inner.rename(&physical, &encode_part(dst, idx))?;
        }
        Ok(())
    }

    /// Copies every part of `src` to the matching part index of `dst`.
    fn copy(&self, src: &str, dst: &str) -> BackendResult<()> {
        if self.inner.isdir(src) {
            return Err(BackendError::InvalidResource(src.to_string()));
        }
        let parts = self.listparts(src)?;
        if parts.is_empty() {
            return Err(BackendError::NotFound(src.to_string()));
        }
        for (idx, physical) in parts {
            self.inner.copy(&physical, &encode_part(dst, idx))?;
        }
        Ok(())
    }

    /// Sum of every part's size.
    fn getsize(&self, path: &str) -> BackendResult<u64> {
        let parts = self.listparts(path)?;
        if parts.is_empty() {
            return Err(BackendError::NotFound(path.to_string()));
        }
        let mut total = 0u64;
        for (_, physical) in parts {
            total += self.inner.getsize(&physical)?;
        }
        Ok(total)
    }

    /// Aggregates size and the latest-known timestamps across all parts.
    fn getinfo(&self, path: &str) -> BackendResult<FileInfo> {
        if self.inner.isdir(path) {
            return self.inner.getinfo(path);
        }
        let parts = self.listparts(path)?;
        if parts.is_empty() {
            return Err(BackendError::NotFound(path.to_string()));
        }
        let mut size = 0u64;
        let mut modified = SystemTime::UNIX_EPOCH;
        let mut accessed = SystemTime::UNIX_EPOCH;
        for (_, physical) in &parts {
            let info = self.inner.getinfo(physical)?;
            size += info.size;
            modified = modified.max(info.modified);
            accessed = accessed.max(info.accessed);
        }
        Ok(FileInfo {
            size,
            created: modified,
            modified,
            accessed,
            is_dir: false,
        })
    }

    /// Applies `accessed`/`modified` to every part.
    fn settimes(
        &self,
        path: &str,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> BackendResult<()> {
        let parts = self.listparts(path)?;
        if parts.is_empty() {
            return Err(BackendError::NotFound(path.to_string()));
        }
        for (_, physical) in parts {
            self.inner.settimes(&physical, accessed, modified)?;
        }
        Ok(())
    }

    /// Opens `path`, assembling a [`PartedFileStream`] from its existing (or newly created) parts.
    fn open(&self, path: &str, mode: OpenMode) -> BackendResult<Box<dyn BackendStream>> {
        if self.inner.isdir(path) {
            return Err(BackendError::InvalidResource(path.to_string()));
        }
        let existing = self.listparts(path)?;
        let file_parts = match mode {
            OpenMode::Read => {
                if existing.is_empty() {
                    return Err(BackendError::NotFound(path.to_string()));
                }
                self.open_existing_parts(&existing, OpenMode::Read)?
            }
            OpenMode::Write => {
                for (_, physical) in &existing {
                    self.inner.remove(physical)?;
                }
                let first = encode_part(path, 0);
                let stream = self.inner.open(&first, OpenMode::Write)?;
                vec![FilePart::new(stream, self.max_part_size)?]
            }
            OpenMode::ReadWrite => {
                if existing.is_empty() {
                    let first = encode_part(path, 0);
                    let stream = self.inner.open(&first, OpenMode::ReadWrite)?;
                    vec![FilePart::new(stream, self.max_part_size)?]
                } else {
                    self.open_existing_parts(&existing, OpenMode::ReadWrite)?
                }
            }
        };
        Ok(Box::new(PartedFileStream::new(
            self.inner.clone(),
            path,
            self.max_part_size,
            file_parts,
            mode,
        )))
    }
}
