//! Wraps any [`Backend`] with a hard capacity ceiling.

use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::backend::{Backend, BackendStream};
use crate::error::{BackendError, BackendResult};
use crate::types::{FileInfo, ListDirOptions, OpenMode};

/// Enforces `max_size` bytes of total content across everything the wrapped
/// backend holds. `cur_size` is tracked incrementally from observed writes
/// and removals rather than recomputed by walking the backend on every call.
#[derive(Debug)]
pub struct SizedBackend<B> {
    inner: B,
    max_size: u64,
    cur_size: Arc<AtomicU64>,
}

impl<B: Backend> SizedBackend<B> {
    /// Wraps `inner`, seeding `cur_size` from `initial_size` (zero for a fresh backend).
    pub fn new(inner: B, max_size: u64, initial_size: u64) -> Self {
        Self {
            inner,
            max_size,
            cur_size: Arc::new(AtomicU64::new(initial_size)),
        }
    }

    /// The configured ceiling.
    #[must_use]
    pub const fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Bytes currently accounted for against the ceiling.
    #[must_use]
    pub fn cur_size(&self) -> u64 {
        self.cur_size.load(Ordering::SeqCst)
    }

    /// `max_size - cur_size`, saturating at zero.
    #[must_use]
    pub fn free_space_bytes(&self) -> u64 {
        self.max_size.saturating_sub(self.cur_size())
    }
}

impl<B: Backend> Backend for SizedBackend<B> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn exists(&self, path: &str) -> bool {
        self.inner.exists(path)
    }

    fn isfile(&self, path: &str) -> bool {
        self.inner.isfile(path)
    }

    fn isdir(&self, path: &str) -> bool {
        self.inner.isdir(path)
    }

    fn listdir(&self, path: &str, opts: &ListDirOptions) -> BackendResult<Vec<String>> {
        self.inner.listdir(path, opts)
    }

    fn makedir(&self, path: &str, recursive: bool, allow_recreate: bool) -> BackendResult<()> {
        self.inner.makedir(path, recursive, allow_recreate)
    }

    fn removedir(&self, path: &str, recursive: bool, force: bool) -> BackendResult<()> {
        self.inner.removedir(path, recursive, force)
    }

    fn remove(&self, path: &str) -> BackendResult<()> {
        let freed = self.inner.getsize(path).unwrap_or(0);
        self.inner.remove(path)?;
        self.cur_size.fetch_sub(freed.min(self.cur_size()), Ordering::SeqCst);
        Ok(())
    }

    fn rename(&self, src: &str, dst: &str) -> BackendResult<()> {
        self.inner.rename(src, dst)
    }

    fn copy(&self, src: &str, dst: &str) -> BackendResult<()> {
        let before = self.inner.getsize(dst).unwrap_or(0);
        self.inner.copy(src, dst)?;
        let after = self.inner.getsize(dst).unwrap_or(before);
        self.cur_size.fetch_add(after.saturating_sub(before), Ordering::SeqCst);
        Ok(())
    }

    fn getsize(&self, path: &str) -> BackendResult<u64> {
        self.inner.getsize(path)
    }

    fn getinfo(&self, path: &str) -> BackendResult<FileInfo> {
        self.inner.getinfo(path)
    }

    fn settimes(
        &self,
        path: &str,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> BackendResult<()> {
        self.inner.settimes(path, accessed, modified)
    }

    fn free_space(&self) -> BackendResult<u64> {
        Ok(self.free_space_bytes())
    }

    fn open(&self, path: &str, mode: OpenMode) -> BackendResult<Box<dyn BackendStream>> {
        let existing = self.inner.getsize(path).unwrap_or(0);
        let stream = self.inner.open(path, mode)?;
        if mode.truncates() {
            self.cur_size.fetch_sub(existing.min(self.cur_size()), Ordering::SeqCst);
        }
        Ok(Box::new(SizedStream {
            inner: stream,
            max_size: self.max_size,
            cur_size: Arc::clone(&self.cur_size),
            writable: mode.is_writable(),
        }))
    }
}

#[derive(Debug)]
struct SizedStream {
    inner: Box<dyn BackendStream>,
    max_size: u64,
    cur_size: Arc<AtomicU64>,
    writable: bool,
}

impl Read for SizedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for SizedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.writable || buf.is_empty() {
            return self.inner.write(buf);
        }
        let cur = self.cur_size.load(Ordering::SeqCst);
        let available = self.max_size.saturating_sub(cur);
        if available == 0 {
            return Err(BackendError::Capacity {
                requested: buf.len() as u64,
                available: 0,
            }
            .into_io());
        }
        let to_write = buf.len().min(available as usize);
        let n = self.inner.write(&buf[..to_write])?;
        self.cur_size.fetch_add(n as u64, Ordering::SeqCst);
        if n < buf.len() {
            return Err(BackendError::Capacity {
                requested: buf.len() as u64,
                available,
            }
            .into_io());
        }
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl Seek for SizedStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}

impl BackendStream for SizedStream {
    fn size(&self) -> BackendResult<u64> {
        self.inner.size()
    }

    fn close(&mut self) -> BackendResult<()> {
        self.inner.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;

    #[test]
    fn free_space_reflects_writes() {
        let sized = SizedBackend::new(MemoryBackend::new("mem"), 10, 0);
        assert_eq!(sized.free_space().unwrap(), 10);
        let mut w = sized.open("/a.bin", OpenMode::Write).unwrap();
        w.write_all(b"abcde").unwrap();
        w.close().unwrap();
        assert_eq!(sized.free_space().unwrap(), 5);
    }

    #[test]
    fn write_past_ceiling_fails_with_capacity() {
        let sized = SizedBackend::new(MemoryBackend::new("mem"), 4, 0);
        let mut w = sized.open("/a.bin", OpenMode::Write).unwrap();
        let err = w.write_all(b"abcde").unwrap_err();
        let backend_err: BackendError = err.into();
        assert!(matches!(backend_err, BackendError::Capacity { .. }));
    }

    #[test]
    fn remove_frees_accounted_space() {
        let sized = SizedBackend::new(MemoryBackend::new("mem"), 10, 0);
        sized
            .open("/a.bin", OpenMode::Write)
            .unwrap()
            .write_all(b"abcde")
            .unwrap();
        assert_eq!(sized.free_space().unwrap(), 5);
        sized.remove("/a.bin").unwrap();
        assert_eq!(sized.free_space().unwrap(), 10);
    }
}
