//! An in-process backend used by the unit test suites of the crates above this one.

use std::collections::{HashMap, HashSet};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use crate::backend::{Backend, BackendStream};
use crate::error::{BackendError, BackendResult};
use crate::types::{FileInfo, ListDirOptions, OpenMode};

#[derive(Debug, Default)]
struct Inner {
    files: HashMap<String, Vec<u8>>,
    dirs: HashSet<String>,
    times: HashMap<String, (SystemTime, SystemTime, SystemTime)>,
}

/// A `HashMap`-backed [`Backend`], so that tests for the layers above don't
/// depend on real disk I/O or timing-sensitive OS behavior.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    name: String,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryBackend {
    /// Creates an empty backend named `name` with the root directory present.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let mut dirs = HashSet::new();
        dirs.insert("/".to_string());
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(Inner {
                files: HashMap::new(),
                dirs,
                times: HashMap::new(),
            })),
        }
    }
}

fn lock(inner: &Mutex<Inner>) -> std::sync::MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn parent_of(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(idx) => &path[..idx],
        None => "/",
    }
}

fn basename(path: &str) -> &str {
    path.rfind('/').map_or(path, |idx| &path[idx + 1..])
}

fn ensure_parent_dirs(inner: &mut Inner, path: &str) {
    let parent = parent_of(path);
    inner.dirs.insert("/".to_string());
    if parent == "/" {
        return;
    }
    let mut cur = String::new();
    for seg in parent.trim_start_matches('/').split('/') {
        cur.push('/');
        cur.push_str(seg);
        inner.dirs.insert(cur.clone());
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, path: &str) -> bool {
        let p = normalize(path);
        let g = lock(&self.inner);
        g.files.contains_key(&p) || g.dirs.contains(&p)
    }

    fn isfile(&self, path: &str) -> bool {
        lock(&self.inner).files.contains_key(&normalize(path))
    }

    fn isdir(&self, path: &str) -> bool {
        lock(&self.inner).dirs.contains(&normalize(path))
    }

    fn listdir(&self, path: &str, opts: &ListDirOptions) -> BackendResult<Vec<String>> {
        let p = normalize(path);
        let g = lock(&self.inner);
        if !g.dirs.contains(&p) {
            return Err(BackendError::NotFound(p));
        }
        let mut names = Vec::new();
        if !opts.dirs_only {
            for f in g.files.keys() {
                if parent_of(f) == p {
                    let name = basename(f);
                    if opts.matches(name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        if !opts.files_only {
            for d in &g.dirs {
                if d != "/" && parent_of(d) == p {
                    let name = basename(d);
                    if opts.matches(name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort_unstable();
        names.dedup();
        Ok(names)
    }

    fn makedir(&self, path: &str, recursive: bool, allow_recreate: bool) -> BackendResult<()> {
        let p = normalize(path);
        let mut g = lock(&self.inner);
        if g.dirs.contains(&p) {
            return if allow_recreate {
                Ok(())
            } else {
                Err(BackendError::InvalidPath(format!("{p} already exists")))
            };
        }
        if recursive {
            let mut cur = String::new();
            for seg in p.trim_start_matches('/').split('/') {
                cur.push('/');
                cur.push_str(seg);
                g.dirs.insert(cur.clone());
            }
        } else {
            let parent = parent_of(&p).to_string();
            if parent != "/" && !g.dirs.contains(&parent) {
                return Err(BackendError::NotFound(parent));
            }
            g.dirs.insert(p);
        }
        Ok(())
    }

    fn removedir(&self, path: &str, recursive: bool, force: bool) -> BackendResult<()> {
        let p = normalize(path);
        let mut g = lock(&self.inner);
        if !g.dirs.contains(&p) {
            return Err(BackendError::NotFound(p));
        }
        let prefix = format!("{p}/");
        let has_children =
            g.files.keys().any(|f| f.starts_with(&prefix)) || g.dirs.iter().any(|d| *d != p && d.starts_with(&prefix));
        if has_children {
            if !force && !recursive {
                return Err(BackendError::InvalidResource(format!("{p} is not empty")));
            }
            g.files.retain(|f, _| !f.starts_with(&prefix));
            g.dirs.retain(|d| !d.starts_with(&prefix));
        }
        g.dirs.remove(&p);
        Ok(())
    }

    fn remove(&self, path: &str) -> BackendResult<()> {
        let p = normalize(path);
        let mut g = lock(&self.inner);
        if g.files.remove(&p).is_none() {
            return Err(BackendError::NotFound(p));
        }
        g.times.remove(&p);
        Ok(())
    }

    fn rename(&self, src: &str, dst: &str) -> BackendResult<()> {
        let s = normalize(src);
        let d = normalize(dst);
        let mut g = lock(&self.inner);
        if let Some(data) = g.files.remove(&s) {
            let t = g.times.remove(&s);
            ensure_parent_dirs(&mut g, &d);
            g.files.insert(d.clone(), data);
            if let Some(t) = t {
                g.times.insert(d, t);
            }
            Ok(())
        } else if g.dirs.remove(&s) {
            g.dirs.insert(d);
            Ok(())
        } else {
            Err(BackendError::NotFound(s))
        }
    }

    fn copy(&self, src: &str, dst: &str) -> BackendResult<()> {
        let s = normalize(src);
        let d = normalize(dst);
        let mut g = lock(&self.inner);
        let data = g
            .files
            .get(&s)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(s.clone()))?;
        ensure_parent_dirs(&mut g, &d);
        g.files.insert(d, data);
        Ok(())
    }

    fn getsize(&self, path: &str) -> BackendResult<u64> {
        let p = normalize(path);
        let g = lock(&self.inner);
        g.files
            .get(&p)
            .map(|v| v.len() as u64)
            .ok_or(BackendError::NotFound(p))
    }

    fn getinfo(&self, path: &str) -> BackendResult<FileInfo> {
        let p = normalize(path);
        let g = lock(&self.inner);
        if let Some(data) = g.files.get(&p) {
            let (created, modified, accessed) = g
                .times
                .get(&p)
                .copied()
                .unwrap_or_else(|| (SystemTime::now(), SystemTime::now(), SystemTime::now()));
            Ok(FileInfo {
                size: data.len() as u64,
                created,
                modified,
                accessed,
                is_dir: false,
            })
        } else if g.dirs.contains(&p) {
            Ok(FileInfo {
                size: 0,
                created: SystemTime::UNIX_EPOCH,
                modified: SystemTime::UNIX_EPOCH,
                accessed: SystemTime::UNIX_EPOCH,
                is_dir: true,
            })
        } else {
            Err(BackendError::NotFound(p))
        }
    }

    fn settimes(
        &self,
        path: &str,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> BackendResult<()> {
        let p = normalize(path);
        let mut g = lock(&self.inner);
        if !g.files.contains_key(&p) && !g.dirs.contains(&p) {
            return Err(BackendError::NotFound(p));
        }
        let now = SystemTime::now();
        let entry = g.times.entry(p).or_insert((now, now, now));
        if let Some(a) = accessed {
            entry.2 = a;
        }
        if let Some(m) = modified {
            entry.1 = m;
        }
        Ok(())
    }

    fn free_space(&self) -> BackendResult<u64> {
        Err(BackendError::NoMeta("free_space"))
    }

    fn open(&self, path: &str, mode: OpenMode) -> BackendResult<Box<dyn BackendStream>> {
        let p = normalize(path);
        let mut g = lock(&self.inner);
        if g.dirs.contains(&p) {
            return Err(BackendError::InvalidResource(p));
        }
        let stream = match mode {
            OpenMode::Read => {
                let data = g
                    .files
                    .get(&p)
                    .cloned()
                    .ok_or_else(|| BackendError::NotFound(p.clone()))?;
                MemoryStream {
                    inner: Arc::clone(&self.inner),
                    path: p,
                    buf: Cursor::new(data),
                    writable: false,
                    closed: false,
                }
            }
            OpenMode::Write => {
                ensure_parent_dirs(&mut g, &p);
                g.files.insert(p.clone(), Vec::new());
                let now = SystemTime::now();
                g.times.insert(p.clone(), (now, now, now));
                MemoryStream {
                    inner: Arc::clone(&self.inner),
                    path: p,
                    buf: Cursor::new(Vec::new()),
                    writable: true,
                    closed: false,
                }
            }
            OpenMode::ReadWrite => {
                let data = g.files.get(&p).cloned().unwrap_or_default();
                if !g.files.contains_key(&p) {
                    ensure_parent_dirs(&mut g, &p);
                    g.files.insert(p.clone(), Vec::new());
                }
                MemoryStream {
                    inner: Arc::clone(&self.inner),
                    path: p,
                    buf: Cursor::new(data),
                    writable: true,
                    closed: false,
                }
            }
        };
        Ok(Box::new(stream))
    }
}

#[derive(Debug)]
struct MemoryStream {
    inner: Arc<Mutex<Inner>>,
    path: String,
    buf: Cursor<Vec<u8>>,
    writable: bool,
    closed: bool,
}

impl MemoryStream {
    fn persist(&mut self) -> io::Result<()> {
        if !self.writable {
            return Ok(());
        }
        let mut g = lock(&self.inner);
        g.files.insert(self.path.clone(), self.buf.get_ref().clone());
        let now = SystemTime::now();
        let entry = g.times.entry(self.path.clone()).or_insert((now, now, now));
        entry.1 = now;
        entry.2 = now;
        Ok(())
    }
}

impl Read for MemoryStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.buf.read(out)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if !self.writable {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "stream opened read-only"));
        }
        self.buf.write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.persist()
    }
}

impl Seek for MemoryStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.buf.seek(pos)
    }
}

impl BackendStream for MemoryStream {
    fn size(&self) -> BackendResult<u64> {
        Ok(self.buf.get_ref().len() as u64)
    }

    fn close(&mut self) -> BackendResult<()> {
        if self.closed {
            return Ok(());
        }
        self.persist().map_err(BackendError::from)?;
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let backend = MemoryBackend::new("mem");
        let mut w = backend.open("/a.txt", OpenMode::Write).unwrap();
        w.write_all(b"hello world").unwrap();
        w.close().unwrap();

        let mut r = backend.open("/a.txt", OpenMode::Read).unwrap();
        let mut got = Vec::new();
        r.read_to_end(&mut got).unwrap();
        assert_eq!(got, b"hello world");
    }

    #[test]
    fn open_for_write_creates_parent_dirs() {
        let backend = MemoryBackend::new("mem");
        let mut w = backend.open("/a/b/c.txt", OpenMode::Write).unwrap();
        w.write_all(b"x").unwrap();
        w.close().unwrap();
        assert!(backend.isdir("/a"));
        assert!(backend.isdir("/a/b"));
        assert!(backend.isfile("/a/b/c.txt"));
    }

    #[test]
    fn listdir_rejects_missing_directory() {
        let backend = MemoryBackend::new("mem");
        let err = backend.listdir("/nope", &ListDirOptions::default()).unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[test]
    fn remove_then_exists_is_false() {
        let backend = MemoryBackend::new("mem");
        backend.open("/a.txt", OpenMode::Write).unwrap().close().unwrap();
        backend.remove("/a.txt").unwrap();
        assert!(!backend.exists("/a.txt"));
    }

    #[test]
    fn removedir_refuses_nonempty_without_force() {
        let backend = MemoryBackend::new("mem");
        backend.open("/a/b.txt", OpenMode::Write).unwrap().close().unwrap();
        let err = backend.removedir("/a", false, false).unwrap_err();
        assert!(matches!(err, BackendError::InvalidResource(_)));
    }

    #[test]
    fn rename_moves_file() {
        let backend = MemoryBackend::new("mem");
        backend.open("/a.txt", OpenMode::Write).unwrap().close().unwrap();
        backend.rename("/a.txt", "/b.txt").unwrap();
        assert!(!backend.exists("/a.txt"));
        assert!(backend.exists("/b.txt"));
    }

    #[test]
    fn memory_backend_reports_no_free_space_meta() {
        let backend = MemoryBackend::new("mem");
        assert!(matches!(backend.free_space(), Err(BackendError::NoMeta(_))));
    }
}
