//! A [`Backend`] rooted at a real directory on disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::SystemTime;

use filetime::FileTime;

use crate::backend::{Backend, BackendStream};
use crate::error::{BackendError, BackendResult};
use crate::types::{FileInfo, ListDirOptions, OpenMode};

/// Maps CuckooDrive's POSIX-style logical paths onto `std::fs` calls under one base directory.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    name: String,
    base: PathBuf,
}

impl LocalBackend {
    /// Opens a backend rooted at `base`, creating the directory if it does not exist.
    pub fn new(name: impl Into<String>, base: impl Into<PathBuf>) -> BackendResult<Self> {
        let base = base.into();
        fs::create_dir_all(&base).map_err(BackendError::from)?;
        Ok(Self {
            name: name.into(),
            base,
        })
    }

    fn physical(&self, logical: &str) -> PathBuf {
        self.base.join(logical.trim_start_matches('/'))
    }
}

fn not_found_or(err: io::Error, path: &str) -> BackendError {
    if err.kind() == io::ErrorKind::NotFound {
        BackendError::NotFound(path.to_string())
    } else {
        BackendError::from(err)
    }
}

fn system_time_or_epoch(result: io::Result<SystemTime>) -> SystemTime {
    result.unwrap_or(SystemTime::UNIX_EPOCH)
}

impl Backend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn exists(&self, path: &str) -> bool {
        self.physical(path).exists()
    }

    fn isfile(&self, path: &str) -> bool {
        self.physical(path).is_file()
    }

    fn isdir(&self, path: &str) -> bool {
        self.physical(path).is_dir()
    }

    fn listdir(&self, path: &str, opts: &ListDirOptions) -> BackendResult<Vec<String>> {
        let dir = self.physical(path);
        let entries = fs::read_dir(&dir).map_err(|e| not_found_or(e, path))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(BackendError::from)?;
            let file_type = entry.file_type().map_err(BackendError::from)?;
            if opts.dirs_only && !file_type.is_dir() {
                continue;
            }
            if opts.files_only && !file_type.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if opts.matches(&name) {
                names.push(name);
            }
        }
        names.sort_unstable();
        Ok(names)
    }

    fn makedir(&self, path: &str, recursive: bool, allow_recreate: bool) -> BackendResult<()> {
        let dir = self.physical(path);
        if dir.exists() {
            return if allow_recreate {
                Ok(())
            } else {
                Err(BackendError::InvalidPath(format!("{path} already exists")))
            };
        }
        if recursive {
            fs::create_dir_all(&dir).map_err(BackendError::from)
        } else {
            fs::create_dir(&dir).map_err(BackendError::from)
        }
    }

    fn removedir(&self, path: &str, recursive: bool, force: bool) -> BackendResult<()> {
        let dir = self.physical(path);
        if !dir.exists() {
            return Err(BackendError::NotFound(path.to_string()));
        }
        let is_empty = fs::read_dir(&dir)
            .map_err(BackendError::from)?
            .next()
            .is_none();
        if is_empty {
            fs::remove_dir(&dir).map_err(BackendError::from)
        } else if recursive || force {
            fs::remove_dir_all(&dir).map_err(BackendError::from)
        } else {
            Err(BackendError::InvalidResource(format!("{path} is not empty")))
        }
    }

    fn remove(&self, path: &str) -> BackendResult<()> {
        fs::remove_file(self.physical(path)).map_err(|e| not_found_or(e, path))
    }

    fn rename(&self, src: &str, dst: &str) -> BackendResult<()> {
        if let Some(parent) = self.physical(dst).parent() {
            fs::create_dir_all(parent).map_err(BackendError::from)?;
        }
        fs::rename(self.physical(src), self.physical(dst)).map_err(|e| not_found_or(e, src))
    }

    fn copy(&self, src: &str, dst: &str) -> BackendResult<()> {
        if let Some(parent) = self.physical(dst).parent() {
            fs::create_dir_all(parent).map_err(BackendError::from)?;
        }
        fs::copy(self.physical(src), self.physical(dst))
            .map(|_| ())
            .map_err(|e| not_found_or(e, src))
    }

    fn getsize(&self, path: &str) -> BackendResult<u64> {
        fs::metadata(self.physical(path))
            .map(|m| m.len())
            .map_err(|e| not_found_or(e, path))
    }

    fn getinfo(&self, path: &str) -> BackendResult<FileInfo> {
        let meta = fs::metadata(self.physical(path)).map_err(|e| not_found_or(e, path))?;
        Ok(FileInfo {
            size: meta.len(),
            created: system_time_or_epoch(meta.created()),
            modified: system_time_or_epoch(meta.modified()),
            accessed: system_time_or_epoch(meta.accessed()),
            is_dir: meta.is_dir(),
        })
    }

    fn settimes(
        &self,
        path: &str,
        accessed: Option<SystemTime>,
        modified: Option<SystemTime>,
    ) -> BackendResult<()> {
        let physical = self.physical(path);
        let meta = fs::metadata(&physical).map_err(|e| not_found_or(e, path))?;
        let accessed = accessed.unwrap_or_else(|| system_time_or_epoch(meta.accessed()));
        let modified = modified.unwrap_or_else(|| system_time_or_epoch(meta.modified()));
        filetime::set_file_times(
            &physical,
            FileTime::from_system_time(accessed),
            FileTime::from_system_time(modified),
        )
        .map_err(BackendError::from)
    }

    fn free_space(&self) -> BackendResult<u64> {
        Err(BackendError::NoMeta("free_space"))
    }

    fn open(&self, path: &str, mode: OpenMode) -> BackendResult<Box<dyn BackendStream>> {
        let physical = self.physical(path);
        if mode.is_writable() {
            if let Some(parent) = physical.parent() {
                fs::create_dir_all(parent).map_err(BackendError::from)?;
            }
        }
        let mut options = OpenOptions::new();
        options.read(mode.is_readable()).write(mode.is_writable());
        if mode.truncates() {
            options.create(true).truncate(true);
        } else if mode.is_writable() {
            options.create(true);
        }
        let file = options.open(&physical).map_err(|e| not_found_or(e, path))?;
        Ok(Box::new(LocalStream {
            file: Some(file),
        }))
    }
}

#[derive(Debug)]
struct LocalStream {
    file: Option<File>,
}

impl LocalStream {
    fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| BackendError::Closed.into_io())
    }
}

impl Read for LocalStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file_mut()?.read(buf)
    }
}

impl Write for LocalStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file_mut()?.flush()
    }
}

impl Seek for LocalStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file_mut()?.seek(pos)
    }
}

impl BackendStream for LocalStream {
    fn size(&self) -> BackendResult<u64> {
        let file = self
            .file
            .as_ref()
            .ok_or(BackendError::Closed)?;
        Ok(file.metadata().map_err(BackendError::from)?.len())
    }

    fn close(&mut self) -> BackendResult<()> {
        if let Some(mut file) = self.file.take() {
            file.flush().map_err(BackendError::from)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path()).unwrap();
        let mut w = backend.open("/a.bin", OpenMode::Write).unwrap();
        w.write_all(b"payload").unwrap();
        w.close().unwrap();

        let mut r = backend.open("/a.bin", OpenMode::Read).unwrap();
        let mut got = Vec::new();
        r.read_to_end(&mut got).unwrap();
        assert_eq!(got, b"payload");
    }

    #[test]
    fn open_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path()).unwrap();
        backend
            .open("/nested/dir/file.bin", OpenMode::Write)
            .unwrap()
            .close()
            .unwrap();
        assert!(backend.isfile("/nested/dir/file.bin"));
        assert!(backend.isdir("/nested/dir"));
    }

    #[test]
    fn remove_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path()).unwrap();
        let err = backend.remove("/missing.bin").unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[test]
    fn getsize_matches_written_length() {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new("local", dir.path()).unwrap();
        backend
            .open("/a.bin", OpenMode::Write)
            .unwrap()
            .write_all(b"0123456789")
            .unwrap();
        assert_eq!(backend.getsize("/a.bin").unwrap(), 10);
    }
}
