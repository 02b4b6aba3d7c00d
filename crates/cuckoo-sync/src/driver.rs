//! Two-pass (directories, then files) tree synchronization.

use std::io;

use cuckoo_backend::{Backend, BackendError, BackendResult, ListDirOptions, OpenMode};
use tracing::{info, warn};

/// What happened to one path during a sync run.
///
/// Only source-driven outcomes: the walk never enumerates the destination,
/// so it has no way to notice a destination-only file to delete or a rename
/// to detect (see `DESIGN.md`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SyncAction {
    /// Did not exist on the destination; copied in full.
    Copied,
    /// Existed with a different size; re-copied.
    Updated,
    /// Matched already; nothing to do.
    Skipped,
    /// Destination was modified more recently than the source; left untouched.
    Conflict,
}

/// One reported outcome from a sync run, in the order it was observed.
#[derive(Clone, Debug)]
pub struct SyncEvent {
    /// Logical path the action applied to.
    pub path: String,
    /// What the driver did (or decided not to do).
    pub action: SyncAction,
}

/// Walks `source` and reconciles `dest` against it.
///
/// The driver only ever calls the public [`Backend`] contract on both sides:
/// it has no special knowledge of whether `dest` is a plain backend, a
/// parted filesystem, or a fan-out composite. Directories are synced first
/// (so every file's parent exists before the file pass creates it), then
/// files.
pub struct SyncDriver<'a> {
    source: &'a dyn Backend,
    dest: &'a dyn Backend,
}

impl<'a> SyncDriver<'a> {
    /// Builds a driver that pushes `source` onto `dest`.
    #[must_use]
    pub fn new(source: &'a dyn Backend, dest: &'a dyn Backend) -> Self {
        Self { source, dest }
    }

    /// Runs both passes from the root and returns every action taken, in order.
    pub fn run(&self) -> BackendResult<Vec<SyncEvent>> {
        let mut events = Vec::new();
        self.sync_dirs("/", &mut events)?;
        self.sync_files("/", &mut events)?;
        Ok(events)
    }

    fn sync_dirs(&self, dir: &str, events: &mut Vec<SyncEvent>) -> BackendResult<()> {
        let opts = ListDirOptions {
            dirs_only: true,
            ..ListDirOptions::default()
        };
        for name in self.source.listdir(dir, &opts)? {
            let path = join(dir, &name);
            if !self.dest.isdir(&path) {
                self.dest.makedir(&path, true, true)?;
                info!(path = %path, "directory created");
                events.push(SyncEvent {
                    path: path.clone(),
                    action: SyncAction::Copied,
                });
            }
            self.sync_dirs(&path, events)?;
        }
        Ok(())
    }

    fn sync_files(&self, dir: &str, events: &mut Vec<SyncEvent>) -> BackendResult<()> {
        let file_opts = ListDirOptions {
            files_only: true,
            ..ListDirOptions::default()
        };
        for name in self.source.listdir(dir, &file_opts)? {
            let path = join(dir, &name);
            events.push(self.sync_one_file(&path)?);
        }
        let dir_opts = ListDirOptions {
            dirs_only: true,
            ..ListDirOptions::default()
        };
        for name in self.source.listdir(dir, &dir_opts)? {
            self.sync_files(&join(dir, &name), events)?;
        }
        Ok(())
    }

    fn sync_one_file(&self, path: &str) -> BackendResult<SyncEvent> {
        if !self.dest.exists(path) {
            copy_file(self.source, self.dest, path)?;
            info!(path, "file copied");
            return Ok(SyncEvent {
                path: path.to_string(),
                action: SyncAction::Copied,
            });
        }

        let src_size = self.source.getsize(path)?;
        let dst_size = self.dest.getsize(path)?;
        if src_size == dst_size {
            return Ok(SyncEvent {
                path: path.to_string(),
                action: SyncAction::Skipped,
            });
        }

        if self.has_conflict(path)? {
            warn!(path, "destination modified more recently than source, skipping");
            return Ok(SyncEvent {
                path: path.to_string(),
                action: SyncAction::Conflict,
            });
        }

        copy_file(self.source, self.dest, path)?;
        info!(path, "file updated");
        Ok(SyncEvent {
            path: path.to_string(),
            action: SyncAction::Updated,
        })
    }

    fn has_conflict(&self, path: &str) -> BackendResult<bool> {
        let src_info = self.source.getinfo(path)?;
        let dst_info = self.dest.getinfo(path)?;
        Ok(dst_info.modified > src_info.modified)
    }
}

fn copy_file(source: &dyn Backend, dest: &dyn Backend, path: &str) -> BackendResult<()> {
    let mut reader = source.open(path, OpenMode::Read)?;
    let mut writer = dest.open(path, OpenMode::Write)?;
    io::copy(&mut reader, &mut writer).map_err(BackendError::from)?;
    writer.close()?;
    reader.close()?;
    Ok(())
}

fn join(dir: &str, name: &str) -> String {
    if dir == "/" {
        format!("/{name}")
    } else {
        format!("{dir}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuckoo_backend::MemoryBackend;
    use std::io::Write;

    fn write_file(backend: &MemoryBackend, path: &str, content: &[u8]) {
        let mut s = backend.open(path, OpenMode::Write).unwrap();
        s.write_all(content).unwrap();
        s.close().unwrap();
    }

    #[test]
    fn copies_new_files_and_directories() {
        let source = MemoryBackend::new("source");
        write_file(&source, "/a.txt", b"hello");
        write_file(&source, "/dir/b.txt", b"world");
        let dest = MemoryBackend::new("dest");

        let events = SyncDriver::new(&source, &dest).run().unwrap();
        assert!(dest.isfile("/a.txt"));
        assert!(dest.isfile("/dir/b.txt"));
        assert!(dest.isdir("/dir"));
        assert_eq!(events.iter().filter(|e| e.action == SyncAction::Copied).count(), 3);
    }

    #[test]
    fn skips_files_with_matching_size() {
        let source = MemoryBackend::new("source");
        write_file(&source, "/a.txt", b"hello");
        let dest = MemoryBackend::new("dest");
        write_file(&dest, "/a.txt", b"world");

        let events = SyncDriver::new(&source, &dest).run().unwrap();
        assert_eq!(events[0].action, SyncAction::Skipped);
    }

    #[test]
    fn conflict_when_destination_modified_more_recently() {
        use std::time::{Duration, SystemTime};

        let source = MemoryBackend::new("source");
        write_file(&source, "/a.txt", b"hello world");
        source
            .settimes("/a.txt", None, Some(SystemTime::UNIX_EPOCH))
            .unwrap();

        let dest = MemoryBackend::new("dest");
        write_file(&dest, "/a.txt", b"hi");
        dest.settimes(
            "/a.txt",
            None,
            Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1)),
        )
        .unwrap();

        let events = SyncDriver::new(&source, &dest).run().unwrap();
        assert_eq!(events[0].action, SyncAction::Conflict);
        assert_eq!(dest.getsize("/a.txt").unwrap(), 2);
    }

    #[test]
    fn updates_files_with_different_size() {
        let source = MemoryBackend::new("source");
        write_file(&source, "/a.txt", b"hello world");
        let dest = MemoryBackend::new("dest");
        write_file(&dest, "/a.txt", b"hi");

        let events = SyncDriver::new(&source, &dest).run().unwrap();
        assert_eq!(events[0].action, SyncAction::Updated);
        assert_eq!(dest.getsize("/a.txt").unwrap(), 11);
    }
}
