//! A lockfile-based mutual-exclusion primitive over a single backend.

use std::time::{Duration, Instant};

use cuckoo_backend::{BackendError, BackendResult, OpenMode, SharedBackend};
use tracing::{debug, info};

/// Default lockfile name, matching the original tool's convention.
pub const DEFAULT_FILENAME: &str = ".lock";
/// Default time budget for [`FileLock::acquire`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default poll interval between acquisition attempts.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(500);

/// Advisory lock backed by a marker file on `backend`.
///
/// Acquisition is a create-if-absent poll loop, not an atomic filesystem
/// primitive: this protects cooperating callers sharing the same backend
/// contract, not adversarial writers racing the same physical path.
#[derive(Debug, Clone)]
pub struct FileLock {
    backend: SharedBackend,
    filename: String,
    timeout: Duration,
    delay: Duration,
}

impl FileLock {
    /// Builds a lock over `backend` using the default filename, timeout and delay.
    #[must_use]
    pub fn new(backend: SharedBackend) -> Self {
        Self {
            backend,
            filename: DEFAULT_FILENAME.to_string(),
            timeout: DEFAULT_TIMEOUT,
            delay: DEFAULT_DELAY,
        }
    }

    /// Overrides the lockfile name.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = filename.into();
        self
    }

    /// Overrides how long [`Self::acquire`] will retry before giving up.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Overrides the poll interval between acquisition attempts.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Blocks until the lockfile can be created or `timeout` elapses.
    pub fn acquire(&self) -> BackendResult<LockGuard<'_>> {
        let start = Instant::now();
        loop {
            if !self.backend.exists(&self.filename) {
                self.backend.open(&self.filename, OpenMode::Write)?.close()?;
                info!(filename = %self.filename, "lock acquired");
                return Ok(LockGuard { lock: self, held: true });
            }
            if start.elapsed() >= self.timeout {
                return Err(BackendError::LockTimeout {
                    filename: self.filename.clone(),
                    elapsed: start.elapsed(),
                });
            }
            std::thread::sleep(self.delay);
        }
    }

    fn release(&self) -> BackendResult<()> {
        if self.backend.exists(&self.filename) {
            self.backend.remove(&self.filename)?;
        }
        debug!(filename = %self.filename, "lock released");
        Ok(())
    }
}

/// Holder token returned by [`FileLock::acquire`]. Releases on drop; call
/// [`Self::release`] directly to observe a release failure instead of
/// swallowing it.
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a FileLock,
    held: bool,
}

impl LockGuard<'_> {
    /// Releases the lock now, surfacing any backend error.
    pub fn release(mut self) -> BackendResult<()> {
        self.held = false;
        self.lock.release()
    }
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        if self.held {
            let _ = self.lock.release();
            self.held = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cuckoo_backend::MemoryBackend;
    use std::sync::Arc;

    fn backend() -> SharedBackend {
        Arc::new(MemoryBackend::new("mem"))
    }

    #[test]
    fn acquire_creates_lockfile() {
        let backend = backend();
        let lock = FileLock::new(Arc::clone(&backend));
        let guard = lock.acquire().unwrap();
        assert!(backend.exists(".lock"));
        drop(guard);
        assert!(!backend.exists(".lock"));
    }

    #[test]
    fn release_removes_lockfile() {
        let backend = backend();
        let lock = FileLock::new(Arc::clone(&backend));
        let guard = lock.acquire().unwrap();
        guard.release().unwrap();
        assert!(!backend.exists(".lock"));
    }

    #[test]
    fn acquire_times_out_when_already_held() {
        let backend = backend();
        backend.open(".lock", OpenMode::Write).unwrap().close().unwrap();
        let lock = FileLock::new(Arc::clone(&backend))
            .with_timeout(Duration::from_millis(150))
            .with_delay(Duration::from_millis(20));
        let start = Instant::now();
        let err = lock.acquire().unwrap_err();
        assert!(matches!(err, BackendError::LockTimeout { .. }));
        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[test]
    fn drop_without_explicit_release_still_cleans_up() {
        let backend = backend();
        {
            let lock = FileLock::new(Arc::clone(&backend));
            let _guard = lock.acquire().unwrap();
        }
        assert!(!backend.exists(".lock"));
    }
}
