//! A length-capped handle onto one physical part of a parted file.

use std::io::SeekFrom;

use crate::backend::BackendStream;
use crate::error::{BackendError, BackendResult};

/// One `.part{N}` file, capped at `max_size` bytes.
///
/// `FilePart` never exceeds its cap: a write that would cross it writes as
/// many bytes as fit and returns [`BackendError::PartFull`] carrying the
/// count actually written, so the caller (the parted file stream one layer
/// up) can open the next part and carry the remainder across.
#[derive(Debug)]
pub struct FilePart {
    stream: Box<dyn BackendStream>,
    max_size: u64,
    written: u64,
}

impl FilePart {
    /// Wraps `stream`, which already holds `initial_size` bytes, behind a `max_size` cap.
    pub fn new(stream: Box<dyn BackendStream>, max_size: u64) -> BackendResult<Self> {
        let written = stream.size()?;
        Ok(Self {
            stream,
            max_size,
            written,
        })
    }

    /// The cap this part was created with.
    #[must_use]
    pub const fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Bytes written to this part so far.
    #[must_use]
    pub const fn written(&self) -> u64 {
        self.written
    }

    /// Bytes that can still be written before the cap is hit.
    #[must_use]
    pub const fn space_left(&self) -> u64 {
        self.max_size.saturating_sub(self.written)
    }

    /// Writes as much of `buf` as fits under the cap.
    ///
    /// Returns `Ok(n)` with `n == buf.len()` if everything fit. Otherwise
    /// returns [`BackendError::PartFull`] with the number of bytes actually
    /// written (which may be zero if the part was already full).
    pub fn write(&mut self, buf: &[u8]) -> BackendResult<usize> {
        use std::io::Write;

        if buf.is_empty() {
            return Ok(0);
        }
        let space = self.space_left();
        if space == 0 {
            return Err(BackendError::PartFull { written: 0 });
        }
        let to_write = buf.len().min(space as usize);
        let n = self
            .stream
            .write(&buf[..to_write])
            .map_err(BackendError::from)?;
        self.written += n as u64;
        if n < buf.len() {
            return Err(BackendError::PartFull { written: n as u64 });
        }
        Ok(n)
    }

    /// Reads into `buf`, delegating straight to the underlying stream.
    pub fn read(&mut self, buf: &mut [u8]) -> BackendResult<usize> {
        use std::io::Read;
        self.stream.read(buf).map_err(BackendError::from)
    }

    /// Repositions this part's internal cursor to an absolute offset within the part.
    pub fn seek_to(&mut self, offset: u64) -> BackendResult<()> {
        self.stream
            .seek(SeekFrom::Start(offset))
            .map_err(BackendError::from)?;
        Ok(())
    }

    /// Flushes the underlying stream without closing it.
    pub fn flush_inner(&mut self) -> BackendResult<()> {
        use std::io::Write;
        self.stream.flush().map_err(BackendError::from)
    }

    /// Flushes and closes the underlying stream. Idempotent.
    pub fn close(&mut self) -> BackendResult<()> {
        self.stream.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryBackend;
    use crate::{Backend, OpenMode};

    fn open_part(backend: &MemoryBackend, path: &str, cap: u64) -> FilePart {
        let stream = backend.open(path, OpenMode::Write).unwrap();
        FilePart::new(stream, cap).unwrap()
    }

    #[test]
    fn write_within_cap_succeeds_fully() {
        let backend = MemoryBackend::new("mem");
        let mut part = open_part(&backend, "/f.part0", 10);
        let n = part.write(b"hello").unwrap();
        assert_eq!(n, 5);
        assert_eq!(part.written(), 5);
        assert_eq!(part.space_left(), 5);
    }

    #[test]
    fn write_past_cap_reports_partial_write() {
        let backend = MemoryBackend::new("mem");
        let mut part = open_part(&backend, "/f.part0", 4);
        let err = part.write(b"hello").unwrap_err();
        match err {
            BackendError::PartFull { written } => assert_eq!(written, 4),
            other => panic!("expected PartFull, got {other:?}"),
        }
        assert_eq!(part.written(), 4);
    }

    #[test]
    fn write_to_full_part_reports_zero_written() {
        let backend = MemoryBackend::new("mem");
        let mut part = open_part(&backend, "/f.part0", 4);
        part.write(b"abcd").unwrap();
        let err = part.write(b"e").unwrap_err();
        assert!(matches!(err, BackendError::PartFull { written: 0 }));
    }
}
