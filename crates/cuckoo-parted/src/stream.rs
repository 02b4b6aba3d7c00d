//! Stitches an ordered sequence of size-capped parts into one logical stream.

use std::io::{self, Read, Seek, SeekFrom, Write};

use cuckoo_backend::{BackendError, BackendResult, BackendStream, FilePart, OpenMode, SharedBackend};

use crate::naming::encode_part;

/// A single logical file spread across `path.part0 .. path.part{K-1}`.
///
/// Owns its [`FilePart`]s outright (no back-references); the logical file
/// pointer `fp` is the single source of truth, and every seek recomputes
/// each part's internal cursor from it rather than trusting stale state.
#[derive(Debug)]
pub struct PartedFileStream {
    backend: SharedBackend,
    logical_path: String,
    max_part_size: u64,
    parts: Vec<FilePart>,
    fp: u64,
    mode: OpenMode,
    poisoned: Option<String>,
    closed: bool,
}

impl PartedFileStream {
    /// Builds a stream over already-opened `parts` (ascending part order).
    pub fn new(
        backend: SharedBackend,
        logical_path: impl Into<String>,
        max_part_size: u64,
        parts: Vec<FilePart>,
        mode: OpenMode,
    ) -> Self {
        Self {
            backend,
            logical_path: logical_path.into(),
            max_part_size,
            parts,
            fp: 0,
            mode,
            poisoned: None,
            closed: false,
        }
    }

    /// Number of parts currently making up this file.
    #[must_use]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    fn total_known_size(&self) -> u64 {
        self.parts.iter().map(FilePart::written).sum()
    }

    fn check_open(&self) -> BackendResult<()> {
        if self.closed {
            return Err(BackendError::Closed);
        }
        if let Some(reason) = &self.poisoned {
            return Err(BackendError::Poisoned(reason.clone()));
        }
        Ok(())
    }

    fn expand(&mut self) -> BackendResult<()> {
        let index = self.parts.len() as u64;
        let physical = encode_part(&self.logical_path, index);
        let stream = self.backend.open(&physical, self.mode)?;
        let part = FilePart::new(stream, self.max_part_size)?;
        self.parts.push(part);
        Ok(())
    }

    fn write_logical(&mut self, buf: &[u8]) -> BackendResult<usize> {
        self.check_open()?;
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.mode.is_writable() {
            return Err(BackendError::Unsupported("write on a stream not opened for writing"));
        }
        let mut total = 0usize;
        let mut remaining = buf;
        while !remaining.is_empty() {
            let k = (self.fp / self.max_part_size) as usize;
            if k == self.parts.len() {
                if let Err(err) = self.expand() {
                    self.poisoned = Some(err.to_string());
                    return Err(err);
                }
            }
            let offset_in_part = self.fp % self.max_part_size;
            self.parts[k]
                .seek_to(offset_in_part)
                .inspect_err(|err| self.poisoned = Some(err.to_string()))?;
            match self.parts[k].write(remaining) {
                Ok(n) => {
                    total += n;
                    self.fp += n as u64;
                    remaining = &remaining[n..];
                }
                Err(BackendError::PartFull { written }) => {
                    total += written as usize;
                    self.fp += written;
                    remaining = &remaining[written as usize..];
                }
                Err(err) => {
                    self.poisoned = Some(err.to_string());
                    return Err(err);
                }
            }
        }
        Ok(total)
    }

    fn read_logical(&mut self, buf: &mut [u8]) -> BackendResult<usize> {
        self.check_open()?;
        let sizehint = buf.len() as u64;
        if sizehint > self.max_part_size {
            return Err(BackendError::Unsupported(
                "read size exceeds the part cap; callers must chunk their reads",
            ));
        }
        if sizehint == 0 {
            return Ok(0);
        }
        let total_size = self.total_known_size();
        if self.fp >= total_size {
            return Ok(0);
        }
        let k = (self.fp / self.max_part_size) as usize;
        if k >= self.parts.len() {
            return Err(BackendError::PointerOutOfBounds { pointer: self.fp });
        }
        let offset_in_part = self.fp % self.max_part_size;
        self.parts[k].seek_to(offset_in_part)?;
        let remaining_in_part = self.parts[k].written().saturating_sub(offset_in_part);

        if sizehint <= remaining_in_part {
            let n = self.parts[k].read(&mut buf[..sizehint as usize])?;
            self.fp += n as u64;
            return Ok(n);
        }

        let first_n = self.parts[k].read(&mut buf[..remaining_in_part as usize])?;
        self.fp += first_n as u64;
        if self.fp >= total_size || k + 1 >= self.parts.len() {
            return Ok(first_n);
        }
        self.parts[k + 1].seek_to(0)?;
        let second_len = (sizehint - remaining_in_part) as usize;
        let second_n = self.parts[k + 1].read(&mut buf[first_n..first_n + second_len])?;
        self.fp += second_n as u64;
        Ok(first_n + second_n)
    }

    fn seek_logical(&mut self, pos: SeekFrom) -> BackendResult<u64> {
        self.check_open()?;
        let new_fp = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(delta) => {
                if delta >= 0 {
                    self.fp + delta as u64
                } else {
                    self.fp
                        .checked_sub(delta.unsigned_abs())
                        .ok_or(BackendError::Unsupported("seek before start of stream"))?
                }
            }
            SeekFrom::End(_) => return Err(BackendError::Unsupported("seek from end")),
        };
        if !self.mode.is_writable() && new_fp > self.total_known_size() {
            return Err(BackendError::PointerOutOfBounds { pointer: new_fp });
        }
        self.fp = new_fp;
        let k = (new_fp / self.max_part_size) as usize;
        for (i, part) in self.parts.iter_mut().enumerate() {
            let target = if i == k { new_fp % self.max_part_size } else { 0 };
            part.seek_to(target)?;
        }
        Ok(new_fp)
    }
}

impl Read for PartedFileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_logical(buf).map_err(BackendError::into_io)
    }
}

impl Write for PartedFileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_logical(buf).map_err(BackendError::into_io)
    }

    fn flush(&mut self) -> io::Result<()> {
        for part in &mut self.parts {
            part.flush_inner().map_err(BackendError::into_io)?;
        }
        Ok(())
    }
}

impl Seek for PartedFileStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.seek_logical(pos).map_err(BackendError::into_io)
    }
}

impl BackendStream for PartedFileStream {
    fn size(&self) -> BackendResult<u64> {
        Ok(self.total_known_size())
    }

    fn close(&mut self) -> BackendResult<()> {
        if self.closed {
            return Ok(());
        }
        for part in &mut self.parts {
            part.close()?;
        }
        self.closed = true;
        Ok(())
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

    fn open_fresh(backend: &SharedBackend, path: &str, cap: u64, mode: OpenMode) -> PartedFileStream {
        let stream = backend.open(&encode_part(path, 0), mode).unwrap();
        let part = FilePart::new(stream, cap).unwrap();
        PartedFileStream::new(Arc::clone(backend), path, cap, vec![part], mode)
    }

    #[test]
    fn write_spanning_three_parts_expands_as_needed() {
        let backend = backend();
        let mut file = open_fresh(&backend, "/cuckoo.tar", 4096, OpenMode::Write);
        let payload = vec![7u8; 12 * 1024];
        file.write_all(&payload).unwrap();
        file.close().unwrap();
        assert_eq!(file.part_count(), 3);
        assert_eq!(file.size().unwrap(), 12 * 1024);
    }

    #[test]
    fn chunked_read_matches_written_bytes() {
        let backend = backend();
        let mut payload = Vec::new();
        for i in 0..(12 * 1024) {
            payload.push((i % 251) as u8);
        }
        {
            let mut file = open_fresh(&backend, "/f.bin", 4096, OpenMode::Write);
            file.write_all(&payload).unwrap();
            file.close().unwrap();
        }
        let mut file = open_fresh(&backend, "/f.bin", 4096, OpenMode::Read);
        // re-open read against existing parts 1 and 2 as well.
        let p1 = FilePart::new(backend.open(&encode_part("/f.bin", 1), OpenMode::Read).unwrap(), 4096).unwrap();
        let p2 = FilePart::new(backend.open(&encode_part("/f.bin", 2), OpenMode::Read).unwrap(), 4096).unwrap();
        file.parts.push(p1);
        file.parts.push(p2);

        let mut got = Vec::new();
        let mut chunk = vec![0u8; 3 * 1024];
        loop {
            let n = file.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            got.extend_from_slice(&chunk[..n]);
        }
        assert_eq!(got, payload);
    }

    #[test]
    fn eof_read_returns_empty_without_moving_pointer() {
        let backend = backend();
        let mut file = open_fresh(&backend, "/f.bin", 16, OpenMode::Write);
        file.write_all(b"hello").unwrap();
        file.close().unwrap();

        let mut file = open_fresh(&backend, "/f.bin", 16, OpenMode::Read);
        let mut buf = [0u8; 8];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(n, 5);
        let n2 = file.read(&mut buf).unwrap();
        assert_eq!(n2, 0);
        let n3 = file.read(&mut buf).unwrap();
        assert_eq!(n3, 0);
    }

    #[test]
    fn read_hint_larger_than_cap_is_unsupported() {
        let backend = backend();
        let mut file = open_fresh(&backend, "/f.bin", 16, OpenMode::Write);
        file.write_all(b"hello").unwrap();
        file.close().unwrap();

        let mut file = open_fresh(&backend, "/f.bin", 16, OpenMode::Read);
        let mut buf = vec![0u8; 64];
        let err = file.read(&mut buf).unwrap_err();
        let backend_err: BackendError = err.into();
        assert!(matches!(backend_err, BackendError::Unsupported(_)));
    }

    #[test]
    fn write_on_read_mode_stream_is_unsupported() {
        let backend = backend();
        let mut file = open_fresh(&backend, "/f.bin", 16, OpenMode::Write);
        file.write_all(b"hello").unwrap();
        file.close().unwrap();

        let mut file = open_fresh(&backend, "/f.bin", 16, OpenMode::Read);
        let err = file.write(b"nope").unwrap_err();
        let backend_err: BackendError = err.into();
        assert!(matches!(backend_err, BackendError::Unsupported(_)));
    }

    #[test]
    fn seek_from_end_is_unsupported() {
        let backend = backend();
        let mut file = open_fresh(&backend, "/f.bin", 16, OpenMode::ReadWrite);
        let err = file.seek(SeekFrom::End(0)).unwrap_err();
        let backend_err: BackendError = err.into();
        assert!(matches!(backend_err, BackendError::Unsupported(_)));
    }

    #[test]
    fn close_is_idempotent() {
        let backend = backend();
        let mut file = open_fresh(&backend, "/f.bin", 16, OpenMode::Write);
        file.write_all(b"x").unwrap();
        file.close().unwrap();
        file.close().unwrap();
    }
}
