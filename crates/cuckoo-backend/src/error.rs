//! crates/cuckoo-backend/src/error.rs
//!
//! The single error type shared by every layer of the storage stack.

use std::io;

use thiserror::Error;

/// Result type returned by every `Backend` operation and everything built on top of it.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur anywhere in the CuckooDrive storage stack.
///
/// This enum is intentionally flat: every layer (backend, parted fs, composite
/// fs, lock, sync driver) raises these same kinds rather than wrapping them in
/// per-layer error types, so a caller never has to chase a chain of `From`
/// impls to find out what actually went wrong.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Operation targeted a logical path that does not exist.
    #[error("path not found: {0}")]
    NotFound(String),

    /// A file operation targeted a directory, or a directory operation targeted a file.
    #[error("wrong resource type at {0}")]
    InvalidResource(String),

    /// Path is structurally invalid for the requested operation (e.g. removing root).
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// A write would exceed a backend's total capacity.
    #[error("backend capacity exceeded: requested {requested} bytes, {available} available")]
    Capacity {
        /// Bytes the caller tried to write.
        requested: u64,
        /// Bytes actually available on the backend.
        available: u64,
    },

    /// A write would exceed a single part's size cap. Carries the byte count
    /// actually written before the part filled up, so the caller can expand
    /// into a new part and write the remainder.
    #[error("part filled after {written} bytes")]
    PartFull {
        /// Bytes written to the part before it reported full.
        written: u64,
    },

    /// A backend cannot report the requested metadata key.
    #[error("backend does not expose metadata key {0:?}")]
    NoMeta(&'static str),

    /// A composite filesystem has no single native path to hand back.
    #[error("composite filesystem has no native path")]
    NoSysPath,

    /// Lock acquisition exceeded its deadline.
    #[error("timed out waiting for lock {filename:?} after {elapsed:?}")]
    LockTimeout {
        /// Lockfile name that could not be acquired.
        filename: String,
        /// How long the acquisition loop ran before giving up.
        elapsed: std::time::Duration,
    },

    /// A read-mode stream was seeked past the end of the file.
    #[error("pointer {pointer} is past end of file")]
    PointerOutOfBounds {
        /// Logical position the seek landed on.
        pointer: u64,
    },

    /// A stream failed mid-write and is no longer in a known-good state.
    #[error("stream is poisoned: {0}")]
    Poisoned(String),

    /// Operation is not supported by this implementation.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Operation attempted on a stream after it was closed.
    #[error("operation attempted on a closed stream")]
    Closed,

    /// A caller tried to violate a structural invariant (e.g. assign the composite's writer).
    #[error("invariant violated: {0}")]
    Invariant(&'static str),

    /// A backend-originated I/O error that doesn't fit a more specific kind above.
    #[error("backend I/O error: {0}")]
    Backend(io::Error),
}

impl From<io::Error> for BackendError {
    /// Unwraps a [`BackendError`] that was smuggled through an `io::Error` by
    /// [`BackendError::into_io`], otherwise wraps the error verbatim.
    ///
    /// `std::io::{Read, Write, Seek}` only let us return `io::Error`, but some
    /// of our own stream wrappers need to signal a typed kind (capacity,
    /// part-full) through that interface. Round-tripping through
    /// `io::Error::new`/`downcast` keeps the typed kind intact instead of
    /// flattening everything into an opaque [`BackendError::Backend`].
    fn from(err: io::Error) -> Self {
        if err.get_ref().is_some_and(|inner| inner.is::<Self>()) {
            let boxed = err.into_inner().expect("checked by get_ref above");
            return *boxed
                .downcast::<Self>()
                .expect("downcast target matches the type just checked");
        }
        Self::Backend(err)
    }
}

impl BackendError {
    /// Smuggles a typed [`BackendError`] through an API that can only return `io::Error`.
    pub fn into_io(self) -> io::Error {
        match self {
            Self::Backend(err) => err,
            other => io::Error::other(other),
        }
    }
}
