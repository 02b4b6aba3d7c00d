#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Advisory cross-writer lock.
//!
//! One [`FileLock`] per backend path a sync run wants to serialize against.
//! See [`FileLock::acquire`] for the retry/timeout contract.

mod lock;

pub use lock::{FileLock, LockGuard, DEFAULT_DELAY, DEFAULT_FILENAME, DEFAULT_TIMEOUT};
