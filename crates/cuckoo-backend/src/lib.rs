#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Backend contract, capacity tracking and concrete storage adapters.
//!
//! # Overview
//!
//! Everything CuckooDrive stores eventually goes through the [`Backend`]
//! trait: a small, synchronous, object-safe contract that any remote (or any
//! wrapper around a remote) can satisfy. This crate owns that trait, the
//! shared [`BackendError`] every layer above it reuses, the length-capped
//! [`FilePart`] stream primitive, the capacity-enforcing [`SizedBackend`]
//! wrapper, and two concrete adapters: [`LocalBackend`] (a real directory on
//! disk) and [`MemoryBackend`] (an in-process store used by the test suites
//! of the crates built on top of this one).
//!
//! # Design
//!
//! Composition happens through trait objects, not generics: the CLI builds a
//! `Vec<SharedBackend>` from parsed remote URIs at startup, and every layer
//! above this crate (the parted filesystem, the fan-out composite) holds
//! `Box`/`Arc<dyn Backend>` rather than being generic over a concrete type.
//! This mirrors how the system is actually used: the set of backends is
//! decided at runtime from configuration, not at compile time.
//!
//! # Errors
//!
//! All fallible operations return [`BackendResult`]. See [`BackendError`]
//! for the full set of kinds raised anywhere in the stack.

mod backend;
mod error;
mod local;
mod memory;
mod part;
mod sized;
mod types;

pub use backend::{Backend, BackendStream, SharedBackend};
pub use error::{BackendError, BackendResult};
pub use local::LocalBackend;
pub use memory::MemoryBackend;
pub use part::FilePart;
pub use sized::SizedBackend;
pub use types::{FileInfo, ListDirOptions, OpenMode};
