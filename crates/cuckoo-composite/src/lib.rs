#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Fan-out layer: aggregates several backends into one namespace.
//!
//! # Overview
//!
//! [`CompositeFs`] holds a fixed, ordered set of backends and picks a writer
//! per call based on free space, scans every member on read, and mirrors
//! destructive operations (remove, rename, settimes, makedir) to every
//! backend that holds a given path.
//!
//! # Errors
//!
//! Mirrored operations are not transactional: if mirroring to N backends
//! fails partway through, earlier backends have already applied the change.
//! See [`cuckoo_backend::BackendError`] for the kinds this can surface.

mod composite;

pub use composite::CompositeFs;
