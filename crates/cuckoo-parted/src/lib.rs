#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Partitioning layer: splits logical files into `.part{N}` parts and
//! stitches them back into one stream.
//!
//! # Overview
//!
//! [`PartedFs`] is a virtual filesystem over any [`cuckoo_backend::Backend`]
//! (a plain remote, or the fan-out composite one crate up): it owns the
//! `.part{N}` naming convention, directory listing, rename/copy/remove
//! mirroring across a file's parts, and aggregated metadata. [`PartedFileStream`]
//! is the open-file handle it hands back: one logical file pointer, backed
//! by an ordered [`cuckoo_backend::FilePart`] vector that grows on demand as
//! writes cross part boundaries.
//!
//! # Invariants
//!
//! Every part but the last is exactly `max_part_size` bytes; part indices
//! are contiguous from zero; a logical file exists iff its `.part0` exists.

mod fs;
mod naming;
mod stream;

pub use fs::PartedFs;
pub use stream::PartedFileStream;
