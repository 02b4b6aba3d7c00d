#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Two-pass directory/file tree synchronization over the `Backend` contract.
//!
//! See [`SyncDriver::run`] for the walk order and conflict rule.

mod driver;

pub use driver::{SyncAction, SyncDriver, SyncEvent};
